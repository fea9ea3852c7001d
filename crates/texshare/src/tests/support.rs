//! Shared fixtures for the sharing tests.

use std::sync::Arc;

use gl_driver::testing::RecordingDriver;
use gl_driver::{GlDriver, LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};
use once_cell::sync::Lazy;

use crate::texture::{SharedTexture, TextureRef};

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
});

/// A recording driver, returned both concretely (for assertions) and as the
/// trait object the subsystem consumes.
pub fn driver() -> (Arc<RecordingDriver>, Arc<dyn GlDriver>) {
    Lazy::force(&TRACING);
    let concrete = Arc::new(RecordingDriver::new());
    let driver: Arc<dyn GlDriver> = concrete.clone();
    (concrete, driver)
}

/// A texture with defined, cleared level-0 RGBA storage and non-mip
/// filtering, ready to participate in sharing.
pub fn make_texture(driver: &Arc<dyn GlDriver>, target: TextureTarget, size: u32) -> TextureRef {
    let service_id = driver.gen_texture();
    assert_ne!(service_id, 0);
    let texture = SharedTexture::new(service_id, target);
    {
        let mut state = texture.state();
        state.set_parameters(
            MinFilter::Linear,
            MagFilter::Linear,
            WrapMode::ClampToEdge,
            WrapMode::ClampToEdge,
        );
        state.define_level(0, LevelInfo::rgba(size, size));
        state.set_level_cleared(0, true);
    }
    texture
}
