//! Immutable, versioned texture snapshots.
//!
//! A [`TextureDefinition`] captures everything needed to replay a texture's
//! shareable state onto a texture object in another context: target, filter
//! and wrap parameters, the level-0 size/format record, and the shared
//! [`NativeImage`] whose storage every replica aliases. Definitions are
//! never mutated — a fold installs a new one with a bumped version.

use std::sync::Arc;

use gl_driver::{GlDriver, LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};
use tracing::{error, warn};

use crate::image::NativeImage;
use crate::texture::{SharedTexture, Texture, TextureRef};

/// Immutable versioned capture of a texture's shareable state.
#[derive(Clone)]
pub struct TextureDefinition {
    version: u32,
    target: TextureTarget,
    min_filter: MinFilter,
    mag_filter: MagFilter,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
    immutable: bool,
    level0: Option<LevelInfo>,
    image: Option<Arc<NativeImage>>,
}

impl TextureDefinition {
    /// Capture a live texture's state at the given version.
    ///
    /// If the texture has defined level-0 content but no shared image yet,
    /// one is created here and attached back onto the texture — this is the
    /// point at which a private texture becomes shareable. If the driver
    /// refuses the image allocation, the capture proceeds without one.
    pub fn from_texture(
        driver: &Arc<dyn GlDriver>,
        version: u32,
        state: &mut Texture,
    ) -> Self {
        if state.image().is_none() && state.level0_info().is_some() {
            match NativeImage::create(driver, state.service_id()) {
                Some(image) => {
                    let client = image.add_client();
                    state.attach_image(image, client);
                }
                None => {
                    warn!(
                        "texture {} capture continues without a shared image",
                        state.service_id()
                    );
                }
            }
        }

        Self {
            version,
            target: state.target(),
            min_filter: state.min_filter(),
            mag_filter: state.mag_filter(),
            wrap_s: state.wrap_s(),
            wrap_t: state.wrap_t(),
            immutable: state.immutable(),
            level0: state.level0_info(),
            image: state.image().map(|attached| Arc::clone(&attached.image)),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn level0(&self) -> Option<LevelInfo> {
        self.level0
    }

    pub fn image(&self) -> Option<&Arc<NativeImage>> {
        self.image.as_ref()
    }

    /// Whether this definition predates `version`.
    ///
    /// Versions wrap: the comparison is unsigned subtraction against half
    /// the u32 range, so counters survive 2^32 updates. Equal versions
    /// count as "older" — the holder has seen the current state and may
    /// replace it.
    pub fn is_older_than(&self, version: u32) -> bool {
        version.wrapping_sub(self.version) < 0x8000_0000
    }

    /// Whether replaying this definition onto the texture would change
    /// nothing: filter/wrap state is identical, and either no image is
    /// expected or the texture still has one attached. A structural
    /// redefinition orphans the attachment, so a missing image means the
    /// texture no longer aliases this definition's storage.
    pub fn matches(&self, state: &Texture) -> bool {
        self.min_filter == state.min_filter()
            && self.mag_filter == state.mag_filter()
            && self.wrap_s == state.wrap_s()
            && self.wrap_t == state.wrap_t()
            && (self.image.is_none() || state.image().is_some())
    }

    /// Allocate a new texture object and stamp this definition onto it.
    /// Returns `None` if the driver cannot allocate a texture name.
    pub fn create_texture(&self, driver: &Arc<dyn GlDriver>) -> Option<TextureRef> {
        let service_id = driver.gen_texture();
        if service_id == 0 {
            error!("texture allocation failed while materializing a mailbox");
            return None;
        }
        let texture = SharedTexture::new(service_id, self.target);
        self.update_texture(driver, &mut texture.state());
        Some(texture)
    }

    /// Stamp this definition onto an existing texture in place.
    ///
    /// Parameters and level-0 info are replayed, the shared image is bound
    /// to the target (aliasing the common storage), and one flush is issued
    /// at the end — the producer-side flush that mailbox sharing semantics
    /// require after changes.
    pub fn update_texture(&self, driver: &Arc<dyn GlDriver>, state: &mut Texture) {
        debug_assert_eq!(state.target(), self.target);

        driver.set_parameters(
            state.service_id(),
            self.target,
            self.min_filter,
            self.mag_filter,
            self.wrap_s,
            self.wrap_t,
        );
        state.set_parameters(self.min_filter, self.mag_filter, self.wrap_s, self.wrap_t);

        if let Some(info) = self.level0 {
            if self.image.is_none() {
                // No shared storage to alias; allocate plain storage.
                driver.set_level_storage(state.service_id(), self.target, 0, &info);
            }
            state.define_level(0, info);
            state.set_level_cleared(0, true);
        }

        if let Some(image) = &self.image {
            // Reuse the existing client slot when the same image is already
            // attached; otherwise register this texture as a new consumer.
            let client = match state.image() {
                Some(attached) if Arc::ptr_eq(&attached.image, image) => attached.client,
                _ => image.add_client(),
            };
            image.will_read(client);
            image.bind_to_texture(state.service_id(), self.target);
            image.did_read(client);
            let already_attached = state
                .image()
                .is_some_and(|attached| Arc::ptr_eq(&attached.image, image));
            if !already_attached {
                state.attach_image(Arc::clone(image), client);
            }
        }

        state.set_immutable(self.immutable);
        driver.flush();
    }
}

impl std::fmt::Debug for TextureDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureDefinition")
            .field("version", &self.version)
            .field("target", &self.target)
            .field("level0", &self.level0)
            .field("has_image", &self.image.is_some())
            .finish()
    }
}
