//! Capability gate for shared-image support.
//!
//! Cross-context sharing needs driver-created shared images plus fence
//! objects. The check runs once at synchronizer construction; a miss is not
//! retryable for the process lifetime.

use thiserror::Error;

use crate::driver::GlDriver;

/// Extensions the sharing subsystem cannot work without.
pub const REQUIRED_EXTENSIONS: [&str; 4] = [
    "EGL_KHR_image_base",
    "EGL_KHR_gl_texture_2D_image",
    "EGL_KHR_fence_sync",
    "GL_OES_EGL_image",
];

/// A required driver extension is missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required driver extension {0} is unavailable")]
pub struct MissingExtension(pub &'static str);

/// Verify that the driver can back shared images and fences.
pub fn check_shared_image_support(driver: &dyn GlDriver) -> Result<(), MissingExtension> {
    for name in REQUIRED_EXTENSIONS {
        if !driver.has_extension(name) {
            return Err(MissingExtension(name));
        }
    }
    Ok(())
}
