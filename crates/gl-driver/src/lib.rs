//! Minimal GL/EGL driver surface for cross-context texture sharing.
//!
//! This crate defines the [`GlDriver`] trait, the narrow slice of the GL/EGL
//! API that texture sharing actually needs: texture-name allocation and
//! parameter binding, EGLImage-shaped shared images, and GPU fence objects
//! with queue-side waits. [`LiveGlDriver`] forwards to the real driver via
//! the `gl` crate and by-name EGL entry points; [`testing::RecordingDriver`]
//! is an in-memory stand-in with manual fence advancement.

pub mod capabilities;
pub mod driver;
pub mod fence;
pub mod live;
pub mod testing;
pub mod types;

pub use capabilities::{check_shared_image_support, MissingExtension, REQUIRED_EXTENSIONS};
pub use driver::{FenceId, GlDriver, ImageId};
pub use fence::GlFence;
pub use live::LiveGlDriver;
pub use types::{LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};
