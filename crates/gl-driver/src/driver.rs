//! The [`GlDriver`] trait — the seam between texture-sharing logic and the
//! GL/EGL implementation underneath it.

use gl::types::GLuint;

use crate::types::{LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};

/// Opaque handle to a driver-owned shared image (EGLImage-shaped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

/// Opaque handle to a driver-owned fence object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub u64);

/// The slice of the GL/EGL surface that texture sharing needs.
///
/// Implementations exist for the live driver ([`crate::LiveGlDriver`]) and
/// for tests ([`crate::testing::RecordingDriver`]). All methods are issued
/// from a thread with the owning context current; waits are enqueued on the
/// GPU command stream (`glWaitSync` semantics) and never block the caller.
pub trait GlDriver: Send + Sync {
    /// Downcast to a concrete type. Used by tests to reach the recording
    /// driver behind an `Arc<dyn GlDriver>`.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Whether the driver advertises the named GL or EGL extension.
    fn has_extension(&self, name: &str) -> bool;

    /// Allocate a new texture name. Returns 0 on failure.
    fn gen_texture(&self) -> GLuint;

    /// Delete a texture name.
    fn delete_texture(&self, texture: GLuint);

    /// Bind filter and wrap parameters onto a texture object.
    fn set_parameters(
        &self,
        texture: GLuint,
        target: TextureTarget,
        min_filter: MinFilter,
        mag_filter: MagFilter,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
    );

    /// Define storage for one level of a texture (no pixel upload).
    fn set_level_storage(&self, texture: GLuint, target: TextureTarget, level: i32, info: &LevelInfo);

    /// Wrap a texture's storage in a shared image that other contexts can
    /// alias. Returns `None` if the driver refuses (e.g. out of memory).
    fn create_image(&self, texture: GLuint) -> Option<ImageId>;

    /// Release a shared image created by [`GlDriver::create_image`].
    fn destroy_image(&self, image: ImageId);

    /// Attach a shared image to a texture object, making the texture alias
    /// the image's pixel storage.
    fn bind_image(&self, image: ImageId, texture: GLuint, target: TextureTarget);

    /// Insert a fence into the command stream after all prior commands.
    fn insert_fence(&self) -> FenceId;

    /// Enqueue a GPU-side wait for the fence. Does not block the CPU.
    fn server_wait_fence(&self, fence: FenceId);

    /// Poll whether the fence has signaled. Never blocks.
    fn poll_fence(&self, fence: FenceId) -> bool;

    /// Delete a fence object.
    fn delete_fence(&self, fence: FenceId);

    /// Flush the context's command stream.
    fn flush(&self);
}
