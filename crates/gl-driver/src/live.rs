//! [`LiveGlDriver`] — forwards the driver seam to the real GL/EGL driver.
//!
//! GL entry points are loaded exactly once via `gl_loader`; the EGLImage and
//! EGL query entry points are resolved by name and kept as raw function
//! pointers, since the `gl` crate does not bind EGL.

use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::sync::{Mutex, Once};

use anyhow::{bail, Result};
use gl::types::{GLenum, GLint, GLsizei, GLuint};
use tracing::error;

use crate::driver::{FenceId, GlDriver, ImageId};
use crate::types::{LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};

static GL_INIT_ONCE: Once = Once::new();

/// `EGL_GL_TEXTURE_2D_KHR` from EGL_KHR_gl_texture_2D_image.
const EGL_GL_TEXTURE_2D_KHR: GLenum = 0x30B1;
/// `EGL_EXTENSIONS` query name.
const EGL_EXTENSIONS: i32 = 0x3055;

// ---------------------------------------------------------------------------
// EGL function pointer types
// ---------------------------------------------------------------------------

type EglGetCurrentDisplay = unsafe extern "system" fn() -> *mut c_void;
type EglGetCurrentContext = unsafe extern "system" fn() -> *mut c_void;
type EglQueryString = unsafe extern "system" fn(display: *mut c_void, name: i32) -> *const c_char;
type EglCreateImageKhr = unsafe extern "system" fn(
    display: *mut c_void,
    context: *mut c_void,
    target: GLenum,
    buffer: *mut c_void,
    attrib_list: *const i32,
) -> *mut c_void;
type EglDestroyImageKhr =
    unsafe extern "system" fn(display: *mut c_void, image: *mut c_void) -> u32;
type GlEglImageTargetTexture2dOes =
    unsafe extern "system" fn(target: GLenum, image: *mut c_void);

/// Loaded EGLImage entry points.
struct EglImageFunctions {
    get_current_display: EglGetCurrentDisplay,
    get_current_context: EglGetCurrentContext,
    query_string: EglQueryString,
    create_image: EglCreateImageKhr,
    destroy_image: EglDestroyImageKhr,
    image_target_texture: GlEglImageTargetTexture2dOes,
}

impl EglImageFunctions {
    /// Resolve all EGLImage entry points by name.
    fn load() -> Option<Self> {
        let load = |name: &str| -> Option<*const c_void> {
            let ptr = gl_loader::get_proc_address(name) as *const c_void;
            if ptr.is_null() {
                None
            } else {
                Some(ptr)
            }
        };

        unsafe {
            Some(Self {
                get_current_display: std::mem::transmute::<*const c_void, EglGetCurrentDisplay>(
                    load("eglGetCurrentDisplay")?,
                ),
                get_current_context: std::mem::transmute::<*const c_void, EglGetCurrentContext>(
                    load("eglGetCurrentContext")?,
                ),
                query_string: std::mem::transmute::<*const c_void, EglQueryString>(load(
                    "eglQueryString",
                )?),
                create_image: std::mem::transmute::<*const c_void, EglCreateImageKhr>(load(
                    "eglCreateImageKHR",
                )?),
                destroy_image: std::mem::transmute::<*const c_void, EglDestroyImageKhr>(load(
                    "eglDestroyImageKHR",
                )?),
                image_target_texture: std::mem::transmute::<
                    *const c_void,
                    GlEglImageTargetTexture2dOes,
                >(load("glEGLImageTargetTexture2DOES")?),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// LiveGlDriver
// ---------------------------------------------------------------------------

/// Driver backend over the host's live GL/EGL implementation.
///
/// All calls must be issued with the owning context current on the calling
/// thread. Fence and image handles returned through the seam are process-
/// local tokens mapped to the underlying driver objects here.
pub struct LiveGlDriver {
    egl: EglImageFunctions,
    /// GL + EGL extension string snapshot taken at construction.
    extensions: String,
    // Driver objects are raw pointers; they are stored untyped and only
    // reinterpreted on the issuing thread with a context current.
    images: Mutex<HashMap<u64, usize>>,
    fences: Mutex<HashMap<u64, usize>>,
    next_image: Mutex<u64>,
    next_fence: Mutex<u64>,
}

impl LiveGlDriver {
    /// Load GL and EGL entry points and snapshot the extension strings.
    ///
    /// Fails if the EGLImage entry points cannot be resolved; callers treat
    /// that the same as a missing extension.
    pub fn new() -> Result<Self> {
        GL_INIT_ONCE.call_once(|| {
            gl_loader::init_gl();
            gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        });

        let Some(egl) = EglImageFunctions::load() else {
            bail!("EGLImage entry points are unavailable in this driver");
        };

        let mut extensions = String::new();
        unsafe {
            let gl_ext = gl::GetString(gl::EXTENSIONS);
            if !gl_ext.is_null() {
                extensions.push_str(&CStr::from_ptr(gl_ext.cast()).to_string_lossy());
            }
            let display = (egl.get_current_display)();
            if !display.is_null() {
                let egl_ext = (egl.query_string)(display, EGL_EXTENSIONS);
                if !egl_ext.is_null() {
                    extensions.push(' ');
                    extensions.push_str(&CStr::from_ptr(egl_ext).to_string_lossy());
                }
            }
        }

        Ok(Self {
            egl,
            extensions,
            images: Mutex::new(HashMap::new()),
            fences: Mutex::new(HashMap::new()),
            next_image: Mutex::new(0),
            next_fence: Mutex::new(0),
        })
    }
}

impl GlDriver for LiveGlDriver {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.split_whitespace().any(|ext| ext == name)
    }

    fn gen_texture(&self) -> GLuint {
        let mut texture: GLuint = 0;
        unsafe {
            gl::GenTextures(1, &mut texture);
        }
        texture
    }

    fn delete_texture(&self, texture: GLuint) {
        unsafe {
            gl::DeleteTextures(1, &texture);
        }
    }

    fn set_parameters(
        &self,
        texture: GLuint,
        target: TextureTarget,
        min_filter: MinFilter,
        mag_filter: MagFilter,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
    ) {
        let target = target.to_gl();
        unsafe {
            gl::BindTexture(target, texture);
            gl::TexParameteri(target, gl::TEXTURE_MIN_FILTER, min_filter.to_gl() as GLint);
            gl::TexParameteri(target, gl::TEXTURE_MAG_FILTER, mag_filter.to_gl() as GLint);
            gl::TexParameteri(target, gl::TEXTURE_WRAP_S, wrap_s.to_gl() as GLint);
            gl::TexParameteri(target, gl::TEXTURE_WRAP_T, wrap_t.to_gl() as GLint);
            gl::BindTexture(target, 0);
        }
    }

    fn set_level_storage(
        &self,
        texture: GLuint,
        target: TextureTarget,
        level: i32,
        info: &LevelInfo,
    ) {
        let target = target.to_gl();
        unsafe {
            gl::BindTexture(target, texture);
            gl::TexImage2D(
                target,
                level,
                info.internal_format as GLint,
                info.width as GLsizei,
                info.height as GLsizei,
                info.border,
                info.format,
                info.type_,
                std::ptr::null(),
            );
            gl::BindTexture(target, 0);
        }
    }

    fn create_image(&self, texture: GLuint) -> Option<ImageId> {
        let image = unsafe {
            let display = (self.egl.get_current_display)();
            let context = (self.egl.get_current_context)();
            (self.egl.create_image)(
                display,
                context,
                EGL_GL_TEXTURE_2D_KHR,
                texture as usize as *mut c_void,
                std::ptr::null(),
            )
        };
        if image.is_null() {
            error!("eglCreateImageKHR failed for texture {texture}");
            return None;
        }

        let mut next = self.next_image.lock().unwrap();
        *next += 1;
        let id = ImageId(*next);
        self.images.lock().unwrap().insert(id.0, image as usize);
        Some(id)
    }

    fn destroy_image(&self, image: ImageId) {
        let Some(ptr) = self.images.lock().unwrap().remove(&image.0) else {
            return;
        };
        unsafe {
            let display = (self.egl.get_current_display)();
            (self.egl.destroy_image)(display, ptr as *mut c_void);
        }
    }

    fn bind_image(&self, image: ImageId, texture: GLuint, target: TextureTarget) {
        let Some(ptr) = self.images.lock().unwrap().get(&image.0).copied() else {
            return;
        };
        let target = target.to_gl();
        unsafe {
            gl::BindTexture(target, texture);
            (self.egl.image_target_texture)(target, ptr as *mut c_void);
            gl::BindTexture(target, 0);
        }
    }

    fn insert_fence(&self) -> FenceId {
        let sync = unsafe { gl::FenceSync(gl::SYNC_GPU_COMMANDS_COMPLETE, 0) };
        let mut next = self.next_fence.lock().unwrap();
        *next += 1;
        let id = FenceId(*next);
        self.fences.lock().unwrap().insert(id.0, sync as usize);
        id
    }

    fn server_wait_fence(&self, fence: FenceId) {
        let Some(sync) = self.fences.lock().unwrap().get(&fence.0).copied() else {
            return;
        };
        unsafe {
            gl::WaitSync(sync as gl::types::GLsync, 0, gl::TIMEOUT_IGNORED);
        }
    }

    fn poll_fence(&self, fence: FenceId) -> bool {
        let Some(sync) = self.fences.lock().unwrap().get(&fence.0).copied() else {
            return true;
        };
        let status = unsafe { gl::ClientWaitSync(sync as gl::types::GLsync, 0, 0) };
        status == gl::ALREADY_SIGNALED || status == gl::CONDITION_SATISFIED
    }

    fn delete_fence(&self, fence: FenceId) {
        let Some(sync) = self.fences.lock().unwrap().remove(&fence.0) else {
            return;
        };
        unsafe {
            gl::DeleteSync(sync as gl::types::GLsync);
        }
    }

    fn flush(&self) {
        unsafe {
            gl::Flush();
        }
    }
}
