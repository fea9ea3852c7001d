//! Typed views of the raw GL constants this subsystem traffics in.
//!
//! The decoder layer hands us raw `GLenum` values; everything past that
//! boundary uses these enums. Conversion goes through `num-traits`'
//! `FromPrimitive`/`ToPrimitive` so an unknown enum is a `None`, not UB.

use gl::types::GLenum;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

/// `GL_TEXTURE_EXTERNAL_OES` is not in the `gl` crate's default API.
pub const GL_TEXTURE_EXTERNAL_OES: GLenum = 0x8D65;

/// `GL_TEXTURE_RECTANGLE` is not in the `gl` crate's default API.
pub const GL_TEXTURE_RECTANGLE: GLenum = 0x84F5;

/// Texture targets that can carry a mailbox binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum TextureTarget {
    Texture2d = gl::TEXTURE_2D,
    TextureRectangle = GL_TEXTURE_RECTANGLE,
    TextureExternalOes = GL_TEXTURE_EXTERNAL_OES,
    CubeMap = gl::TEXTURE_CUBE_MAP,
}

impl TextureTarget {
    pub fn from_gl(raw: GLenum) -> Option<Self> {
        Self::from_u32(raw)
    }

    pub fn to_gl(self) -> GLenum {
        // Conversion is total for a fieldless repr(u32) enum.
        self.to_u32().unwrap_or(gl::TEXTURE_2D)
    }
}

/// Minification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum MinFilter {
    Nearest = gl::NEAREST,
    Linear = gl::LINEAR,
    NearestMipmapNearest = gl::NEAREST_MIPMAP_NEAREST,
    LinearMipmapNearest = gl::LINEAR_MIPMAP_NEAREST,
    NearestMipmapLinear = gl::NEAREST_MIPMAP_LINEAR,
    LinearMipmapLinear = gl::LINEAR_MIPMAP_LINEAR,
}

impl MinFilter {
    /// Whether sampling with this filter reads mip levels above the base.
    pub fn needs_mips(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }

    pub fn from_gl(raw: GLenum) -> Option<Self> {
        Self::from_u32(raw)
    }

    pub fn to_gl(self) -> GLenum {
        self.to_u32().unwrap_or(gl::LINEAR)
    }
}

/// Magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum MagFilter {
    Nearest = gl::NEAREST,
    Linear = gl::LINEAR,
}

impl MagFilter {
    pub fn from_gl(raw: GLenum) -> Option<Self> {
        Self::from_u32(raw)
    }

    pub fn to_gl(self) -> GLenum {
        self.to_u32().unwrap_or(gl::LINEAR)
    }
}

/// Texture coordinate wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum WrapMode {
    ClampToEdge = gl::CLAMP_TO_EDGE,
    Repeat = gl::REPEAT,
    MirroredRepeat = gl::MIRRORED_REPEAT,
}

impl WrapMode {
    pub fn from_gl(raw: GLenum) -> Option<Self> {
        Self::from_u32(raw)
    }

    pub fn to_gl(self) -> GLenum {
        self.to_u32().unwrap_or(gl::CLAMP_TO_EDGE)
    }
}

/// Size/format record for one texture level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    pub internal_format: GLenum,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub border: i32,
    pub format: GLenum,
    pub type_: GLenum,
}

impl LevelInfo {
    /// A plain 2D RGBA8 level, the common case for shared textures.
    pub fn rgba(width: u32, height: u32) -> Self {
        Self {
            internal_format: gl::RGBA,
            width,
            height,
            depth: 1,
            border: 0,
            format: gl::RGBA,
            type_: gl::UNSIGNED_BYTE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_round_trips_through_raw_glenum() {
        for target in [
            TextureTarget::Texture2d,
            TextureTarget::TextureRectangle,
            TextureTarget::TextureExternalOes,
            TextureTarget::CubeMap,
        ] {
            assert_eq!(TextureTarget::from_gl(target.to_gl()), Some(target));
        }
        assert_eq!(TextureTarget::from_gl(gl::TEXTURE_3D), None);
    }

    #[test]
    fn mip_dependent_min_filters_are_flagged() {
        assert!(!MinFilter::Nearest.needs_mips());
        assert!(!MinFilter::Linear.needs_mips());
        assert!(MinFilter::LinearMipmapLinear.needs_mips());
        assert!(MinFilter::NearestMipmapNearest.needs_mips());
    }

    #[test]
    fn unknown_filter_is_rejected_not_mapped() {
        assert_eq!(MinFilter::from_gl(0xDEAD), None);
        assert_eq!(MagFilter::from_gl(gl::NEAREST_MIPMAP_LINEAR), None);
    }
}
