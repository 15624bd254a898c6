use std::num::NonZeroU32;

/// GL enum value of `GL_TEXTURE_EXTERNAL_OES` (OES_EGL_image_external).
pub const GL_TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

/// Binding target of a texture handle.
///
/// Only the external-image target exists: the bridge samples platform-native image memory
/// and never uploads pixels itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    #[default]
    ExternalOes,
}

impl TextureTarget {
    pub const fn gl_enum(self) -> u32 {
        match self {
            TextureTarget::ExternalOes => GL_TEXTURE_EXTERNAL_OES,
        }
    }
}

/// A GPU texture name. Zero is never a valid name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureName(pub NonZeroU32);

impl TextureName {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for TextureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}
