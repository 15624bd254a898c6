use surfbridge_core::{TextureName, TextureTransform};

/// What the shader consumes at draw time.
///
/// Equality is bitwise on both fields. The render loop never uses it to skip `update_state`:
/// a playing stream changes texture content without changing either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialState {
    pub transform: TextureTransform,
    pub texture: TextureName,
}

impl MaterialState {
    pub fn new(texture: TextureName) -> Self {
        Self {
            transform: TextureTransform::identity(),
            texture,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceTextureMaterial {
    state: MaterialState,
    blending: bool,
}

impl SurfaceTextureMaterial {
    pub fn new(texture: TextureName, blending: bool) -> Self {
        Self {
            state: MaterialState::new(texture),
            blending,
        }
    }

    pub fn state(&self) -> &MaterialState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MaterialState {
        &mut self.state
    }

    pub fn blending(&self) -> bool {
        self.blending
    }
}
