use surfbridge_core::{BridgeError, TextureTarget, TextureTransform};

use crate::gpu::{GpuContext, ProgramId, UniformLocation};
use crate::material::MaterialState;

pub const SURFACE_TEXTURE_VERT: &str = r#"uniform mat4 qt_Matrix;
uniform mat4 uSTMatrix;
attribute vec4 aPosition;
attribute vec4 aTextureCoord;
varying vec2 vTextureCoord;
void main() {
    gl_Position = qt_Matrix * aPosition;
    vTextureCoord = (uSTMatrix * aTextureCoord).xy;
}
"#;

pub const SURFACE_TEXTURE_FRAG: &str = r#"#extension GL_OES_EGL_image_external : require
precision mediump float;
varying vec2 vTextureCoord;
uniform lowp float qt_Opacity;
uniform samplerExternalOES sTexture;
void main() {
    gl_FragColor = texture2D(sTexture, vTextureCoord) * qt_Opacity;
}
"#;

/// Vertex attributes, in location order.
pub const SURFACE_TEXTURE_ATTRIBUTES: [&str; 2] = ["aPosition", "aTextureCoord"];

pub const UNIFORM_MATRIX: &str = "qt_Matrix";
pub const UNIFORM_OPACITY: &str = "qt_Opacity";
pub const UNIFORM_TRANSFORM: &str = "uSTMatrix";
pub const UNIFORM_SAMPLER: &str = "sTexture";

/// Host-side per-draw values (model-view-projection and inherited opacity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub matrix: TextureTransform,
    pub opacity: f32,
}

/// Linked program for the external-image quad with its uniform locations cached.
#[derive(Debug)]
pub struct SurfaceTextureShader {
    program: ProgramId,
    texture_unit: u32,
    loc_matrix: Option<UniformLocation>,
    loc_opacity: Option<UniformLocation>,
    loc_transform: UniformLocation,
}

impl SurfaceTextureShader {
    /// Compiles, links and resolves uniforms. The sampler is pointed at `texture_unit` once
    /// here and never touched again.
    pub fn link<G: GpuContext>(gl: &G, texture_unit: u32) -> Result<Self, BridgeError> {
        let program = gl.link_program(
            SURFACE_TEXTURE_VERT,
            SURFACE_TEXTURE_FRAG,
            &SURFACE_TEXTURE_ATTRIBUTES,
        )?;

        let Some(loc_transform) = gl.uniform_location(program, UNIFORM_TRANSFORM) else {
            gl.delete_program(program);
            return Err(BridgeError::Link(format!("uniform '{UNIFORM_TRANSFORM}' not found")));
        };
        let loc_matrix = gl.uniform_location(program, UNIFORM_MATRIX);
        let loc_opacity = gl.uniform_location(program, UNIFORM_OPACITY);

        gl.use_program(Some(program));
        if let Some(sampler) = gl.uniform_location(program, UNIFORM_SAMPLER) {
            gl.set_uniform_i32(sampler, texture_unit as i32);
        }
        gl.use_program(None);

        tracing::debug!(?program, texture_unit, "surface texture shader linked");

        Ok(Self {
            program,
            texture_unit,
            loc_matrix,
            loc_opacity,
            loc_transform,
        })
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn texture_unit(&self) -> u32 {
        self.texture_unit
    }

    /// Binds the program and uploads the host's matrix and opacity.
    pub fn update_common<G: GpuContext>(&self, gl: &G, render: &RenderState) {
        gl.use_program(Some(self.program));
        if let Some(loc) = self.loc_matrix {
            gl.set_uniform_mat4(loc, render.matrix.as_array());
        }
        if let Some(loc) = self.loc_opacity {
            gl.set_uniform_f32(loc, render.opacity);
        }
    }

    /// Publishes `state` to the GPU: transform uniform plus texture binding, nothing else.
    pub fn update_state<G: GpuContext>(&self, gl: &G, state: &MaterialState) {
        gl.set_uniform_mat4(self.loc_transform, state.transform.as_array());
        gl.bind_texture_unit(
            self.texture_unit,
            TextureTarget::ExternalOes,
            Some(state.texture),
        );
    }

    pub fn destroy<G: GpuContext>(&mut self, gl: &G) {
        gl.delete_program(self.program);
    }
}
