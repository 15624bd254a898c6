//! The GPU seam.
//!
//! Every GL call the bridge makes goes through [`GpuContext`]. The `glow::Context`
//! implementation below is what hosts use; tests substitute a recording double. All methods
//! must be called on the thread that has the context current. The runtime holds the context
//! behind an `Rc`.

use glow::HasContext;
use std::num::NonZeroU32;

use surfbridge_core::{BridgeError, TextureFilter, TextureName, TextureTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

pub trait GpuContext {
    /// Whether a context is current on the calling thread.
    fn has_current_context(&self) -> bool;

    /// Creates a texture on the external-image target with clamp-to-edge wrapping.
    fn create_external_texture(&self, filter: TextureFilter) -> Result<TextureName, BridgeError>;
    fn delete_texture(&self, target: TextureTarget, texture: TextureName);
    fn bind_texture_unit(&self, unit: u32, target: TextureTarget, texture: Option<TextureName>);

    /// Compiles and links a program. `attributes[i]` is bound to location `i` before linking.
    fn link_program(
        &self,
        vert_src: &str,
        frag_src: &str,
        attributes: &[&str],
    ) -> Result<ProgramId, BridgeError>;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn set_uniform_i32(&self, location: UniformLocation, value: i32);
    fn set_uniform_f32(&self, location: UniformLocation, value: f32);
    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]);

    fn create_vertex_buffer(&self) -> Result<BufferId, BridgeError>;
    fn upload_vertices(&self, buffer: BufferId, data: &[f32]);
    fn delete_buffer(&self, buffer: BufferId);

    fn set_blending(&self, enabled: bool);
    /// Draws `vertex_count` interleaved `[x, y, u, v]` vertices as a triangle strip, with
    /// position on attribute 0 and texture coordinate on attribute 1.
    fn draw_textured_strip(&self, buffer: BufferId, vertex_count: i32);
}

fn gl_filter(filter: TextureFilter) -> i32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST as i32,
        TextureFilter::Linear => glow::LINEAR as i32,
    }
}

/// A bare `glow::Context` carries no handle to the platform context, so it cannot ask whether
/// that context is still current. It answers `true`: a `glow::Context` can only be built from
/// a loader while the host's context is current, and the runtime keeps it behind an `Rc` on
/// that thread. Hosts that can lose the context wrap it in [`HostGl`] instead.
impl GpuContext for glow::Context {
    fn has_current_context(&self) -> bool {
        true
    }

    fn create_external_texture(&self, filter: TextureFilter) -> Result<TextureName, BridgeError> {
        let target = TextureTarget::ExternalOes.gl_enum();
        unsafe {
            let tex = self
                .create_texture()
                .map_err(|e| BridgeError::GlCreate(format!("create_texture failed: {e:?}")))?;
            self.bind_texture(target, Some(tex));

            // External images have no mip chain.
            self.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, gl_filter(filter));
            self.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, gl_filter(filter));
            self.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            self.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);

            self.bind_texture(target, None);
            Ok(TextureName(tex.0))
        }
    }

    fn delete_texture(&self, target: TextureTarget, texture: TextureName) {
        unsafe {
            self.bind_texture(target.gl_enum(), None);
            glow::HasContext::delete_texture(self, glow::NativeTexture(texture.0));
        }
    }

    fn bind_texture_unit(&self, unit: u32, target: TextureTarget, texture: Option<TextureName>) {
        unsafe {
            self.active_texture(glow::TEXTURE0 + unit);
            self.bind_texture(target.gl_enum(), texture.map(|t| glow::NativeTexture(t.0)));
        }
    }

    fn link_program(
        &self,
        vert_src: &str,
        frag_src: &str,
        attributes: &[&str],
    ) -> Result<ProgramId, BridgeError> {
        unsafe {
            let vs = self
                .create_shader(glow::VERTEX_SHADER)
                .map_err(|e| BridgeError::GlCreate(format!("create_shader(VS) failed: {e:?}")))?;
            self.shader_source(vs, vert_src);
            self.compile_shader(vs);
            if !self.get_shader_compile_status(vs) {
                let log = self.get_shader_info_log(vs);
                self.delete_shader(vs);
                return Err(BridgeError::VertexCompile(log));
            }

            let fs = self
                .create_shader(glow::FRAGMENT_SHADER)
                .map_err(|e| BridgeError::GlCreate(format!("create_shader(FS) failed: {e:?}")))?;
            self.shader_source(fs, frag_src);
            self.compile_shader(fs);
            if !self.get_shader_compile_status(fs) {
                let log = self.get_shader_info_log(fs);
                self.delete_shader(vs);
                self.delete_shader(fs);
                return Err(BridgeError::FragmentCompile(log));
            }

            let program = self
                .create_program()
                .map_err(|e| BridgeError::GlCreate(format!("create_program failed: {e:?}")))?;
            self.attach_shader(program, vs);
            self.attach_shader(program, fs);
            for (index, name) in attributes.iter().enumerate() {
                self.bind_attrib_location(program, index as u32, name);
            }
            glow::HasContext::link_program(self, program);

            self.detach_shader(program, vs);
            self.detach_shader(program, fs);
            self.delete_shader(vs);
            self.delete_shader(fs);

            if !self.get_program_link_status(program) {
                let log = self.get_program_info_log(program);
                glow::HasContext::delete_program(self, program);
                return Err(BridgeError::Link(log));
            }

            Ok(ProgramId(program.0))
        }
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe { glow::HasContext::delete_program(self, glow::NativeProgram(program.0)) }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe { glow::HasContext::use_program(self, program.map(|p| glow::NativeProgram(p.0))) }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.get_uniform_location(glow::NativeProgram(program.0), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn set_uniform_i32(&self, location: UniformLocation, value: i32) {
        unsafe { self.uniform_1_i32(Some(&glow::NativeUniformLocation(location.0)), value) }
    }

    fn set_uniform_f32(&self, location: UniformLocation, value: f32) {
        unsafe { self.uniform_1_f32(Some(&glow::NativeUniformLocation(location.0)), value) }
    }

    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        unsafe {
            self.uniform_matrix_4_f32_slice(
                Some(&glow::NativeUniformLocation(location.0)),
                false,
                value,
            )
        }
    }

    fn create_vertex_buffer(&self) -> Result<BufferId, BridgeError> {
        unsafe {
            let buf = self
                .create_buffer()
                .map_err(|e| BridgeError::GlCreate(format!("create_buffer: {e}")))?;
            Ok(BufferId(buf.0))
        }
    }

    fn upload_vertices(&self, buffer: BufferId, data: &[f32]) {
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer.0)));
            self.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::DYNAMIC_DRAW,
            );
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        unsafe { glow::HasContext::delete_buffer(self, glow::NativeBuffer(buffer.0)) }
    }

    fn set_blending(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.enable(glow::BLEND);
                // Premultiplied alpha: the fragment stage scales rgb and a by opacity.
                self.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                self.disable(glow::BLEND);
            }
        }
    }

    fn draw_textured_strip(&self, buffer: BufferId, vertex_count: i32) {
        const STRIDE: i32 = 4 * 4;
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer.0)));

            self.enable_vertex_attrib_array(0);
            self.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, STRIDE, 0);
            self.enable_vertex_attrib_array(1);
            self.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, STRIDE, 2 * 4);

            self.draw_arrays(glow::TRIANGLE_STRIP, 0, vertex_count);

            self.disable_vertex_attrib_array(0);
            self.disable_vertex_attrib_array(1);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }
}

/// A `glow::Context` paired with the host's "is my context current" check, e.g.
/// `move || gl_context.is_current()` over a glutin context.
pub struct HostGl<F> {
    gl: glow::Context,
    is_current: F,
}

impl<F: Fn() -> bool> HostGl<F> {
    pub fn new(gl: glow::Context, is_current: F) -> Self {
        Self { gl, is_current }
    }

    pub fn glow(&self) -> &glow::Context {
        &self.gl
    }
}

impl<F> std::fmt::Debug for HostGl<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostGl").finish_non_exhaustive()
    }
}

impl<F: Fn() -> bool> GpuContext for HostGl<F> {
    fn has_current_context(&self) -> bool {
        (self.is_current)()
    }

    fn create_external_texture(&self, filter: TextureFilter) -> Result<TextureName, BridgeError> {
        GpuContext::create_external_texture(&self.gl, filter)
    }

    fn delete_texture(&self, target: TextureTarget, texture: TextureName) {
        GpuContext::delete_texture(&self.gl, target, texture)
    }

    fn bind_texture_unit(&self, unit: u32, target: TextureTarget, texture: Option<TextureName>) {
        GpuContext::bind_texture_unit(&self.gl, unit, target, texture)
    }

    fn link_program(
        &self,
        vert_src: &str,
        frag_src: &str,
        attributes: &[&str],
    ) -> Result<ProgramId, BridgeError> {
        GpuContext::link_program(&self.gl, vert_src, frag_src, attributes)
    }

    fn delete_program(&self, program: ProgramId) {
        GpuContext::delete_program(&self.gl, program)
    }

    fn use_program(&self, program: Option<ProgramId>) {
        GpuContext::use_program(&self.gl, program)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        GpuContext::uniform_location(&self.gl, program, name)
    }

    fn set_uniform_i32(&self, location: UniformLocation, value: i32) {
        GpuContext::set_uniform_i32(&self.gl, location, value)
    }

    fn set_uniform_f32(&self, location: UniformLocation, value: f32) {
        GpuContext::set_uniform_f32(&self.gl, location, value)
    }

    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        GpuContext::set_uniform_mat4(&self.gl, location, value)
    }

    fn create_vertex_buffer(&self) -> Result<BufferId, BridgeError> {
        GpuContext::create_vertex_buffer(&self.gl)
    }

    fn upload_vertices(&self, buffer: BufferId, data: &[f32]) {
        GpuContext::upload_vertices(&self.gl, buffer, data)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        GpuContext::delete_buffer(&self.gl, buffer)
    }

    fn set_blending(&self, enabled: bool) {
        GpuContext::set_blending(&self.gl, enabled)
    }

    fn draw_textured_strip(&self, buffer: BufferId, vertex_count: i32) {
        GpuContext::draw_textured_strip(&self.gl, buffer, vertex_count)
    }
}
