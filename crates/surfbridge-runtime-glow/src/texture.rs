use std::rc::Rc;

use surfbridge_core::{BridgeError, TextureFilter, TextureName, TextureTarget};

use crate::gpu::GpuContext;

/// The one external-image texture an item owns.
///
/// Move-only: the GPU name is created in [`ExternalTexture::create`] and deleted exactly once
/// when the value drops. Holding the context by `Rc` keeps the texture on the render thread.
pub struct ExternalTexture<G: GpuContext> {
    gl: Rc<G>,
    name: TextureName,
    target: TextureTarget,
}

impl<G: GpuContext> ExternalTexture<G> {
    pub fn create(gl: &Rc<G>, filter: TextureFilter) -> Result<Self, BridgeError> {
        if !gl.has_current_context() {
            return Err(BridgeError::NoContext);
        }
        let name = gl.create_external_texture(filter)?;
        tracing::debug!(texture = %name, ?filter, "external texture created");
        Ok(Self {
            gl: Rc::clone(gl),
            name,
            target: TextureTarget::ExternalOes,
        })
    }

    pub fn name(&self) -> TextureName {
        self.name
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }
}

impl<G: GpuContext> Drop for ExternalTexture<G> {
    fn drop(&mut self) {
        self.gl.delete_texture(self.target, self.name);
        tracing::debug!(texture = %self.name, "external texture destroyed");
    }
}

impl<G: GpuContext> std::fmt::Debug for ExternalTexture<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalTexture")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}
