//! surfbridge runtime (glow/OpenGL ES backend)
//
// This crate contains the render-thread half of the bridge:
// - own the external-image texture (create once, delete once)
// - pull the newest producer frame + transform once per traversal
// - publish both to the external-sampler shader and draw the flipped quad
//
// It does NOT contain windowing, the platform decoder, or any producer-thread logic beyond
// reading the coalesced update queue.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod gpu;
pub mod item;
pub mod material;
pub mod node;
pub mod scene;
pub mod shader;
pub mod texture;

pub use surfbridge_core::{BridgeConfig, BridgeError};

pub use gpu::{BufferId, GpuContext, HostGl, ProgramId, UniformLocation};
pub use item::SurfaceTextureItem;
pub use material::{MaterialState, SurfaceTextureMaterial};
pub use node::{DirtyFlags, NodeFlags, NodePhase, NodeStats, SurfaceTextureNode};
pub use scene::{FrameReport, PaintNode, RenderLoop, SceneItem};
pub use shader::{RenderState, SurfaceTextureShader};
pub use texture::ExternalTexture;
