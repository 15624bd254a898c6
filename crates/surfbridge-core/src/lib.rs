//! surfbridge core: error type, configuration and the small value types shared by the
//! producer side and the render side.
//!
//! No GPU handles and no threads live here.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod transform;

pub use config::{BridgeConfig, TextureFilter, MAX_TEXTURE_UNITS};
pub use error::BridgeError;
pub use geometry::{QuadGeometry, Rect, TexturedPoint2D};
pub use handle::{TextureName, TextureTarget, GL_TEXTURE_EXTERNAL_OES};
pub use transform::TextureTransform;

/// Identifies one visual item within a render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u32);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}
