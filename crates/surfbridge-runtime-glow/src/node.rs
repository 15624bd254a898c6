//! The render node: geometry + material, refreshed from the producer once per traversal.

use std::sync::Arc;

use surfbridge_core::{BridgeError, QuadGeometry, Rect, TextureName};
use surfbridge_source::{FrameAvailableSignal, FrameSource, FrameStatus};

use crate::material::SurfaceTextureMaterial;
use crate::scene::PaintNode;

bitflags::bitflags! {
    /// What changed on a node since the host last drew it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        const GEOMETRY = 0b01;
        const MATERIAL = 0b10;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// Host calls `preprocess` on every traversal, before drawing.
        const USE_PREPROCESS = 0b01;
    }
}

/// Observable node state. `Publishing` only exists inside [`SurfaceTextureNode::publish_latest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    Idle,
    FramePending,
    Publishing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub pulls: u64,
    pub new_frames: u64,
    pub pull_failures: u64,
}

#[derive(Debug)]
pub struct SurfaceTextureNode<S: FrameSource> {
    source: S,
    signal: Arc<FrameAvailableSignal>,
    geometry: QuadGeometry,
    material: SurfaceTextureMaterial,
    flags: NodeFlags,
    dirty: DirtyFlags,
    phase: NodePhase,
    stats: NodeStats,
}

impl<S: FrameSource> SurfaceTextureNode<S> {
    pub fn new(
        source: S,
        texture: TextureName,
        signal: Arc<FrameAvailableSignal>,
        blending: bool,
    ) -> Self {
        Self {
            source,
            signal,
            geometry: QuadGeometry::default(),
            material: SurfaceTextureMaterial::new(texture, blending),
            flags: NodeFlags::USE_PREPROCESS,
            dirty: DirtyFlags::GEOMETRY | DirtyFlags::MATERIAL,
            phase: NodePhase::Idle,
            stats: NodeStats::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    pub fn phase(&self) -> NodePhase {
        if self.phase == NodePhase::Idle && self.signal.is_pending() {
            NodePhase::FramePending
        } else {
            self.phase
        }
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    /// Rebuilds the flipped quad for `bounds`.
    pub fn set_rect(&mut self, bounds: Rect) {
        self.geometry = QuadGeometry::textured_rect_flipped(bounds);
        self.mark_dirty(DirtyFlags::GEOMETRY);
    }

    /// Pull, fetch and publish. Runs every traversal whether or not a frame was signalled.
    ///
    /// The pending flag is taken before the pull: a frame landing during the pull raises a
    /// fresh request instead of being cleared unseen.
    pub fn publish_latest(&mut self) -> Result<FrameStatus, BridgeError> {
        self.phase = NodePhase::Publishing;
        let signalled = self.signal.take();

        let result = self.pull_and_fetch();
        self.phase = NodePhase::Idle;

        match result {
            Ok(status) => {
                self.stats.pulls += 1;
                if status == FrameStatus::New {
                    self.stats.new_frames += 1;
                }
                self.mark_dirty(DirtyFlags::MATERIAL);
                tracing::trace!(?status, signalled, "frame published");
                Ok(status)
            }
            Err(e) => {
                self.stats.pull_failures += 1;
                Err(e)
            }
        }
    }

    fn pull_and_fetch(&mut self) -> Result<FrameStatus, BridgeError> {
        let status = self.source.pull_latest_frame()?;
        self.source
            .fetch_transform(&mut self.material.state_mut().transform)?;
        Ok(status)
    }
}

impl<S: FrameSource> PaintNode for SurfaceTextureNode<S> {
    fn flags(&self) -> NodeFlags {
        self.flags
    }

    fn preprocess(&mut self) -> Result<FrameStatus, BridgeError> {
        self.publish_latest()
    }

    fn geometry(&self) -> &QuadGeometry {
        &self.geometry
    }

    fn material(&self) -> &SurfaceTextureMaterial {
        &self.material
    }

    fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::replace(&mut self.dirty, DirtyFlags::empty())
    }
}
