//! Minimal retained-mode host: sync dirty items, preprocess nodes, draw.
//!
//! This is the render-thread side of the bridge. It owns the update receiver, so queued
//! frame-available requests are only ever acted on here.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use surfbridge_core::{BridgeConfig, BridgeError, ItemId, QuadGeometry, Rect, TextureTransform};
use surfbridge_source::{update_queue, FrameStatus, ListenerTable, UpdateReceiver, UpdateRequester};

use crate::gpu::{BufferId, GpuContext};
use crate::material::SurfaceTextureMaterial;
use crate::node::{DirtyFlags, NodeFlags};
use crate::shader::{RenderState, SurfaceTextureShader};

/// A drawable node as the host sees it.
pub trait PaintNode {
    fn flags(&self) -> NodeFlags;
    fn preprocess(&mut self) -> Result<FrameStatus, BridgeError>;
    fn geometry(&self) -> &QuadGeometry;
    fn material(&self) -> &SurfaceTextureMaterial;
    fn take_dirty(&mut self) -> DirtyFlags;
}

/// A visual item that may own a paint node.
pub trait SceneItem {
    fn id(&self) -> ItemId;

    fn opacity(&self) -> f32 {
        1.0
    }

    fn bounds(&self) -> Rect;

    /// Layout input. Implementations request an update when the bounds actually change.
    fn set_bounds(&mut self, bounds: Rect);

    /// Re-evaluates the item on the render thread. Called on the first traversal after the
    /// item is added and after every update request for it.
    fn update_paint_node(&mut self) -> Result<(), BridgeError>;

    fn paint_node(&mut self) -> Option<&mut dyn PaintNode>;
}

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Raw update requests drained from the queue.
    pub requests: usize,
    /// Items whose `update_paint_node` ran.
    pub re_evaluated: usize,
    pub pulls: usize,
    pub new_frames: usize,
    pub pull_failures: usize,
    /// Items whose `update_paint_node` failed. They stay in the scene without a node.
    pub sync_failures: usize,
    pub drawn: usize,
}

pub struct RenderLoop<G: GpuContext> {
    gl: Rc<G>,
    config: BridgeConfig,
    requester: UpdateRequester,
    updates: UpdateReceiver,
    listeners: Arc<ListenerTable>,
    items: Vec<Box<dyn SceneItem>>,
    dirty: BTreeSet<ItemId>,
    next_item: u32,
    viewport: (f32, f32),
    shader: Option<SurfaceTextureShader>,
    buffers: HashMap<ItemId, BufferId>,
    sync_errors: Vec<(ItemId, BridgeError)>,
    frames: u64,
}

impl<G: GpuContext> RenderLoop<G> {
    pub fn new(gl: Rc<G>, config: BridgeConfig) -> Self {
        Self::with_listener_table(gl, config, ListenerTable::new())
    }

    /// Uses `listeners` for every item, e.g. [`ListenerTable::global`] when the platform
    /// trampoline can only reach a process-wide table.
    pub fn with_listener_table(
        gl: Rc<G>,
        config: BridgeConfig,
        listeners: Arc<ListenerTable>,
    ) -> Self {
        let (requester, updates) = update_queue();
        Self {
            gl,
            config,
            requester,
            updates,
            listeners,
            items: Vec::new(),
            dirty: BTreeSet::new(),
            next_item: 1,
            viewport: (1.0, 1.0),
            shader: None,
            buffers: HashMap::new(),
            sync_errors: Vec::new(),
            frames: 0,
        }
    }

    pub fn gl(&self) -> &Rc<G> {
        &self.gl
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn requester(&self) -> UpdateRequester {
        self.requester.clone()
    }

    pub fn listeners(&self) -> &Arc<ListenerTable> {
        &self.listeners
    }

    pub fn allocate_item_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        id
    }

    pub fn add_item(&mut self, item: Box<dyn SceneItem>) {
        let id = item.id();
        tracing::debug!(item = %id, "item added");
        self.dirty.insert(id);
        self.items.push(item);
    }

    /// Tears the item down on the render thread. Its texture and producer binding are
    /// released before this returns.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.id() == id) else {
            return false;
        };
        drop(self.items.remove(pos));
        self.dirty.remove(&id);
        if let Some(buffer) = self.buffers.remove(&id) {
            self.gl.delete_buffer(buffer);
        }
        tracing::debug!(item = %id, "item removed");
        true
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut (dyn SceneItem + 'static)> {
        self.items
            .iter_mut()
            .find(|i| i.id() == id)
            .map(|i| i.as_mut())
    }

    /// Schedules a re-evaluation of `id` on the next traversal.
    pub fn request_update(&self, id: ItemId) -> bool {
        self.requester.request_update(id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Items that failed to sync during the most recent traversal, with their errors.
    pub fn sync_errors(&self) -> &[(ItemId, BridgeError)] {
        &self.sync_errors
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width.max(1.0), height.max(1.0));
    }

    /// Blocks until an update is requested or `timeout` elapses.
    pub fn wait_for_update(&mut self, timeout: Duration) -> bool {
        match self.updates.recv_timeout(timeout) {
            Some(id) => {
                self.dirty.insert(id);
                true
            }
            None => false,
        }
    }

    /// One traversal: sync, preprocess, draw.
    ///
    /// Per-item sync failures are counted in [`FrameReport::sync_failures`] and kept in
    /// [`RenderLoop::sync_errors`]. `Err` is only returned for failures shared by every item,
    /// such as the shader failing to link.
    pub fn render_frame(&mut self) -> Result<FrameReport, BridgeError> {
        self.sync_errors.clear();
        let mut report = FrameReport {
            requests: self.updates.drain_into(&mut self.dirty),
            ..FrameReport::default()
        };

        // Sync: re-evaluate every requested item once, however many requests it got.
        // A failing item is left without a node; the others still publish and draw.
        for item in self.items.iter_mut() {
            let id = item.id();
            if !self.dirty.remove(&id) {
                continue;
            }
            report.re_evaluated += 1;
            if let Err(e) = item.update_paint_node() {
                tracing::error!(item = %id, "update_paint_node failed: {e}");
                report.sync_failures += 1;
                self.sync_errors.push((id, e));
            }
        }
        self.dirty.clear();

        // Preprocess: every node that asked for it, every traversal.
        for item in self.items.iter_mut() {
            let id = item.id();
            let Some(node) = item.paint_node() else {
                continue;
            };
            if !node.flags().contains(NodeFlags::USE_PREPROCESS) {
                continue;
            }
            match node.preprocess() {
                Ok(status) => {
                    report.pulls += 1;
                    if status == FrameStatus::New {
                        report.new_frames += 1;
                    }
                }
                Err(e) => {
                    report.pull_failures += 1;
                    tracing::warn!(item = %id, "frame pull failed, keeping last frame: {e}");
                }
            }
        }

        // Draw.
        let any_node = self.items.iter_mut().any(|i| i.paint_node().is_some());
        if any_node && self.shader.is_none() {
            self.shader = Some(SurfaceTextureShader::link(
                self.gl.as_ref(),
                self.config.texture_unit,
            )?);
        }
        let Some(shader) = self.shader.as_ref() else {
            self.frames += 1;
            return Ok(report);
        };

        let (w, h) = self.viewport;
        let projection = TextureTransform::ortho(0.0, w, h, 0.0);
        let gl = self.gl.as_ref();

        for item in self.items.iter_mut() {
            let id = item.id();
            let opacity = item.opacity();
            let Some(node) = item.paint_node() else {
                continue;
            };
            let dirty = node.take_dirty();

            let (buffer, fresh) = match self.buffers.get(&id) {
                Some(b) => (*b, false),
                None => {
                    let b = gl.create_vertex_buffer()?;
                    self.buffers.insert(id, b);
                    (b, true)
                }
            };
            if fresh || dirty.contains(DirtyFlags::GEOMETRY) {
                gl.upload_vertices(buffer, &node.geometry().to_interleaved());
            }

            let material = node.material();
            gl.set_blending(material.blending());
            shader.update_common(
                gl,
                &RenderState {
                    matrix: projection,
                    opacity,
                },
            );
            // Video content changes behind an unchanged state; never skipped on equality.
            shader.update_state(gl, material.state());

            gl.draw_textured_strip(buffer, QuadGeometry::VERTEX_COUNT as i32);
            report.drawn += 1;
        }
        gl.use_program(None);

        self.frames += 1;
        Ok(report)
    }
}

impl<G: GpuContext> Drop for RenderLoop<G> {
    fn drop(&mut self) {
        // Items first: their textures must go while the context is still ours.
        self.items.clear();
        for (_, buffer) in self.buffers.drain() {
            self.gl.delete_buffer(buffer);
        }
        if let Some(mut shader) = self.shader.take() {
            shader.destroy(self.gl.as_ref());
        }
    }
}

impl<G: GpuContext> std::fmt::Debug for RenderLoop<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("items", &self.items.len())
            .field("dirty", &self.dirty)
            .field("viewport", &self.viewport)
            .field("shader", &self.shader)
            .field("frames", &self.frames)
            .finish()
    }
}
