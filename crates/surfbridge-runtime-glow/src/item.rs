//! The visual item that owns the external texture and the producer binding.

use std::rc::Rc;
use std::sync::Arc;

use surfbridge_core::{BridgeConfig, BridgeError, ItemId, Rect};
use surfbridge_source::{
    FrameAvailableSignal, ListenerKey, ListenerTable, ProducerFactory, SurfaceSource,
    UpdateRequester,
};

use crate::gpu::GpuContext;
use crate::node::{NodeStats, SurfaceTextureNode};
use crate::scene::{PaintNode, SceneItem};
use crate::texture::ExternalTexture;

type ProducerOf<F> = <F as ProducerFactory>::Producer;

// Field order is drop order: the node (and the binding inside it) goes before the texture.
struct ItemResources<G: GpuContext, F: ProducerFactory> {
    node: SurfaceTextureNode<SurfaceSource<ProducerOf<F>>>,
    texture: ExternalTexture<G>,
}

pub struct SurfaceTextureItem<G: GpuContext, F: ProducerFactory> {
    id: ItemId,
    resources: Option<ItemResources<G, F>>,
    gl: Rc<G>,
    factory: F,
    config: BridgeConfig,
    bounds: Rect,
    opacity: f32,
    geometry_dirty: bool,
    signal: Arc<FrameAvailableSignal>,
    requester: UpdateRequester,
    listeners: Arc<ListenerTable>,
    producer_changed: Vec<Box<dyn FnMut(&ProducerOf<F>)>>,
}

impl<G: GpuContext, F: ProducerFactory> SurfaceTextureItem<G, F> {
    pub fn new(
        id: ItemId,
        gl: Rc<G>,
        factory: F,
        config: BridgeConfig,
        requester: UpdateRequester,
        listeners: Arc<ListenerTable>,
    ) -> Self {
        let signal = Arc::new(FrameAvailableSignal::new(id, requester.clone()));
        Self {
            id,
            resources: None,
            gl,
            factory,
            config,
            bounds: Rect::default(),
            opacity: 1.0,
            geometry_dirty: true,
            signal,
            requester,
            listeners,
            producer_changed: Vec::new(),
        }
    }

    /// The producer, once the first traversal has created it.
    pub fn producer(&self) -> Option<&ProducerOf<F>> {
        self.resources
            .as_ref()
            .map(|r| r.node.source().producer())
    }

    /// Fires once, when the producer first becomes available.
    pub fn on_producer_changed(&mut self, callback: impl FnMut(&ProducerOf<F>) + 'static) {
        self.producer_changed.push(Box::new(callback));
    }

    pub fn signal(&self) -> &Arc<FrameAvailableSignal> {
        &self.signal
    }

    pub fn listener_key(&self) -> Option<ListenerKey> {
        self.resources
            .as_ref()
            .and_then(|r| r.node.source().listener_key())
    }

    pub fn node(&self) -> Option<&SurfaceTextureNode<SurfaceSource<ProducerOf<F>>>> {
        self.resources.as_ref().map(|r| &r.node)
    }

    pub fn node_stats(&self) -> Option<NodeStats> {
        self.node().map(SurfaceTextureNode::stats)
    }

    pub fn texture(&self) -> Option<&ExternalTexture<G>> {
        self.resources.as_ref().map(|r| &r.texture)
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn create_resources(&mut self) -> Result<(), BridgeError> {
        let texture = ExternalTexture::create(&self.gl, self.config.texture_filter)?;
        let registration = self.listeners.register(&self.signal);
        // On failure `texture` drops here and the GPU name is released.
        let source =
            SurfaceSource::bind(&mut self.factory, texture.name(), texture.target(), registration)?;
        let node = SurfaceTextureNode::new(
            source,
            texture.name(),
            Arc::clone(&self.signal),
            self.config.blending,
        );

        tracing::debug!(item = %self.id, texture = %texture.name(), "render node created");
        let resources = self.resources.insert(ItemResources { node, texture });

        let producer = resources.node.source().producer();
        for callback in self.producer_changed.iter_mut() {
            callback(producer);
        }
        Ok(())
    }
}

impl<G: GpuContext, F: ProducerFactory> SceneItem for SurfaceTextureItem<G, F> {
    fn id(&self) -> ItemId {
        self.id
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Geometry is rebuilt on the next traversal, only if the bounds actually changed.
    fn set_bounds(&mut self, bounds: Rect) {
        if bounds == self.bounds {
            return;
        }
        self.bounds = bounds;
        self.geometry_dirty = true;
        self.requester.request_update(self.id);
    }

    fn update_paint_node(&mut self) -> Result<(), BridgeError> {
        if self.resources.is_none() {
            self.create_resources()?;
        }
        if self.geometry_dirty {
            if let Some(r) = self.resources.as_mut() {
                r.node.set_rect(self.bounds);
            }
            self.geometry_dirty = false;
        }
        Ok(())
    }

    fn paint_node(&mut self) -> Option<&mut dyn PaintNode> {
        self.resources
            .as_mut()
            .map(|r| &mut r.node as &mut dyn PaintNode)
    }
}

impl<G: GpuContext, F: ProducerFactory> Drop for SurfaceTextureItem<G, F> {
    fn drop(&mut self) {
        if let Some(resources) = self.resources.take() {
            tracing::debug!(item = %self.id, "releasing render node resources");
            drop(resources);
        }
    }
}

impl<G: GpuContext, F: ProducerFactory> std::fmt::Debug for SurfaceTextureItem<G, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceTextureItem")
            .field("id", &self.id)
            .field("bounds", &self.bounds)
            .field("opacity", &self.opacity)
            .field("texture", &self.texture())
            .field("listener_key", &self.listener_key())
            .finish()
    }
}
