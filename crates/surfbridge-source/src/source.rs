use surfbridge_core::{TextureName, TextureTarget, TextureTransform};

use crate::error::SourceError;
use crate::listener::{FrameListener, ListenerKey, ListenerRegistration};

/// Result of asking the producer for its newest frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame newer than the last pull is now visible through the texture.
    New,
    /// Nothing new (producer idle or not started). The texture keeps its previous content.
    Unchanged,
}

/// Platform-side producer surface (decoder output) as seen by the bridge.
///
/// Implementations wrap whatever the platform provides; the bridge never looks inside.
pub trait PlatformProducer {
    /// Installs or clears the frame-available callback.
    fn set_frame_listener(&mut self, listener: Option<FrameListener>) -> Result<(), SourceError>;

    /// Latches the newest frame into the bound texture. Blocks for one handle operation.
    fn update_tex_image(&mut self) -> Result<FrameStatus, SourceError>;

    /// Writes the column-major texture transform of the latched frame.
    fn transform_matrix(&mut self, out: &mut [f32; 16]) -> Result<(), SourceError>;
}

/// Constructs producers bound to a target texture.
pub trait ProducerFactory {
    type Producer: PlatformProducer;

    fn create(
        &mut self,
        texture: TextureName,
        target: TextureTarget,
    ) -> Result<Self::Producer, SourceError>;
}

/// The two operations the render node consumes.
pub trait FrameSource {
    fn pull_latest_frame(&mut self) -> Result<FrameStatus, SourceError>;

    /// Must directly follow [`FrameSource::pull_latest_frame`] on the same thread.
    fn fetch_transform(&mut self, out: &mut TextureTransform) -> Result<(), SourceError>;
}

/// A producer bound 1:1 to one external texture, with its listener and scratch buffer.
///
/// Dropping it detaches the listener from the producer, unregisters the listener key and
/// frees the scratch buffer, in that order, once.
pub struct SurfaceSource<P: PlatformProducer> {
    producer: P,
    texture: TextureName,
    target: TextureTarget,
    scratch: Box<[f32; 16]>,
    registration: Option<ListenerRegistration>,
}

impl<P: PlatformProducer> SurfaceSource<P> {
    pub fn bind<F>(
        factory: &mut F,
        texture: TextureName,
        target: TextureTarget,
        registration: ListenerRegistration,
    ) -> Result<Self, SourceError>
    where
        F: ProducerFactory<Producer = P>,
    {
        let mut producer = factory.create(texture, target)?;
        producer.set_frame_listener(Some(registration.listener()))?;

        tracing::debug!(%texture, key = registration.key().0, "producer bound");

        Ok(Self {
            producer,
            texture,
            target,
            scratch: Box::new(*TextureTransform::IDENTITY.as_array()),
            registration: Some(registration),
        })
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn texture(&self) -> TextureName {
        self.texture
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn listener_key(&self) -> Option<ListenerKey> {
        self.registration.as_ref().map(ListenerRegistration::key)
    }
}

impl<P: PlatformProducer> FrameSource for SurfaceSource<P> {
    fn pull_latest_frame(&mut self) -> Result<FrameStatus, SourceError> {
        self.producer.update_tex_image()
    }

    fn fetch_transform(&mut self, out: &mut TextureTransform) -> Result<(), SourceError> {
        self.producer.transform_matrix(&mut self.scratch)?;
        *out = TextureTransform::from_cols_array(*self.scratch);
        Ok(())
    }
}

impl<P: PlatformProducer> Drop for SurfaceSource<P> {
    fn drop(&mut self) {
        if let Some(registration) = self.registration.take() {
            if let Err(e) = self.producer.set_frame_listener(None) {
                tracing::warn!(texture = %self.texture, "detaching frame listener failed: {e}");
            }
            drop(registration);
        }
    }
}

impl<P: PlatformProducer + std::fmt::Debug> std::fmt::Debug for SurfaceSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSource")
            .field("producer", &self.producer)
            .field("texture", &self.texture)
            .field("target", &self.target)
            .field("listener_key", &self.listener_key())
            .finish()
    }
}
