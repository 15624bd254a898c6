//! A producer that needs no platform decoder: a worker thread "decodes" a frame every
//! `1 / fps` seconds and fires the frame-available listener.
//!
//! Useful for hosts bringing up the render side and for exercising the threading model.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use surfbridge_core::{TextureName, TextureTarget, TextureTransform};

use crate::error::SourceError;
use crate::listener::FrameListener;
use crate::source::{FrameStatus, PlatformProducer, ProducerFactory};

#[derive(Debug, Default)]
struct Shared {
    produced: AtomicU64,
    listener: Mutex<Option<FrameListener>>,
}

pub struct SyntheticProducer {
    texture: TextureName,
    transform: TextureTransform,
    shared: Arc<Shared>,
    latched: u64,
    // Dropping the sender wakes the worker out of its frame wait.
    stop: Option<Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SyntheticProducer {
    pub fn spawn(
        texture: TextureName,
        interval: Duration,
        transform: TextureTransform,
    ) -> Result<Self, SourceError> {
        let shared = Arc::new(Shared::default());
        let shared_for_thread = Arc::clone(&shared);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);

        let worker = thread::Builder::new()
            .name(format!("surfbridge-synthetic-{}", texture.get()))
            .spawn(move || produce_loop(shared_for_thread, interval, stop_rx))
            .map_err(|e| SourceError::Bind {
                texture,
                reason: format!("spawn producer thread: {e}"),
            })?;

        Ok(Self {
            texture,
            transform,
            shared,
            latched: 0,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn texture(&self) -> TextureName {
        self.texture
    }

    /// Frames produced so far (latched or not).
    pub fn produced(&self) -> u64 {
        self.shared.produced.load(Ordering::Acquire)
    }

    /// Serial of the frame currently latched into the texture.
    pub fn latched(&self) -> u64 {
        self.latched
    }

    /// Stops the worker and waits for it. Returns within one listener callback, not one
    /// frame interval.
    pub fn stop_worker(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!(texture = %self.texture, "synthetic producer thread panicked");
            }
        }
    }
}

impl PlatformProducer for SyntheticProducer {
    fn set_frame_listener(&mut self, listener: Option<FrameListener>) -> Result<(), SourceError> {
        *self.shared.listener.lock() = listener;
        Ok(())
    }

    fn update_tex_image(&mut self) -> Result<FrameStatus, SourceError> {
        let produced = self.shared.produced.load(Ordering::Acquire);
        if produced > self.latched {
            self.latched = produced;
            Ok(FrameStatus::New)
        } else {
            Ok(FrameStatus::Unchanged)
        }
    }

    fn transform_matrix(&mut self, out: &mut [f32; 16]) -> Result<(), SourceError> {
        *out = *self.transform.as_array();
        Ok(())
    }
}

impl Drop for SyntheticProducer {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

impl std::fmt::Debug for SyntheticProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticProducer")
            .field("texture", &self.texture)
            .field("produced", &self.produced())
            .field("latched", &self.latched)
            .finish()
    }
}

fn produce_loop(shared: Arc<Shared>, interval: Duration, stop: Receiver<()>) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        shared.produced.fetch_add(1, Ordering::AcqRel);

        // Clone out so the callback never runs under our lock.
        let listener = shared.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_frame_available();
        }
    }
}

/// Factory for [`SyntheticProducer`]s running at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct SyntheticFactory {
    interval: Duration,
    transform: TextureTransform,
}

impl SyntheticFactory {
    pub fn new(fps: u32) -> Result<Self, SourceError> {
        if fps == 0 {
            return Err(SourceError::InvalidConfig("fps must be > 0".into()));
        }
        Ok(Self {
            interval: Duration::from_secs(1) / fps,
            transform: TextureTransform::identity(),
        })
    }

    /// Transform reported for every frame (defaults to identity).
    pub fn with_transform(mut self, transform: TextureTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl ProducerFactory for SyntheticFactory {
    type Producer = SyntheticProducer;

    fn create(
        &mut self,
        texture: TextureName,
        _target: TextureTarget,
    ) -> Result<SyntheticProducer, SourceError> {
        SyntheticProducer::spawn(texture, self.interval, self.transform)
    }
}
