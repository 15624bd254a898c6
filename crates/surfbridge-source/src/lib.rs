//! Producer side of the bridge.
//!
//! This crate owns everything that may be touched off the render thread (the coalescing
//! frame-available signal, the listener table and the update queue) plus the binding
//! between a platform producer and the texture it writes into.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod error;
pub mod listener;
pub mod signal;
pub mod source;
pub mod synthetic;

pub use error::SourceError;
pub use listener::{FrameListener, ListenerKey, ListenerRegistration, ListenerTable};
pub use signal::{update_queue, FrameAvailableSignal, UpdateReceiver, UpdateRequester};
pub use source::{FrameSource, FrameStatus, PlatformProducer, ProducerFactory, SurfaceSource};
pub use synthetic::{SyntheticFactory, SyntheticProducer};
