//! Scanout and cursor buffer objects on top of a kernel GPU memory manager.
//!
//! A [`Driver`] wraps one backend connection; each [`BufferObject`] created from it
//! can be mapped lazily into the process and is released in order (mapping, then
//! kernel handle) when destroyed.

pub mod drm;
pub mod error;
pub mod kms;
pub mod utils;

pub use error::{KmsError, KmsResult};
pub use kms::{BoType, BufferObject, Driver, MemoryBackend};
