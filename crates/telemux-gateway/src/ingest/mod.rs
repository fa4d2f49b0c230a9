//! Ingestion side: buffering raw frames for batched persistence.

pub mod buffer;

pub use buffer::{BufferEntry, EnqueueOutcome, FlushReport, FrameBuffer};
