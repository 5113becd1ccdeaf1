//! Services - business logic and shared state
//!
//! This module contains the core logic of the hub:
//! - `classifier` - parking occupancy to road-state label
//! - `buffer` - shared FIFO of pending labeled readings
//! - `ingest` - single ingest operation and batch flush trigger
//! - `subscribers` - live subscriber registry and fan-out

pub mod buffer;
pub mod classifier;
pub mod ingest;
pub mod subscribers;

// Re-export commonly used types
pub use buffer::{BufferError, IngestionBuffer};
pub use classifier::{classify, process_agent_data};
pub use ingest::Ingestor;
pub use subscribers::{SubscriberId, SubscriberRegistry};
