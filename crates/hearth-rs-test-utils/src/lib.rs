//! Test helpers shared across Hearth crates.

pub mod events;
pub mod generator;
pub mod store;

pub use events::RecordingSink;
pub use generator::{FailingGenerator, FixedGenerator, Gate, GatedGenerator, RecordingGenerator};
pub use store::{MemoryChatStore, row};
