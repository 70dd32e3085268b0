//! examprep-store: Attempt-record storage and configuration.
//!
//! Implements the `AttemptStore` trait over memory and JSON-lines files,
//! and loads `examprep.toml`.

pub mod config;
pub mod error;
pub mod jsonl;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, ExamprepConfig, StoreConfig};
pub use error::StoreError;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
