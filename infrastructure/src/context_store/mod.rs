//! Append-only [`ContextStorePort`] implementation.

mod jsonl;

pub use jsonl::JsonlContextStore;
