//! File-backed [`StateStorePort`] implementation.

mod json_file;

pub use json_file::JsonFileStateStore;
