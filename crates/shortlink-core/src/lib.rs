//! Core types and traits for the shortlink storage layer.
//!
//! This crate provides the link model, the identifier normalization rule
//! and the storage contract shared by every backend in `shortlink_storage`.

pub mod error;
pub mod link;
pub mod normalize;
pub mod storage;

pub use error::{Result, StorageError};
pub use link::{ClickStats, Link};
pub use normalize::normalize;
pub use storage::{ReadStorage, Storage};
