//! Storage backends, deck snapshots, and offline caching.

pub mod cache;
pub mod config;
pub mod image;
pub mod kv;
pub mod records;
pub mod snapshot;
#[cfg(test)]
mod test_support;

pub use cache::*;
pub use config::*;
pub use image::*;
pub use kv::*;
pub use records::*;
pub use snapshot::*;
