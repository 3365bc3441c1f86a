//! Core logic for maniph: Conduit transport, identifier cache, entity
//! resolution, transaction encoding and task mutations.

pub mod cache;
pub mod conduit;
pub mod config;
pub mod ops;
pub mod resolver;
pub mod task;
pub mod transactions;

#[cfg(test)]
pub(crate) mod testing;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
