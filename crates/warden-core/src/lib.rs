//! Core types and the reader registry for Warden.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::SnapshotStore`]; transports feed commands into
//! [`registry::Registry::execute`] and reader events into
//! [`ingest::EventIngestor`].

pub mod command;
pub mod error;
pub mod ingest;
pub mod model;
pub mod registry;
pub mod store;

pub use error::{Error, Result};
pub use registry::Registry;
