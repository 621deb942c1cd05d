#![doc = "f3cp-core: core logic library for f3cp."]

//! This crate contains the transport-independent logic of f3cp: moving
//! repository objects to and from a portable JSON array, and flattening
//! their metadata streams into triples.
//!
//! # Modules
//! - [`contract`]: the [`Repository`](contract::Repository) capability the core consumes
//! - [`model`]: object, datastream and content types with their JSON form
//! - [`transcode`]: fetch one object / reconcile one object against a store
//! - [`stream`]: array-at-a-time dump and load over many objects
//! - [`metadata`]: extractors and the [`Normalizer`](metadata::Normalizer)
//! - [`prefix`]: namespace prefix compaction
//! - [`xml`]: shared XML helpers

pub mod contract;
pub mod metadata;
pub mod model;
pub mod prefix;
pub mod stream;
pub mod transcode;
pub mod xml;
