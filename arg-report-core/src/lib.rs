#![doc = "arg-report-core: core logic library for arg-report."]

//! This crate holds the exploration side of report generation: it walks a
//! simulation data directory, classifies what it finds, reconciles it with
//! the analyst's parameters file and emits the YAML structure document that
//! a rendering backend turns into a report.
//!
//! # Modules
//! - [`contract`]: the backend markup service and built-in backends
//! - [`types`]: supported type tables (verbosity, report, backend, classification)
//! - [`error`]: fatal configuration and I/O errors
//! - [`parameters`]: the parameter store
//! - [`mutables`]: generated report values persisted across runs
//! - [`case`]: the explorator case model
//! - [`classify`]: the file classifier
//! - [`resolve`]: geometry, deck, log, mesh, solution and mapping resolution
//! - [`structure`]: the structure document tree and its serializer
//! - [`synthesize`]: case to structure document
//! - [`explore`]: the end-to-end pipeline

pub mod case;
pub mod classify;
pub mod contract;
pub mod error;
pub mod explore;
pub mod mutables;
pub mod parameters;
pub mod resolve;
pub mod structure;
pub mod synthesize;
pub mod types;

/// Tool version recorded in structure files and mutables.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
