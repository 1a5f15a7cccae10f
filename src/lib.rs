// src/lib.rs

//! pirg: requirements.txt bookkeeping for pip
//!
//! Installs and removes packages through pip while keeping the project's
//! requirements file in step with what was asked for.
//!
//! # Architecture
//!
//! - Package tokens (`name[extras]specifier`) are parsed into `PackageRecord`s
//! - The resolver turns tokens into records using the package index, pinning
//!   to the newest runtime-compatible release when no specifier is given
//! - Reconciliation merges records into the manifest set (add, update, remove)
//! - The manifest is rewritten as a full snapshot after the package manager succeeds
//! - The index and the package manager are traits so the core runs without
//!   network or subprocesses

pub mod config;
mod error;
pub mod index;
pub mod installer;
pub mod manifest;
pub mod package;
pub mod reconcile;
pub mod resolver;
pub mod search;
pub mod version;

pub use error::{Error, Result};
