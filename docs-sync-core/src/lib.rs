#![doc = "docs-sync-core: core logic library for docs-sync."]

//! This crate contains the whole synchronisation pipeline: mirror one subtree of an
//! upstream git repository into a local content directory, stripping numeric ordering
//! prefixes from every name on the way.
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick a [`contract::CommandRunner`] (normally
//! [`runner::SystemRunner`]) and call [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod normalize;
pub mod publish;
pub mod report;
pub mod runner;
pub mod synchronise;

pub use error::SyncError;
