//! Edgesub - proxy subscription aggregator.
//!
//! This crate provides the binary's configuration layer: the [`config::Args`]
//! parser and its conversion into server and source settings.

pub mod config;

pub use config::Args;
