#![forbid(unsafe_code)]

//! Batch collector for public video and comment metadata of YouTube channels.
//!
//! The library holds everything the `collect_channels` binary needs: input
//! parsing, the Data API client, credential rotation, the pagination loops and
//! the CSV sinks.

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod inputs;
pub mod keys;
pub mod output;
pub mod records;
