//! Action block discovery and validation for the Tollgate gateway.
//!
//! Action blocks are isolated executable units living under a project's
//! `.codebolt/actionblocks` directory, one block per child directory, each
//! described by an `actionblock.yml` config. This crate is pure metadata:
//! discovery, lookup, and validation. Process lifecycle lives in the
//! supervisor, which validates a block here before it ever forks.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod block;
pub mod config;
pub mod registry;
pub mod validate;

pub use block::{ActionBlock, BlockSource};
pub use config::{ActionBlockConfig, CONFIG_FILE};
pub use registry::{ActionBlockRegistry, BLOCKS_SUBDIR};
pub use validate::ValidationReport;
