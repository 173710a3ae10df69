//! AutonoWrite - multi-agent article generation
//!
//! A planner, researcher, writer and critic take turns over a pluggable
//! text-generation backend. The writer and critic loop until the critic
//! approves the draft or the iteration budget runs out.

pub mod config;
pub mod error;
pub mod execution;
pub mod experiment;
pub mod generation;
pub mod output;
pub mod request;

pub use error::{Error, Result};
