//! CLI command implementations.

pub mod burst;
pub mod demo;
pub mod replay;
pub mod report;
pub mod rules;
