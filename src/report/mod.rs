//! Report generation for analysis runs.

pub mod generator;

pub use generator::*;
