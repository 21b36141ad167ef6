//! Batch client for the INSPECT NLTE abundance calculators.

pub mod batch;
pub mod client;
pub mod domain;
pub mod input;
pub mod parser;
pub mod ranges;
pub mod report;

mod traits;

pub use traits::AbundanceService;
