//! Search orchestration: cache short-circuit, per-country adapter
//! resolution, paced sequential scraping, fault isolation, price sort.

pub mod flight;
pub mod search;

pub use search::{SearchOrchestrator, DEFAULT_COUNTRY};
