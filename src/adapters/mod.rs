//! Store adapter implementations.
//!
//! One module per supported store. Each adapter resolves the regional
//! marketplace domain itself from the country code it was built for.

pub mod amazon;
pub mod ebay;

pub use amazon::AmazonAdapter;
pub use ebay::EbayAdapter;
