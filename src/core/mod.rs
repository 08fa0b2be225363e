//! Core business logic abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod log;
pub mod storage;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use clock::{Clock, FixedClock, SystemClock};
pub use currency::{CurrencyPair, CurrencyRateProvider};
pub use storage::Storage;
