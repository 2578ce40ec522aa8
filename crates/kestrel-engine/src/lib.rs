//! Search and evaluation for kestrel.

pub mod error;
pub mod eval;
pub mod search;

pub use error::ConfigError;
pub use eval::evaluate;
pub use search::config::SearchConfig;
pub use search::control::SearchControl;
pub use search::params::SearchParams;
pub use search::pool::ThreadPool;
pub use search::tablebase::{NoTablebase, Tablebase, Wdl};
pub use search::value::{Depth, VALUE_DRAW, VALUE_INFINITE, VALUE_MATE, VALUE_MATE_IN_MAX_PLY, Value, mate_in, mated_in};
pub use search::{IterationReport, SearchResult};
