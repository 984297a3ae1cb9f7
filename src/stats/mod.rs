//! Run statistics: a single-lock accumulator plus the final report it produces.

pub mod ledger;

pub use ledger::{FileStat, StatisticsLedger, Summary};
