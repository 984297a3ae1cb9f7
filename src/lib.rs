//! novel-condenser - concurrent batch LLM dispatcher for novel chapters
//!
//! Batch-processes a directory of chapter text files by dispatching each to
//! a chat-completion endpoint that rewrites it into a shorter version within
//! a configured length ratio. The core of the system is not the LLM call
//! itself but the dispatch and rate-control layer in front of it:
//!
//! - **Credential pool & rate governor** (`pool`): per-credential and
//!   global rolling-window RPM enforcement, cooldown/skip policy, selection.
//! - **Provider adapter** (`adapter`): two dialects (Gemini-style,
//!   OpenAI-style) unified behind one `condense()` contract.
//! - **Chapter pipeline** (`pipeline`): cache check, classification,
//!   condensation, persistence for a single chapter.
//! - **Batch driver** (`driver`): schedules the pipeline across a worker
//!   pool, aggregates outcomes, handles cancellation.
//! - **Statistics ledger** (`stats`): per-file outcomes and the final
//!   summary report.

pub mod adapter;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod driver;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod prompt;
pub mod stats;
pub mod util;

pub use config::Config;

/// Result type used throughout the crate.
pub type Result<T> = anyhow::Result<T>;
