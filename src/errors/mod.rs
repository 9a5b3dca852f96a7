//! Centralized error handling for tvlink
//!
//! Only configuration problems abort a run. Source load failures are
//! reported as [`SourceError`] so the aggregator can skip the source and keep
//! going, while liveness failures and unresolvable labels are plain values
//! and never surface here.
//!
//! # Usage
//!
//! ```rust
//! use tvlink::errors::{AppError, AppResult};
//!
//! fn require_workers(workers: usize) -> AppResult<usize> {
//!     if workers == 0 {
//!         return Err(AppError::configuration("LIVENESS_WORKERS must be at least 1"));
//!     }
//!     Ok(workers)
//! }
//! assert!(require_workers(0).is_err());
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
