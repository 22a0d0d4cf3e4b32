//! memc-load Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared pieces used by every memc-load workspace member:
//!
//! - **Error Handling**: [`MemcError`] and the crate-wide [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Wire Format**: the [`proto::UserApps`] message stored in memcached
//!
//! # Example
//!
//! ```no_run
//! use memc_common::proto::UserApps;
//!
//! fn main() -> memc_common::Result<()> {
//!     let packed = UserApps::new(55.55, 42.42, vec![1423, 43]).to_bytes();
//!     let unpacked = UserApps::from_bytes(&packed)?;
//!     assert_eq!(unpacked.apps, vec![1423, 43]);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod proto;

pub use error::{MemcError, Result};
