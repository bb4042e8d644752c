//! # Fudge Value Types
//!
//! ## Purpose
//!
//! Pure data structures for the values carried by self-describing Fudge
//! messages that need more than a Rust primitive: calendar dates, times of day
//! with accuracy and timezone, and their combination. Each type owns its packed
//! wire form and validates its components on construction.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types  →  libs/codec  →  caller's transport
//!     ↑              ↓
//! Pure Data     Wire Rules
//! FudgeDate     TypeRegistry
//! FudgeTime     StreamReader / MessageWriter
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Field framing, type ids or the registry (belongs in libs/codec)
//! - Timezone databases or calendar arithmetic (use chrono at the edges)
//!
//! ## Quick Start
//! ```rust
//! use types::{DateTimeAccuracy, FudgeDate, FudgeTime, FudgeDateTime};
//!
//! let date = FudgeDate::new(2024, 3, 15)?;
//! let time = FudgeTime::new(DateTimeAccuracy::Second, 9 * 3600 * 1_000_000_000)?;
//! let stamp = FudgeDateTime::new(date, time);
//! assert_eq!(FudgeDateTime::from_bytes(stamp.to_bytes())?, stamp);
//! # Ok::<(), types::ValueError>(())
//! ```

pub mod common;
pub mod temporal;

pub use common::errors::ValueError;
pub use temporal::{DateTimeAccuracy, FudgeDate, FudgeDateTime, FudgeTime};
