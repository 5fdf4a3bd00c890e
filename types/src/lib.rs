//! Core domain types for fairkeep.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod buckets;
mod claim;
mod container;
mod ids;
mod order;
pub mod settings;

pub use buckets::{ClaimBuckets, OrderedBucketMap, claim_buckets};
pub use claim::{ClaimStatus, ClaimTimer, Countdown, FRESH_CLAIM_SECONDS};
pub use container::{BlockPos, ContainerId, Holder, PlayerView, UtilityUi};
pub use ids::{EntityId, ItemType, PlayerId, WorldId};
pub use order::{ClaimOrder, Comparator};

use thiserror::Error;

/// Structural decoding failure for persisted ownership data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{what} must not be empty")]
    Empty { what: &'static str },
    #[error("unknown {what} kind `{kind}`")]
    UnknownKind { what: &'static str, kind: String },
    #[error("{what} `{input}` has {found} fields, expected {expected}")]
    FieldCount {
        what: &'static str,
        input: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid {what} `{input}`")]
    Uuid { what: &'static str, input: String },
    #[error("`{input}` is not an integer")]
    Integer { input: String },
    #[error("timer value {value} outside 1..={max}")]
    TimerRange { value: i64, max: u32 },
    #[error("malformed bucket entry `{entry}`")]
    BucketEntry { entry: String },
}
