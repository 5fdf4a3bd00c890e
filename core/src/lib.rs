//! Ownership reconciliation for fairkeep.
//!
//! [`OwnershipTable`] keeps per-container claim partitions consistent with
//! live container contents the host changes on its own. All state is plain
//! data mutated through `&mut self` on the simulation thread.

mod live;
pub mod query;
mod snapshot;
mod table;

pub use live::{LiveContainer, SlotContainer, Stack};
pub use query::{OwnershipSummary, summarize_buckets};
pub use snapshot::{ContainerRecord, Snapshot, WorldItemRecord};
pub use table::{Gain, HeldCursor, OwnershipTable, TransferOutcome};
