//! Bucket orderings: whose claim loses or gains units first.

use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use crate::{ClaimStatus, PlayerId};

/// Comparator installed in an [`OrderedBucketMap`](crate::OrderedBucketMap).
pub type Comparator<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// The orderings a bucket map can be sorted by.
///
/// Drop orders put the buckets that should lose units first at the front;
/// take orders are their exact reverse, putting the buckets that should gain
/// units first at the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimOrder {
    /// What player `p` gives up first: unowned, then others', then their own.
    PlayerDrop(PlayerId),
    PlayerTake(PlayerId),
    /// Unowned before owned, no timer before timer, longest remaining first.
    SharedDrop,
    SharedTake,
    /// Everything compares equal; insertion order is kept.
    Neutral,
}

impl ClaimOrder {
    #[must_use]
    pub fn compare(self, a: &ClaimStatus, b: &ClaimStatus) -> Ordering {
        match self {
            Self::PlayerDrop(p) => player_drop(p, a, b),
            Self::PlayerTake(p) => player_drop(p, b, a),
            Self::SharedDrop => shared_drop(a, b),
            Self::SharedTake => shared_drop(b, a),
            Self::Neutral => Ordering::Equal,
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::PlayerDrop(p) => Self::PlayerTake(p),
            Self::PlayerTake(p) => Self::PlayerDrop(p),
            Self::SharedDrop => Self::SharedTake,
            Self::SharedTake => Self::SharedDrop,
            Self::Neutral => Self::Neutral,
        }
    }

    #[must_use]
    pub fn comparator(self) -> Comparator<ClaimStatus> {
        Arc::new(move |a, b| self.compare(a, b))
    }
}

fn player_drop(p: PlayerId, a: &ClaimStatus, b: &ClaimStatus) -> Ordering {
    let owner_rank = |s: &ClaimStatus| match s.owner() {
        None => 0,
        Some(owner) if owner == p => 2,
        Some(_) => 1,
    };
    // No timer sorts first; among timers, foreign claims before `p`'s own,
    // then longer remaining first.
    let timer_key = |s: &ClaimStatus| {
        s.timer().map(|t| {
            let mine = u8::from(t.claimant == p);
            (mine, Reverse(t.remaining))
        })
    };
    owner_rank(a)
        .cmp(&owner_rank(b))
        .then_with(|| timer_key(a).cmp(&timer_key(b)))
}

fn shared_drop(a: &ClaimStatus, b: &ClaimStatus) -> Ordering {
    let timer_key = |s: &ClaimStatus| s.timer().map(|t| Reverse(t.remaining));
    a.is_owned()
        .cmp(&b.is_owned())
        .then_with(|| timer_key(a).cmp(&timer_key(b)))
}
