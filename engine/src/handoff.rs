//! Drop provenance handoff.
//!
//! A player drop reaches the host as two callbacks in no guaranteed order:
//! the click that released the units and the spawn of the item entity. The
//! click side publishes the released partition without blocking; the spawn
//! side starts a short waiter on the tokio runtime that picks it up. Waiter
//! outcomes are queued and drained on the simulation thread, which is the
//! only place the ownership table is touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fairkeep_types::settings::HandoffSettings;
use fairkeep_types::{ClaimBuckets, EntityId, ItemType, PlayerId};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// A spawned item entity waiting for its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    pub player: PlayerId,
    pub entity: EntityId,
    pub item: ItemType,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandoffResolution {
    /// The click side published in time.
    Resolved {
        request: DropRequest,
        buckets: ClaimBuckets,
    },
    /// Nothing usable arrived; attribute from staging instead.
    Fallback { request: DropRequest },
}

impl HandoffResolution {
    #[must_use]
    pub fn request(&self) -> &DropRequest {
        match self {
            HandoffResolution::Resolved { request, .. } | HandoffResolution::Fallback { request } => {
                request
            }
        }
    }
}

struct Published {
    at: Instant,
    buckets: ClaimBuckets,
}

/// Single-value channel for one player. `rx` is `None` while a waiter owns it.
struct Slot {
    tx: mpsc::Sender<Published>,
    rx: Option<mpsc::Receiver<Published>>,
    /// The in-flight waiter has been handed a partition.
    delivered: bool,
    /// Fallback drops whose partition has not been published yet. Their
    /// publications go to staging instead of the channel.
    owed: u32,
}

impl Slot {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Some(rx),
            delivered: false,
            owed: 0,
        }
    }
}

type SlotMap = HashMap<PlayerId, Slot>;

fn lock(slots: &Mutex<SlotMap>) -> MutexGuard<'_, SlotMap> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DropHandoff {
    settings: HandoffSettings,
    runtime: Handle,
    slots: Arc<Mutex<SlotMap>>,
    resolved_tx: mpsc::UnboundedSender<HandoffResolution>,
    resolved_rx: mpsc::UnboundedReceiver<HandoffResolution>,
}

impl DropHandoff {
    #[must_use]
    pub fn new(settings: HandoffSettings, runtime: Handle) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            runtime,
            slots: Arc::new(Mutex::new(HashMap::new())),
            resolved_tx,
            resolved_rx,
        }
    }

    /// Publish a released partition for `player` without blocking.
    ///
    /// The partition goes to the in-flight waiter if it has none yet.
    /// Otherwise it settles the oldest fallback drop still owed one, and
    /// with no waiter in flight the newest value replaces any unconsumed
    /// one. Returns `false` when the caller must stage the partition.
    pub fn publish(&self, player: PlayerId, buckets: ClaimBuckets) -> bool {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(player).or_insert_with(Slot::new);
        let published = Published {
            at: Instant::now(),
            buckets,
        };

        if slot.rx.is_none() && !slot.delivered {
            if slot.tx.try_send(published).is_ok() {
                slot.delivered = true;
                return true;
            }
        } else if slot.owed > 0 {
            slot.owed -= 1;
            debug!(%player, owed = slot.owed, "drop partition settles a fallback drop");
            return false;
        } else if let Some(rx) = slot.rx.as_mut() {
            while rx.try_recv().is_ok() {}
            if slot.tx.try_send(published).is_ok() {
                return true;
            }
        }
        warn!(%player, "drop handoff slot already full");
        false
    }

    /// Wait up to the configured timeout for `request.player` to publish.
    ///
    /// At most one waiter per player is in flight. A second request while
    /// one is pending resolves to [`HandoffResolution::Fallback`] at once
    /// and returns `None`. Every fallback, including a timeout, is owed the
    /// next partition its player publishes after the in-flight one.
    pub fn await_drop(&self, request: DropRequest) -> Option<JoinHandle<()>> {
        let stale_after = self.settings.stale_after();
        let fresh = move |published: &Published| published.at.elapsed() <= stale_after;

        let rx = {
            let mut slots = lock(&self.slots);
            let slot = slots.entry(request.player).or_insert_with(Slot::new);
            let mut rx = slot.rx.take();
            match rx.as_mut() {
                // A fresh partition published ahead of the spawn belongs to
                // this waiter; a stale one is dropped here.
                Some(rx) => {
                    slot.delivered = match rx.try_recv() {
                        Ok(published) if fresh(&published) => slot.tx.try_send(published).is_ok(),
                        Ok(_) => {
                            debug!(player = %request.player, "discarding stale drop partition");
                            false
                        }
                        Err(_) => false,
                    };
                }
                None => slot.owed += 1,
            }
            rx
        };
        let Some(mut rx) = rx else {
            debug!(player = %request.player, entity = %request.entity, "drop waiter already in flight");
            let _ = self.resolved_tx.send(HandoffResolution::Fallback { request });
            return None;
        };

        let slots = Arc::clone(&self.slots);
        let resolved = self.resolved_tx.clone();
        let timeout = self.settings.timeout();

        Some(self.runtime.spawn(async move {
            let deadline = Instant::now() + timeout;
            let buckets = loop {
                match time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some(published)) if fresh(&published) => break Some(published.buckets),
                    Ok(Some(_)) => {
                        debug!(player = %request.player, "discarding stale drop partition");
                    }
                    Ok(None) => break None,
                    // A send can land between the deadline and the return.
                    Err(_) => {
                        break rx
                            .try_recv()
                            .ok()
                            .filter(|published| fresh(published))
                            .map(|published| published.buckets);
                    }
                }
            };

            if let Some(slot) = lock(&slots).get_mut(&request.player) {
                slot.rx = Some(rx);
                slot.delivered = false;
                if buckets.is_none() {
                    slot.owed += 1;
                }
            }

            let resolution = match buckets {
                Some(buckets) => HandoffResolution::Resolved { request, buckets },
                None => HandoffResolution::Fallback { request },
            };
            let _ = resolved.send(resolution);
        }))
    }

    /// Finished waits since the last drain, in completion order.
    pub fn drain_resolved(&mut self) -> Vec<HandoffResolution> {
        let mut resolutions = Vec::new();
        while let Ok(resolution) = self.resolved_rx.try_recv() {
            resolutions.push(resolution);
        }
        resolutions
    }

    /// Drop `player`'s slot, e.g. when they disconnect.
    pub fn forget(&self, player: PlayerId) {
        lock(&self.slots).remove(&player);
    }
}
