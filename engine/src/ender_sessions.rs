//! First-open timestamps for ender storage viewed through a block.
//!
//! Ender storage only ages while the owner looks at it. A player who keeps
//! a block open (or reopens it) for longer than a fresh claim resolves all
//! pending claims in their ender storage when they close it.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use fairkeep_types::{BlockPos, FRESH_CLAIM_SECONDS, PlayerId, WorldId};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnderSessions {
    first_open: HashMap<BlockPos, HashMap<PlayerId, DateTime<Utc>>>,
}

impl EnderSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_open.is_empty()
    }

    #[must_use]
    pub fn first_open(&self, pos: BlockPos, player: PlayerId) -> Option<DateTime<Utc>> {
        self.first_open.get(&pos)?.get(&player).copied()
    }

    /// Record the first time `player` opened `pos`. Later opens keep the
    /// earlier timestamp.
    pub fn opened(&mut self, pos: BlockPos, player: PlayerId, now: DateTime<Utc>) {
        self.first_open
            .entry(pos)
            .or_default()
            .entry(player)
            .or_insert(now);
    }

    /// Whether closing at `now` should age `player`'s ender storage by a full
    /// fresh-claim duration.
    #[must_use]
    pub fn closed(&self, pos: BlockPos, player: PlayerId, now: DateTime<Utc>) -> bool {
        let Some(opened) = self.first_open(pos, player) else {
            return false;
        };
        now.signed_duration_since(opened) > TimeDelta::seconds(i64::from(FRESH_CLAIM_SECONDS))
    }

    /// Forget every session on a removed block.
    pub fn block_removed(&mut self, pos: BlockPos) {
        self.first_open.remove(&pos);
    }

    /// `world,x,y,z:player@millis,player@millis;...`, sorted.
    #[must_use]
    pub fn encode(&self) -> String {
        let sorted: BTreeMap<_, BTreeMap<_, _>> = self
            .first_open
            .iter()
            .filter(|(_, players)| !players.is_empty())
            .map(|(pos, players)| (*pos, players.iter().map(|(p, t)| (*p, *t)).collect()))
            .collect();

        sorted
            .iter()
            .map(|(pos, players)| {
                let players = players
                    .iter()
                    .map(|(player, at)| format!("{player}@{}", at.timestamp_millis()))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{},{},{},{}:{players}", pos.world, pos.x, pos.y, pos.z)
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Inverse of [`encode`](Self::encode). Malformed chunks are skipped.
    #[must_use]
    pub fn decode(data: &str) -> Self {
        let mut sessions = Self::new();
        for chunk in data.split(';').filter(|chunk| !chunk.is_empty()) {
            let Some((location, players)) = chunk.split_once(':') else {
                debug!(chunk, "skipping ender session without players");
                continue;
            };
            let Some(pos) = parse_pos(location) else {
                debug!(chunk, "skipping ender session with bad location");
                continue;
            };
            for entry in players.split(',').filter(|entry| !entry.is_empty()) {
                let Some((player, at)) = parse_player(entry) else {
                    debug!(entry, "skipping malformed ender session entry");
                    continue;
                };
                sessions.opened(pos, player, at);
            }
        }
        sessions
    }
}

fn parse_pos(location: &str) -> Option<BlockPos> {
    let mut parts = location.split(',');
    let world: WorldId = parts.next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(BlockPos::new(world, x, y, z))
}

fn parse_player(entry: &str) -> Option<(PlayerId, DateTime<Utc>)> {
    let (player, millis) = entry.split_once('@')?;
    let player = player.parse().ok()?;
    let at = DateTime::from_timestamp_millis(millis.parse().ok()?)?;
    Some((player, at))
}
