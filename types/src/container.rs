//! Container identity.
//!
//! A [`ContainerId`] names one tracked holder of units and survives
//! save/restore. Hosts describe what they are looking at with a [`Holder`]
//! and let [`ContainerId::resolve`] pick the canonical id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ClaimOrder, ClaimStatus, EntityId, ParseError, PlayerId, WorldId};

/// Sub-container of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerView {
    Main,
    EnderStorage,
    Anvil,
    Beacon,
    Grindstone,
    Stonecutter,
}

impl PlayerView {
    pub const ALL: [PlayerView; 6] = [
        Self::Main,
        Self::EnderStorage,
        Self::Anvil,
        Self::Beacon,
        Self::Grindstone,
        Self::Stonecutter,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Main => "PLAYER",
            Self::EnderStorage => "ENDER_CHEST",
            Self::Anvil => "ANVIL",
            Self::Beacon => "BEACON",
            Self::Grindstone => "GRINDSTONE",
            Self::Stonecutter => "STONECUTTER",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.tag() == tag)
    }

    /// Views whose contents accrue claims for the player holding them.
    #[must_use]
    pub const fn accrues_claims(self) -> bool {
        matches!(self, Self::Main | Self::EnderStorage)
    }
}

/// Transient single-viewer UIs that get a per-player container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtilityUi {
    Anvil,
    Beacon,
    Grindstone,
    Stonecutter,
}

impl From<UtilityUi> for PlayerView {
    fn from(ui: UtilityUi) -> Self {
        match ui {
            UtilityUi::Anvil => Self::Anvil,
            UtilityUi::Beacon => Self::Beacon,
            UtilityUi::Grindstone => Self::Grindstone,
            UtilityUi::Stonecutter => Self::Stonecutter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[must_use]
    pub const fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }
}

/// What the host observes holding a container's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    Player { player: PlayerId, view: PlayerView },
    Entity(EntityId),
    Block(BlockPos),
    /// Two-block container; tracked under its left half.
    DoubleChest { left: BlockPos, right: BlockPos },
    /// No holder. Utility UIs fall back to their first viewer.
    Unheld {
        kind: Option<UtilityUi>,
        first_viewer: Option<PlayerId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerId {
    Player { player: PlayerId, view: PlayerView },
    Entity(EntityId),
    Block(BlockPos),
    Virtual,
}

impl ContainerId {
    #[must_use]
    pub const fn main(player: PlayerId) -> Self {
        Self::Player {
            player,
            view: PlayerView::Main,
        }
    }

    #[must_use]
    pub const fn ender(player: PlayerId) -> Self {
        Self::Player {
            player,
            view: PlayerView::EnderStorage,
        }
    }

    #[must_use]
    pub fn resolve(holder: &Holder) -> Self {
        match *holder {
            Holder::Player { player, view } => Self::Player { player, view },
            Holder::Entity(entity) => Self::Entity(entity),
            Holder::Block(pos) | Holder::DoubleChest { left: pos, .. } => Self::Block(pos),
            Holder::Unheld {
                kind: Some(ui),
                first_viewer: Some(player),
            } => Self::Player {
                player,
                view: ui.into(),
            },
            Holder::Unheld { .. } => Self::Virtual,
        }
    }

    /// Main container of an entity that can pick items up.
    ///
    /// Player entities share their id with the player.
    #[must_use]
    pub const fn of_entity(entity: EntityId, is_player: bool) -> Self {
        if is_player {
            Self::main(PlayerId::new(entity.value()))
        } else {
            Self::Entity(entity)
        }
    }

    #[must_use]
    pub const fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Player { player, .. } => Some(*player),
            Self::Entity(_) | Self::Block(_) | Self::Virtual => None,
        }
    }

    #[must_use]
    pub const fn view(&self) -> Option<PlayerView> {
        match self {
            Self::Player { view, .. } => Some(*view),
            Self::Entity(_) | Self::Block(_) | Self::Virtual => None,
        }
    }

    #[must_use]
    pub const fn is_player_main(&self) -> bool {
        matches!(
            self,
            Self::Player {
                view: PlayerView::Main,
                ..
            }
        )
    }

    /// Player main or ender storage.
    #[must_use]
    pub const fn accrues_claims(&self) -> bool {
        match self {
            Self::Player { view, .. } => view.accrues_claims(),
            Self::Entity(_) | Self::Block(_) | Self::Virtual => false,
        }
    }

    /// Order in which this container gives up units.
    #[must_use]
    pub const fn drop_order(&self) -> ClaimOrder {
        match self {
            Self::Player { player, .. } => ClaimOrder::PlayerDrop(*player),
            Self::Entity(_) | Self::Block(_) | Self::Virtual => ClaimOrder::SharedDrop,
        }
    }

    #[must_use]
    pub const fn take_order(&self) -> ClaimOrder {
        self.drop_order().reversed()
    }

    /// Status given to units that show up without provenance.
    #[must_use]
    pub const fn default_status(&self) -> ClaimStatus {
        match self {
            Self::Player { player, view } if view.accrues_claims() => {
                ClaimStatus::timered(*player)
            }
            _ => ClaimStatus::Empty,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player { player, view } => write!(f, "PLAYER|{}|{player}", view.tag()),
            Self::Entity(entity) => write!(f, "ENTITY|{entity}"),
            Self::Block(pos) => write!(f, "BLOCK|{}|{}|{}|{}", pos.world, pos.x, pos.y, pos.z),
            Self::Virtual => f.write_str("VIRTUAL"),
        }
    }
}

impl FromStr for ContainerId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const WHAT: &str = "container id";

        if s.is_empty() {
            return Err(ParseError::Empty { what: WHAT });
        }
        let parts: Vec<&str> = s.split('|').collect();
        let expected = match parts[0] {
            "PLAYER" => 3,
            "ENTITY" => 2,
            "BLOCK" => 5,
            "VIRTUAL" => 1,
            kind => {
                return Err(ParseError::UnknownKind {
                    what: WHAT,
                    kind: kind.to_owned(),
                });
            }
        };
        if parts.len() != expected {
            return Err(ParseError::FieldCount {
                what: WHAT,
                input: s.to_owned(),
                expected,
                found: parts.len(),
            });
        }

        match parts[0] {
            "PLAYER" => {
                let view = PlayerView::from_tag(parts[1]).ok_or_else(|| ParseError::UnknownKind {
                    what: "player view",
                    kind: parts[1].to_owned(),
                })?;
                Ok(Self::Player {
                    player: parts[2].parse()?,
                    view,
                })
            }
            "ENTITY" => Ok(Self::Entity(parts[1].parse()?)),
            "BLOCK" => Ok(Self::Block(BlockPos {
                world: parts[1].parse()?,
                x: parse_coord(parts[2])?,
                y: parse_coord(parts[3])?,
                z: parse_coord(parts[4])?,
            })),
            _ => Ok(Self::Virtual),
        }
    }
}

fn parse_coord(raw: &str) -> Result<i32, ParseError> {
    raw.parse().map_err(|_| ParseError::Integer {
        input: raw.to_owned(),
    })
}

impl TryFrom<String> for ContainerId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContainerId> for String {
    fn from(value: ContainerId) -> Self {
        value.to_string()
    }
}
