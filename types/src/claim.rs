//! Claim status: who owns a bucket of units, and who is accruing a claim on it.
//!
//! A claim matures over time. A player holding unowned units accrues a
//! [`ClaimStatus::Timered`] claim that becomes [`ClaimStatus::Owned`] once the
//! countdown runs out; a player holding someone else's units accrues a
//! [`ClaimStatus::ClaimingOwned`] takeover the same way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ParseError, PlayerId};

/// Seconds a fresh claim takes to mature.
pub const FRESH_CLAIM_SECONDS: u32 = 600;

/// Remaining seconds on a claim timer.
///
/// Always within `1..=FRESH_CLAIM_SECONDS`; a timer that would reach zero
/// resolves the claim instead of being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Countdown(u32);

impl Countdown {
    pub const FRESH: Countdown = Countdown(FRESH_CLAIM_SECONDS);

    /// Clamp `seconds` into the valid range.
    #[must_use]
    pub const fn new(seconds: u32) -> Self {
        if seconds == 0 {
            Self(1)
        } else if seconds > FRESH_CLAIM_SECONDS {
            Self(FRESH_CLAIM_SECONDS)
        } else {
            Self(seconds)
        }
    }

    /// Strict constructor for persisted values.
    pub fn try_new(seconds: i64) -> Result<Self, ParseError> {
        if (1..=i64::from(FRESH_CLAIM_SECONDS)).contains(&seconds) {
            Ok(Self(seconds as u32))
        } else {
            Err(ParseError::TimerRange {
                value: seconds,
                max: FRESH_CLAIM_SECONDS,
            })
        }
    }

    #[must_use]
    pub const fn seconds(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_fresh(self) -> bool {
        self.0 == FRESH_CLAIM_SECONDS
    }

    /// Advance by `seconds`. `None` means the timer ran out.
    #[must_use]
    pub const fn advance(self, seconds: u32) -> Option<Self> {
        if seconds >= self.0 {
            None
        } else {
            Some(Self(self.0 - seconds))
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An accruing claim: `claimant` becomes owner when `remaining` runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimTimer {
    pub claimant: PlayerId,
    pub remaining: Countdown,
}

/// Ownership state of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClaimStatus {
    /// Nobody owns these units and nobody is claiming them.
    Empty,
    /// Unowned, `claimant` is accruing a claim.
    Timered {
        claimant: PlayerId,
        remaining: Countdown,
    },
    /// Matured ownership.
    Owned { owner: PlayerId },
    /// Owned by `owner`, `claimant` is accruing a takeover.
    ClaimingOwned {
        owner: PlayerId,
        claimant: PlayerId,
        remaining: Countdown,
    },
}

impl ClaimStatus {
    /// A fresh unowned claim by `claimant`.
    #[must_use]
    pub const fn timered(claimant: PlayerId) -> Self {
        Self::Timered {
            claimant,
            remaining: Countdown::FRESH,
        }
    }

    #[must_use]
    pub const fn timered_for(claimant: PlayerId, seconds: u32) -> Self {
        Self::Timered {
            claimant,
            remaining: Countdown::new(seconds),
        }
    }

    #[must_use]
    pub const fn owned(owner: PlayerId) -> Self {
        Self::Owned { owner }
    }

    /// A fresh takeover of `owner`'s units by `claimant`.
    #[must_use]
    pub const fn claiming(owner: PlayerId, claimant: PlayerId) -> Self {
        Self::ClaimingOwned {
            owner,
            claimant,
            remaining: Countdown::FRESH,
        }
    }

    #[must_use]
    pub const fn claiming_for(owner: PlayerId, claimant: PlayerId, seconds: u32) -> Self {
        Self::ClaimingOwned {
            owner,
            claimant,
            remaining: Countdown::new(seconds),
        }
    }

    #[must_use]
    pub const fn owner(&self) -> Option<PlayerId> {
        match self {
            Self::Owned { owner } | Self::ClaimingOwned { owner, .. } => Some(*owner),
            Self::Empty | Self::Timered { .. } => None,
        }
    }

    #[must_use]
    pub const fn timer(&self) -> Option<ClaimTimer> {
        match self {
            Self::Timered {
                claimant,
                remaining,
            }
            | Self::ClaimingOwned {
                claimant,
                remaining,
                ..
            } => Some(ClaimTimer {
                claimant: *claimant,
                remaining: *remaining,
            }),
            Self::Empty | Self::Owned { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.owner().is_some()
    }

    #[must_use]
    pub const fn is_timered(&self) -> bool {
        self.timer().is_some()
    }

    #[must_use]
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner() == Some(player)
    }

    #[must_use]
    pub fn is_claimed_by(&self, player: PlayerId) -> bool {
        self.timer().is_some_and(|timer| timer.claimant == player)
    }

    /// An unowned claim created this tick.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Timered { remaining, .. } if remaining.is_fresh())
    }

    /// Age the timer by `seconds`, resolving it to ownership when it runs out.
    #[must_use]
    pub fn tick_timer(self, seconds: u32) -> Self {
        if seconds == 0 {
            return self;
        }
        match self {
            Self::Timered {
                claimant,
                remaining,
            } => match remaining.advance(seconds) {
                Some(remaining) => Self::Timered {
                    claimant,
                    remaining,
                },
                None => Self::Owned { owner: claimant },
            },
            Self::ClaimingOwned {
                owner,
                claimant,
                remaining,
            } => match remaining.advance(seconds) {
                Some(remaining) => Self::ClaimingOwned {
                    owner,
                    claimant,
                    remaining,
                },
                None => Self::Owned { owner: claimant },
            },
            Self::Empty | Self::Owned { .. } => self,
        }
    }

    /// Pre-tick reassignment for units sitting in `player`'s container.
    ///
    /// Holding units is itself evidence of an incipient claim: anything the
    /// player neither owns nor is already claiming gets a fresh claim by them.
    #[must_use]
    pub fn rearm_for(self, player: PlayerId) -> Self {
        if self.is_owned_by(player) || self.is_claimed_by(player) {
            return self;
        }
        match self {
            Self::Empty | Self::Timered { .. } => Self::timered(player),
            Self::Owned { owner } | Self::ClaimingOwned { owner, .. } => {
                Self::claiming(owner, player)
            }
        }
    }

    /// Status a unit keeps once it leaves a holder: accruing claims are lost,
    /// matured ownership survives.
    #[must_use]
    pub const fn strip_timer(self) -> Self {
        match self {
            Self::Owned { owner } | Self::ClaimingOwned { owner, .. } => Self::Owned { owner },
            Self::Empty | Self::Timered { .. } => Self::Empty,
        }
    }
}

/// Wire form: `E`, `O|owner`, `T|claimant|remaining`, `C|owner|claimant|remaining`.
impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("E"),
            Self::Owned { owner } => write!(f, "O|{owner}"),
            Self::Timered {
                claimant,
                remaining,
            } => write!(f, "T|{claimant}|{remaining}"),
            Self::ClaimingOwned {
                owner,
                claimant,
                remaining,
            } => write!(f, "C|{owner}|{claimant}|{remaining}"),
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const WHAT: &str = "claim status";

        if s.is_empty() {
            return Err(ParseError::Empty { what: WHAT });
        }
        let parts: Vec<&str> = s.split('|').collect();
        let expected = match parts[0] {
            "E" => 1,
            "O" => 2,
            "T" => 3,
            "C" => 4,
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

        let status = match parts[0] {
            "E" => Self::Empty,
            "O" => Self::Owned {
                owner: parts[1].parse()?,
            },
            "T" => Self::Timered {
                claimant: parts[1].parse()?,
                remaining: parse_countdown(parts[2])?,
            },
            _ => Self::ClaimingOwned {
                owner: parts[1].parse()?,
                claimant: parts[2].parse()?,
                remaining: parse_countdown(parts[3])?,
            },
        };
        Ok(status)
    }
}

fn parse_countdown(raw: &str) -> Result<Countdown, ParseError> {
    let seconds: i64 = raw.parse().map_err(|_| ParseError::Integer {
        input: raw.to_owned(),
    })?;
    Countdown::try_new(seconds)
}

impl TryFrom<String> for ClaimStatus {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClaimStatus> for String {
    fn from(value: ClaimStatus) -> Self {
        value.to_string()
    }
}
