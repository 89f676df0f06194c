//! Enumeration types for the Garrison game core.
//!
//! Every enum here is persisted, so each carries a stable lowercase wire
//! form via serde and an [`as_str`](UnitCategory::as_str)-style accessor
//! for the database layer.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Unit categories
// ---------------------------------------------------------------------------

/// A category of military unit in the static catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UnitCategory {
    /// Infantry and artillery.
    Ground,
    /// Fighters, bombers, and helicopters.
    Air,
    /// Rocket forces. Attack only.
    Missiles,
    /// Air-defence batteries.
    Defense,
    /// Surface ships and submarines.
    Navy,
    /// Offensive and defensive hacking teams.
    Cyber,
    /// Strategic weapons.
    Special,
}

impl UnitCategory {
    /// Every category, in catalog order.
    pub const ALL: [Self; 7] = [
        Self::Ground,
        Self::Air,
        Self::Missiles,
        Self::Defense,
        Self::Navy,
        Self::Cyber,
        Self::Special,
    ];

    /// Stable lowercase name used on the wire and in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Air => "air",
            Self::Missiles => "missiles",
            Self::Defense => "defense",
            Self::Navy => "navy",
            Self::Cyber => "cyber",
            Self::Special => "special",
        }
    }

    /// Parse a category from its stable name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl core::fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Which stat of a unit counts towards power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CombatRole {
    /// The side starting the engagement; uses unit attack values.
    Attack,
    /// The side being attacked; uses unit defense values.
    Defense,
}

/// Discrete outcome of a resolved engagement, from the attacker's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BattleTier {
    /// Attacker power exceeded 1.5x defender power.
    DecisiveWin,
    /// Attacker power exceeded defender power, up to 1.5x.
    MinorWin,
    /// Final powers were exactly equal.
    Draw,
    /// Attacker power was at least 0.7x but below defender power.
    MinorLoss,
    /// Attacker power fell below 0.7x defender power.
    HeavyLoss,
}

impl BattleTier {
    /// Stable lowercase name used on the wire and in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DecisiveWin => "decisive_win",
            Self::MinorWin => "minor_win",
            Self::Draw => "draw",
            Self::MinorLoss => "minor_loss",
            Self::HeavyLoss => "heavy_loss",
        }
    }

    /// Parse a tier from its stable name.
    pub fn parse(name: &str) -> Option<Self> {
        [
            Self::DecisiveWin,
            Self::MinorWin,
            Self::Draw,
            Self::MinorLoss,
            Self::HeavyLoss,
        ]
        .into_iter()
        .find(|t| t.as_str() == name)
    }

    /// Whether the attacker came out ahead.
    pub const fn is_attacker_victory(self) -> bool {
        matches!(self, Self::DecisiveWin | Self::MinorWin)
    }
}

/// A resource that can change hands as battle plunder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LootKind {
    /// Currency taken from the defender's treasury.
    Money,
}

// ---------------------------------------------------------------------------
// Control
// ---------------------------------------------------------------------------

/// Who drives a combatant's decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ControllerKind {
    /// A human player acting through a front-end.
    User,
    /// An autonomous country driven by the agent scheduler.
    Ai,
}

impl ControllerKind {
    /// Role tag recorded on battle records (`"user"` or `"ai"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    /// Parse a role tag. Anything other than `"ai"` is a user.
    pub fn parse(tag: &str) -> Self {
        if tag == "ai" { Self::Ai } else { Self::User }
    }
}

/// Decision-making temperament of an AI country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Personality {
    /// Attacks, builds random units, or checks status.
    Aggressive,
    /// Builds air defence or checks status.
    Defensive,
    /// Proposes alliances, researches, or negotiates.
    Diplomatic,
}

impl Personality {
    /// Stable lowercase tag used in storage and configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Defensive => "defensive",
            Self::Diplomatic => "diplomatic",
        }
    }

    /// Resolve a stored tag. Unrecognized tags fall back to
    /// [`Personality::Diplomatic`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "aggressive" => Self::Aggressive,
            "defensive" => Self::Defensive,
            _ => Self::Diplomatic,
        }
    }
}
