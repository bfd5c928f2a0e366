//! Level configuration - inbound settings consumed at initialization
//!
//! Everything the host hands the core before a level starts: board
//! dimensions, palette, tier thresholds, special-tile spawn rules, static
//! obstacle quotas and the move/time budgets. Validation is a blocking step;
//! a bad configuration refuses to start a level instead of silently
//! defaulting.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::tile::Archetype;
use crate::types::{ColorId, MAX_BOARD_DIM, MAX_COLORS, MIN_BOARD_DIM, MIN_COLORS};

/// The three group-size thresholds mapping to visual icon tiers, strictly
/// increasing (a < b < c).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

impl TierThresholds {
    /// Visual tier for a group of `size` members
    pub fn tier_for(&self, size: usize) -> u8 {
        if size >= self.c as usize {
            3
        } else if size >= self.b as usize {
            2
        } else if size >= self.a as usize {
            1
        } else {
            0
        }
    }
}

/// Minimum group size -> special tile to leave behind at the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRule {
    pub min_group: usize,
    pub archetype: Archetype,
    /// Fixed color for the spawned tile; the group's color when unset
    #[serde(default)]
    pub color_override: Option<ColorId>,
}

/// How many static obstacles a generated board carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StaticQuota {
    pub min: usize,
    pub max: usize,
    /// Percent chance, per slot between min and max, of placing one more
    pub weight: u8,
}

/// Complete inbound configuration for one level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub columns: usize,
    pub rows: usize,
    pub colors: u8,
    /// One icon id per palette color; duplicates across colors are rejected
    pub icons: Vec<u16>,
    pub tier_thresholds: TierThresholds,
    #[serde(default)]
    pub spawn_rules: Vec<SpawnRule>,
    #[serde(default)]
    pub static_quota: StaticQuota,
    #[serde(default)]
    pub move_limit: Option<u32>,
    #[serde(default)]
    pub time_limit_ms: Option<u32>,
    #[serde(default = "default_seed")]
    pub seed: u32,
}

fn default_seed() -> u32 {
    1
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            columns: 9,
            rows: 9,
            colors: 5,
            icons: vec![0, 1, 2, 3, 4],
            tier_thresholds: TierThresholds { a: 4, b: 7, c: 9 },
            spawn_rules: vec![
                SpawnRule {
                    min_group: 4,
                    archetype: Archetype::Bomb { radius: 1 },
                    color_override: None,
                },
                SpawnRule {
                    min_group: 7,
                    archetype: Archetype::RowClear,
                    color_override: None,
                },
                SpawnRule {
                    min_group: 9,
                    archetype: Archetype::ColorClear { target: None },
                    color_override: None,
                },
            ],
            static_quota: StaticQuota::default(),
            move_limit: None,
            time_limit_ms: None,
            seed: 1,
        }
    }
}

impl LevelConfig {
    pub fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Parse and validate a configuration from JSON
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: LevelConfig =
            serde_json::from_str(text).context("level config: invalid json")?;
        config
            .validate()
            .context("level config: validation failed")?;
        Ok(config)
    }

    /// Check every configuration invariant; the first violation is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns < MIN_BOARD_DIM || self.columns > MAX_BOARD_DIM {
            return Err(ConfigError::ColumnsOutOfRange(self.columns));
        }
        if self.rows < MIN_BOARD_DIM || self.rows > MAX_BOARD_DIM {
            return Err(ConfigError::RowsOutOfRange(self.rows));
        }
        if self.colors < MIN_COLORS || self.colors > MAX_COLORS {
            return Err(ConfigError::ColorCountOutOfRange(self.colors));
        }
        if self.icons.len() != self.colors as usize {
            return Err(ConfigError::IconCountMismatch {
                colors: self.colors,
                icons: self.icons.len(),
            });
        }
        for (i, &icon) in self.icons.iter().enumerate() {
            if self.icons[..i].contains(&icon) {
                return Err(ConfigError::DuplicateIcon(icon));
            }
        }
        let t = self.tier_thresholds;
        if !(t.a < t.b && t.b < t.c) {
            return Err(ConfigError::ThresholdsNotIncreasing { a: t.a, b: t.b, c: t.c });
        }
        for rule in &self.spawn_rules {
            if rule.min_group < 2 {
                return Err(ConfigError::SpawnRuleBelowMinimum(rule.min_group));
            }
            if !rule.archetype.is_special() {
                return Err(ConfigError::SpawnRuleNotSpecial);
            }
            if let Archetype::Bomb { radius } = rule.archetype {
                if radius < 1 {
                    return Err(ConfigError::BombRadiusZero);
                }
            }
            if let Some(color) = rule.color_override {
                if color >= self.colors {
                    return Err(ConfigError::SpawnRuleColorOutOfPalette(color));
                }
            }
        }
        let q = self.static_quota;
        if q.min > q.max {
            return Err(ConfigError::StaticQuotaInverted { min: q.min, max: q.max });
        }
        if q.max > self.cell_count() / 2 {
            return Err(ConfigError::StaticQuotaTooLarge {
                max: q.max,
                cells: self.cell_count(),
            });
        }
        if self.move_limit == Some(0) {
            return Err(ConfigError::MoveLimitZero);
        }
        if self.time_limit_ms == Some(0) {
            return Err(ConfigError::TimeLimitZero);
        }
        Ok(())
    }
}

/// A configuration invariant violation, fatal to starting a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ColumnsOutOfRange(usize),
    RowsOutOfRange(usize),
    ColorCountOutOfRange(u8),
    IconCountMismatch { colors: u8, icons: usize },
    DuplicateIcon(u16),
    ThresholdsNotIncreasing { a: u8, b: u8, c: u8 },
    SpawnRuleBelowMinimum(usize),
    SpawnRuleNotSpecial,
    SpawnRuleColorOutOfPalette(ColorId),
    BombRadiusZero,
    StaticQuotaInverted { min: usize, max: usize },
    StaticQuotaTooLarge { max: usize, cells: usize },
    MoveLimitZero,
    TimeLimitZero,
}

impl ConfigError {
    pub fn code(self) -> &'static str {
        match self {
            ConfigError::ColumnsOutOfRange(_) => "columns_out_of_range",
            ConfigError::RowsOutOfRange(_) => "rows_out_of_range",
            ConfigError::ColorCountOutOfRange(_) => "color_count_out_of_range",
            ConfigError::IconCountMismatch { .. } => "icon_count_mismatch",
            ConfigError::DuplicateIcon(_) => "duplicate_icon",
            ConfigError::ThresholdsNotIncreasing { .. } => "thresholds_not_increasing",
            ConfigError::SpawnRuleBelowMinimum(_) => "spawn_rule_below_minimum",
            ConfigError::SpawnRuleNotSpecial => "spawn_rule_not_special",
            ConfigError::SpawnRuleColorOutOfPalette(_) => "spawn_rule_color_out_of_palette",
            ConfigError::BombRadiusZero => "bomb_radius_zero",
            ConfigError::StaticQuotaInverted { .. } => "static_quota_inverted",
            ConfigError::StaticQuotaTooLarge { .. } => "static_quota_too_large",
            ConfigError::MoveLimitZero => "move_limit_zero",
            ConfigError::TimeLimitZero => "time_limit_zero",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ColumnsOutOfRange(v) => {
                write!(f, "columns {} outside [{}, {}]", v, MIN_BOARD_DIM, MAX_BOARD_DIM)
            }
            ConfigError::RowsOutOfRange(v) => {
                write!(f, "rows {} outside [{}, {}]", v, MIN_BOARD_DIM, MAX_BOARD_DIM)
            }
            ConfigError::ColorCountOutOfRange(v) => {
                write!(f, "color count {} outside [{}, {}]", v, MIN_COLORS, MAX_COLORS)
            }
            ConfigError::IconCountMismatch { colors, icons } => {
                write!(f, "{} colors but {} icons assigned", colors, icons)
            }
            ConfigError::DuplicateIcon(icon) => {
                write!(f, "icon {} assigned to more than one color", icon)
            }
            ConfigError::ThresholdsNotIncreasing { a, b, c } => {
                write!(f, "tier thresholds {} < {} < {} must strictly increase", a, b, c)
            }
            ConfigError::SpawnRuleBelowMinimum(v) => {
                write!(f, "spawn rule threshold {} is below the minimum group size 2", v)
            }
            ConfigError::SpawnRuleNotSpecial => {
                write!(f, "spawn rules may only produce special archetypes")
            }
            ConfigError::SpawnRuleColorOutOfPalette(c) => {
                write!(f, "spawn rule color override {} is outside the palette", c)
            }
            ConfigError::BombRadiusZero => write!(f, "bomb radius must be at least 1"),
            ConfigError::StaticQuotaInverted { min, max } => {
                write!(f, "static quota min {} exceeds max {}", min, max)
            }
            ConfigError::StaticQuotaTooLarge { max, cells } => {
                write!(f, "static quota max {} exceeds half of {} cells", max, cells)
            }
            ConfigError::MoveLimitZero => write!(f, "move limit of 0 would lose immediately"),
            ConfigError::TimeLimitZero => write!(f, "time limit of 0 would lose immediately"),
        }
    }
}

impl std::error::Error for ConfigError {}
