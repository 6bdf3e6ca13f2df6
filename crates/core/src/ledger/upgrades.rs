use std::fmt;

use serde::{Deserialize, Serialize};

/// Town upgrades with a finite number of levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKind {
    /// Clocktower: longer days.
    Time,
    /// Stables: cheaper travel between shops, slightly longer days.
    Route,
    /// Jeweler's loupe: flags overpriced items.
    Loupe,
    /// Turns the day's worst loss into a gain.
    LossRevert,
    /// Buy a whole shop at a discount.
    InstaBuy,
    /// Highlights the best deal of each shop.
    TipButton,
}

impl UpgradeKind {
    /// Every upgrade in town display order.
    pub const ALL: [UpgradeKind; 6] = [
        UpgradeKind::Time,
        UpgradeKind::Route,
        UpgradeKind::Loupe,
        UpgradeKind::LossRevert,
        UpgradeKind::InstaBuy,
        UpgradeKind::TipButton,
    ];

    /// Cost of each level, indexed by the current level.
    pub fn costs(self) -> &'static [i64] {
        match self {
            UpgradeKind::Time => &[100, 500],
            UpgradeKind::Route => &[150, 750],
            UpgradeKind::Loupe => &[1_000],
            UpgradeKind::LossRevert => &[2_000],
            UpgradeKind::InstaBuy => &[2_500, 5_000, 10_000],
            UpgradeKind::TipButton => &[750],
        }
    }

    pub fn max_level(self) -> u32 {
        self.costs().len() as u32
    }

    /// Price of the next level, or `None` when maxed out.
    pub fn next_cost(self, level: u32) -> Option<i64> {
        self.costs().get(level as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            UpgradeKind::Time => "Clocktower",
            UpgradeKind::Route => "Stables",
            UpgradeKind::Loupe => "Jeweler Shop",
            UpgradeKind::LossRevert => "Loss Revert Magic",
            UpgradeKind::InstaBuy => "Insta-Buy Assistant",
            UpgradeKind::TipButton => "Tip Booth",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            UpgradeKind::Time => "More time per day",
            UpgradeKind::Route => "Faster travel between shops",
            UpgradeKind::Loupe => "Highlights overpriced items",
            UpgradeKind::LossRevert => "Converts biggest loss to profit",
            UpgradeKind::InstaBuy => "Buy an entire shop at a discount",
            UpgradeKind::TipButton => "Marks the best deal in every shop",
        }
    }
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Passive-income buildings; any number can be owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildingKind {
    Bank,
    MegaBuilding,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 2] = [BuildingKind::Bank, BuildingKind::MegaBuilding];

    pub fn unit_cost(self) -> i64 {
        match self {
            BuildingKind::Bank => 300,
            BuildingKind::MegaBuilding => 1_500,
        }
    }

    pub fn daily_income(self) -> i64 {
        match self {
            BuildingKind::Bank => 20,
            BuildingKind::MegaBuilding => 200,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BuildingKind::Bank => "Bank",
            BuildingKind::MegaBuilding => "Mega Building",
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Percentage knocked off a bulk purchase at the given insta-buy level.
pub fn insta_buy_discount(level: u32) -> u32 {
    match level {
        0 => 0,
        1 => 5,
        2 => 10,
        _ => 15,
    }
}

/// Seconds charged for moving to the next shop.
pub fn next_shop_cost(route_level: u32) -> f64 {
    (5 - i64::from(route_level)).max(3) as f64
}

/// Seconds charged for skipping ahead two tiers.
pub fn skip_shop_cost(route_level: u32) -> f64 {
    (10 - i64::from(route_level) * 2).max(6) as f64
}
