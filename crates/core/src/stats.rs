#![allow(missing_docs)]

//! Day statistics, achievements and the export document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::ledger::{BuildingKind, ProgressionLedger};
use crate::models::PricedItem;

/// Version stamped into exports.
pub const EXPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Totals over the items bought today.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub total_spent: i64,
    pub total_earned: i64,
    pub total_profit: i64,
    pub items_purchased: usize,
    pub avg_profit_per_item: f64,
}

impl DayStats {
    /// Summarise `items` at their current prices.
    pub fn from_items(items: &[PricedItem]) -> Self {
        let total_spent: i64 = items.iter().map(|item| item.shop_price).sum();
        let total_earned: i64 = items.iter().map(|item| item.market_value).sum();
        let total_profit = total_earned - total_spent;
        let items_purchased = items.len();
        let avg_profit_per_item = if items_purchased == 0 {
            0.0
        } else {
            total_profit as f64 / items_purchased as f64
        };
        Self {
            total_spent,
            total_earned,
            total_profit,
            items_purchased,
            avg_profit_per_item,
        }
    }
}

/// Milestones reached by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Achievement {
    SixFigureMerchant,
    VeteranTrader,
    RealEstateMogul,
}

impl Achievement {
    pub fn title(self) -> &'static str {
        match self {
            Achievement::SixFigureMerchant => "Six Figure Merchant",
            Achievement::VeteranTrader => "Veteran Trader",
            Achievement::RealEstateMogul => "Real Estate Mogul",
        }
    }
}

/// Achievements the ledger currently qualifies for.
pub fn achievements(ledger: &ProgressionLedger) -> Vec<Achievement> {
    let mut unlocked = Vec::new();
    if ledger.cash() >= 100_000 {
        unlocked.push(Achievement::SixFigureMerchant);
    }
    if ledger.day() >= 10 {
        unlocked.push(Achievement::VeteranTrader);
    }
    if ledger.building_count(BuildingKind::MegaBuilding) >= 5 {
        unlocked.push(Achievement::RealEstateMogul);
    }
    unlocked
}

/// Snapshot of a running game for the export document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub day: u32,
    pub cash: i64,
    pub tier: u32,
    pub time_remaining: f64,
    pub upgrades: Value,
    pub buildings: Value,
    pub daily_inventory: Vec<PricedItem>,
    pub passive_income: i64,
    pub daily_cost: i64,
}

impl GameStats {
    pub fn from_ledger(ledger: &ProgressionLedger) -> Self {
        Self {
            day: ledger.day(),
            cash: ledger.cash(),
            tier: ledger.tier(),
            time_remaining: ledger.time_remaining(),
            upgrades: keyed(ledger.upgrades()),
            buildings: keyed(ledger.buildings()),
            daily_inventory: ledger.acquired().to_vec(),
            passive_income: ledger.passive_income(),
            daily_cost: ledger.daily_cost(),
        }
    }
}

fn keyed<K: Serialize + Ord>(map: &BTreeMap<K, u32>) -> Value {
    serde_json::to_value(map).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub version: String,
    pub exported_at: DateTime<Utc>,
}

/// Shareable summary of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameExport {
    pub game_info: ExportInfo,
    pub game_state: GameStats,
    pub daily_stats: DayStats,
    pub achievements: Vec<&'static str>,
}

impl GameExport {
    pub fn new(ledger: &ProgressionLedger) -> Self {
        Self {
            game_info: ExportInfo {
                version: EXPORT_VERSION.to_string(),
                exported_at: Utc::now(),
            },
            game_state: GameStats::from_ledger(ledger),
            daily_stats: DayStats::from_items(ledger.acquired()),
            achievements: achievements(ledger)
                .into_iter()
                .map(Achievement::title)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shop::tests::item;

    #[test]
    fn day_stats_sum_the_haul() {
        let stats = DayStats::from_items(&[item("A", 200, 150), item("B", 100, 130)]);
        assert_eq!(stats.total_spent, 280);
        assert_eq!(stats.total_earned, 300);
        assert_eq!(stats.total_profit, 20);
        assert_eq!(stats.items_purchased, 2);
        assert_eq!(stats.avg_profit_per_item, 10.0);
        assert_eq!(DayStats::from_items(&[]).avg_profit_per_item, 0.0);
    }

    #[test]
    fn achievements_track_milestones() {
        let mut ledger = ProgressionLedger::new();
        assert!(achievements(&ledger).is_empty());
        ledger.set_cash(100_000);
        ledger.set_day(10);
        assert_eq!(
            achievements(&ledger),
            vec![Achievement::SixFigureMerchant, Achievement::VeteranTrader]
        );
        for _ in 0..5 {
            ledger.buy_building(BuildingKind::MegaBuilding).unwrap();
        }
        assert!(achievements(&ledger).contains(&Achievement::RealEstateMogul));
    }

    #[test]
    fn export_carries_state() {
        let mut ledger = ProgressionLedger::new();
        ledger.buy_building(BuildingKind::Bank).unwrap();
        let export = GameExport::new(&ledger);
        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["gameState"]["cash"], 700);
        assert_eq!(value["gameState"]["buildings"]["bank"], 1);
        assert_eq!(value["gameState"]["passiveIncome"], 20);
        assert_eq!(value["dailyStats"]["itemsPurchased"], 0);
        assert!(value["gameInfo"]["exportedAt"].is_string());
    }
}
