#![allow(missing_docs)]

//! Authoritative player progression: cash, day, tier, upgrades and buildings.

mod snapshot;
mod upgrades;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CommandResult, Rejection};
use crate::models::PricedItem;

pub use snapshot::SnapshotError;
pub use upgrades::{insta_buy_discount, next_shop_cost, skip_shop_cost, BuildingKind, UpgradeKind};

/// Cash a new game starts with.
pub const STARTING_CASH: i64 = 1_000;
/// Seconds in a day before any upgrades.
pub const BASE_DAY_SECONDS: f64 = 60.0;
/// Purchases of one item name needed to remember its base value.
pub const KNOWLEDGE_THRESHOLD: u32 = 10;

/// What the player has learned about one item name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemKnowledge {
    /// Lifetime purchases of this name.
    pub count: u32,
    /// Base value seen on the latest purchase.
    pub base_value: i64,
}

impl ItemKnowledge {
    /// Base value is revealed in shops once enough have been bought.
    pub fn is_unlocked(&self) -> bool {
        self.count >= KNOWLEDGE_THRESHOLD
    }
}

/// Mutable progression record. Cash never goes negative: debits are checked
/// before anything changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionLedger {
    cash: i64,
    day: u32,
    tier: u32,
    time_remaining: f64,
    skip_streak: u32,
    #[serde(rename = "dailyInventory")]
    acquired: Vec<PricedItem>,
    upgrades: BTreeMap<UpgradeKind, u32>,
    buildings: BTreeMap<BuildingKind, u32>,
    knowledge: BTreeMap<String, ItemKnowledge>,
}

impl Default for ProgressionLedger {
    fn default() -> Self {
        Self {
            cash: STARTING_CASH,
            day: 1,
            tier: 1,
            time_remaining: BASE_DAY_SECONDS,
            skip_streak: 0,
            acquired: Vec::new(),
            upgrades: BTreeMap::new(),
            buildings: BTreeMap::new(),
            knowledge: BTreeMap::new(),
        }
    }
}

impl ProgressionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cash(&self) -> i64 {
        self.cash
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn time_remaining(&self) -> f64 {
        self.time_remaining
    }

    pub fn skip_streak(&self) -> u32 {
        self.skip_streak
    }

    /// Items bought since the day started, in purchase order.
    pub fn acquired(&self) -> &[PricedItem] {
        &self.acquired
    }

    pub(crate) fn acquired_mut(&mut self) -> &mut Vec<PricedItem> {
        &mut self.acquired
    }

    pub fn upgrades(&self) -> &BTreeMap<UpgradeKind, u32> {
        &self.upgrades
    }

    pub fn buildings(&self) -> &BTreeMap<BuildingKind, u32> {
        &self.buildings
    }

    pub fn upgrade_level(&self, kind: UpgradeKind) -> u32 {
        self.upgrades.get(&kind).copied().unwrap_or(0)
    }

    pub fn building_count(&self, kind: BuildingKind) -> u32 {
        self.buildings.get(&kind).copied().unwrap_or(0)
    }

    pub fn knowledge(&self) -> &BTreeMap<String, ItemKnowledge> {
        &self.knowledge
    }

    /// Whether the base value of `name` is revealed.
    pub fn has_knowledge(&self, name: &str) -> bool {
        self.knowledge
            .get(name)
            .map(ItemKnowledge::is_unlocked)
            .unwrap_or(false)
    }

    /// Add `amount` to cash, pinning at `i64::MAX`.
    pub fn credit(&mut self, amount: i64) {
        self.cash = self.cash.saturating_add(amount);
    }

    /// Remove `amount` from cash, refusing if that would go negative.
    pub fn try_debit(&mut self, amount: i64) -> CommandResult<()> {
        if amount > self.cash {
            return Err(Rejection::InsufficientFunds {
                needed: amount,
                available: self.cash,
            });
        }
        self.cash -= amount;
        Ok(())
    }

    pub(crate) fn advance_tier(&mut self, steps: u32) {
        self.tier += steps;
    }

    pub(crate) fn spend_time(&mut self, seconds: f64) {
        self.time_remaining -= seconds;
    }

    pub(crate) fn set_time_remaining(&mut self, seconds: f64) {
        self.time_remaining = seconds;
    }

    pub(crate) fn record_skip(&mut self) {
        self.skip_streak += 1;
    }

    pub(crate) fn reset_skip_streak(&mut self) {
        self.skip_streak = 0;
    }

    pub(crate) fn acquire(&mut self, item: PricedItem) {
        self.acquired.push(item);
    }

    /// Count one purchase of `item`. Returns `true` when this purchase is
    /// the one that unlocks knowledge.
    pub(crate) fn record_knowledge(&mut self, item: &PricedItem) -> bool {
        let entry = self
            .knowledge
            .entry(item.name().to_string())
            .or_insert(ItemKnowledge {
                count: 0,
                base_value: item.base_value,
            });
        entry.count += 1;
        entry.base_value = item.base_value;
        entry.count == KNOWLEDGE_THRESHOLD
    }

    /// Income credited by buildings at the start of each day.
    pub fn passive_income(&self) -> i64 {
        BuildingKind::ALL
            .iter()
            .map(|kind| i64::from(self.building_count(*kind)) * kind.daily_income())
            .sum()
    }

    /// Upkeep charged to start the following day.
    pub fn daily_cost(&self) -> i64 {
        i64::from(self.day.saturating_sub(1)) * 10
    }

    /// Length of a fresh day in seconds.
    pub fn max_day_time(&self) -> f64 {
        BASE_DAY_SECONDS
            + f64::from(self.upgrade_level(UpgradeKind::Time)) * 10.0
            + f64::from(self.upgrade_level(UpgradeKind::Route)) * 5.0
    }

    /// Roll the ledger over to the next day. Cash changes are the caller's job.
    pub(crate) fn begin_next_day(&mut self) {
        self.day += 1;
        self.tier = 1;
        self.acquired.clear();
        self.skip_streak = 0;
        self.time_remaining = self.max_day_time();
    }

    /// Buy the next level of `kind`. Returns the new level.
    pub fn buy_upgrade(&mut self, kind: UpgradeKind) -> CommandResult<u32> {
        let level = self.upgrade_level(kind);
        let cost = kind.next_cost(level).ok_or(Rejection::MaxLevel(kind))?;
        self.try_debit(cost)?;
        let level = level + 1;
        self.upgrades.insert(kind, level);
        info!(upgrade = %kind, level, cost, "Upgrade purchased");
        Ok(level)
    }

    /// Buy one more `kind`. Returns the new count.
    pub fn buy_building(&mut self, kind: BuildingKind) -> CommandResult<u32> {
        let cost = kind.unit_cost();
        self.try_debit(cost)?;
        let count = self.building_count(kind) + 1;
        self.buildings.insert(kind, count);
        info!(building = %kind, count, cost, "Building purchased");
        Ok(count)
    }
}

#[cfg(test)]
impl ProgressionLedger {
    pub(crate) fn set_cash(&mut self, cash: i64) {
        self.cash = cash;
    }

    pub(crate) fn set_day(&mut self, day: u32) {
        self.day = day;
    }
}
