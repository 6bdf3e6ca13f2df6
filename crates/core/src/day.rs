//! End-of-day settlement and the roll-over to the next day.

use serde::Serialize;
use tracing::info;

use crate::ledger::{ProgressionLedger, UpgradeKind};
use crate::models::PricedItem;

/// Where the game currently is in its day loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayPhase {
    /// No day has started yet.
    Intro,
    /// The clock is running and a shop is open.
    Shopping,
    /// The day is settled and its report is on display.
    Reporting,
    /// The player could not pay for the next day.
    GameOver,
    /// The legendary item was bought.
    Victory,
}

/// One line of the day report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub name: String,
    /// What the player paid, before any loss revert.
    pub paid: i64,
    pub base_value: i64,
    pub market_value: i64,
    /// Profit after any loss revert.
    pub profit: i64,
    pub loss_reverted: bool,
}

/// Final numbers of a settled day. Everything here is already applied to
/// the ledger; frontends only replay it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub day: u32,
    pub rows: Vec<ReportRow>,
    pub total_profit: i64,
    /// Market value of the haul credited to cash.
    pub revenue: i64,
    pub balance: i64,
    /// Item names whose base value became known today.
    pub unlocked: Vec<String>,
}

/// Outcome of trying to start the next day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayStart {
    Started {
        day: u32,
        passive_income: i64,
        daily_cost: i64,
    },
    /// Upkeep could not be paid; the ledger was reset.
    GameOver {
        day_reached: u32,
        daily_cost: i64,
        cash: i64,
    },
}

/// Mirror the single worst loss into an equal gain. Returns the index of the
/// reverted item; the first of equally bad losses is chosen.
pub fn apply_loss_revert(items: &mut [PricedItem]) -> Option<usize> {
    let mut worst: Option<(usize, i64)> = None;
    for (index, item) in items.iter().enumerate() {
        let profit = item.profit();
        if profit < 0 && worst.map_or(true, |(_, low)| profit < low) {
            worst = Some((index, profit));
        }
    }

    let (index, _) = worst?;
    let item = &mut items[index];
    let original = item.shop_price;
    item.original_shop_price = Some(original);
    item.shop_price = 2 * item.market_value - original;
    item.loss_reverted = true;
    info!(name = %item.name(), from = original, to = item.shop_price, "Loss reverted");
    Some(index)
}

/// Settle the day's haul: loss revert, sale at market value and item
/// knowledge, all applied before the report is returned.
pub fn settle_day(ledger: &mut ProgressionLedger) -> DayReport {
    if ledger.upgrade_level(UpgradeKind::LossRevert) > 0 {
        apply_loss_revert(ledger.acquired_mut());
    }

    let rows: Vec<ReportRow> = ledger
        .acquired()
        .iter()
        .map(|item| ReportRow {
            name: item.name().to_string(),
            paid: item.paid_price(),
            base_value: item.base_value,
            market_value: item.market_value,
            profit: item.profit(),
            loss_reverted: item.loss_reverted,
        })
        .collect();
    let total_profit = rows.iter().map(|row| row.profit).sum();
    let revenue = rows.iter().map(|row| row.market_value).sum();
    ledger.credit(revenue);

    let items = ledger.acquired().to_vec();
    let mut unlocked = Vec::new();
    for item in &items {
        if ledger.record_knowledge(item) {
            unlocked.push(item.name().to_string());
        }
    }

    info!(
        day = ledger.day(),
        items = rows.len(),
        total_profit,
        revenue,
        cash = ledger.cash(),
        "Day settled"
    );
    DayReport {
        day: ledger.day(),
        rows,
        total_profit,
        revenue,
        balance: ledger.cash(),
        unlocked,
    }
}

/// Pay upkeep, collect building income and roll the ledger to the next
/// day. When upkeep cannot be paid the ledger is reset to a new game.
pub fn begin_next_day(ledger: &mut ProgressionLedger) -> DayStart {
    let daily_cost = ledger.daily_cost();
    if ledger.try_debit(daily_cost).is_err() {
        let outcome = DayStart::GameOver {
            day_reached: ledger.day(),
            daily_cost,
            cash: ledger.cash(),
        };
        info!(day = ledger.day(), daily_cost, cash = ledger.cash(), "Game over");
        *ledger = ProgressionLedger::new();
        return outcome;
    }

    let passive_income = ledger.passive_income();
    ledger.credit(passive_income);
    ledger.begin_next_day();
    info!(day = ledger.day(), passive_income, daily_cost, cash = ledger.cash(), "Day started");
    DayStart::Started {
        day: ledger.day(),
        passive_income,
        daily_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::KNOWLEDGE_THRESHOLD;
    use crate::shop::tests::item;

    fn ledger_with(items: Vec<PricedItem>) -> ProgressionLedger {
        let mut ledger = ProgressionLedger::new();
        for item in items {
            ledger.acquire(item);
        }
        ledger
    }

    #[test]
    fn settling_a_full_wallet_saturates() {
        let mut ledger = ledger_with(vec![item("A", 100, 80)]);
        ledger.set_cash(i64::MAX);
        let report = settle_day(&mut ledger);
        assert_eq!(report.revenue, 100);
        assert_eq!(ledger.cash(), i64::MAX);
    }

    #[test]
    fn loss_revert_mirrors_worst_loss() {
        let mut ledger = ledger_with(vec![
            item("Small Loss", 100, 110),
            item("Big Loss", 200, 250),
            item("Gain", 120, 100),
        ]);
        ledger.set_cash(5_000);
        ledger.buy_upgrade(UpgradeKind::LossRevert).unwrap();
        let cash = ledger.cash();

        let report = settle_day(&mut ledger);
        let profits: Vec<i64> = report.rows.iter().map(|row| row.profit).collect();
        assert_eq!(profits, vec![-10, 50, 20]);
        assert_eq!(report.total_profit, 60);
        assert!(report.rows[1].loss_reverted);
        assert_eq!(report.rows[1].paid, 250);

        let reverted = &ledger.acquired()[1];
        assert_eq!(reverted.shop_price, 150);
        assert_eq!(reverted.original_shop_price, Some(250));
        assert_eq!(report.revenue, 420);
        assert_eq!(ledger.cash(), cash + 420);
    }

    #[test]
    fn loss_revert_needs_upgrade() {
        let mut ledger = ledger_with(vec![item("Big Loss", 200, 250), item("Gain", 120, 100)]);
        let report = settle_day(&mut ledger);
        assert_eq!(report.total_profit, -30);
        assert!(report.rows.iter().all(|row| !row.loss_reverted));
    }

    #[test]
    fn loss_revert_picks_first_of_ties() {
        let mut items = vec![item("A", 100, 130), item("B", 100, 130), item("C", 100, 90)];
        assert_eq!(apply_loss_revert(&mut items), Some(0));
        assert!(!items[1].loss_reverted);
        assert_eq!(apply_loss_revert(&mut [item("C", 100, 90)]), None);
    }

    #[test]
    fn settlement_credits_market_value() {
        let mut ledger = ledger_with(vec![item("A", 300, 200), item("B", 150, 160)]);
        ledger.set_cash(640);
        let report = settle_day(&mut ledger);
        assert_eq!(report.revenue, 450);
        assert_eq!(report.total_profit, 90);
        assert_eq!(report.balance, 1_090);
        assert_eq!(ledger.cash(), 1_090);
    }

    #[test]
    fn knowledge_unlocks_at_tenth_purchase() {
        let mut ledger = ledger_with(vec![item("Gold Coin", 150, 140); 9]);
        let report = settle_day(&mut ledger);
        assert!(report.unlocked.is_empty());
        assert!(!ledger.has_knowledge("Gold Coin"));

        ledger.acquired_mut().clear();
        ledger.acquire(item("Gold Coin", 150, 140));
        ledger.acquire(item("Gold Coin", 150, 140));
        let report = settle_day(&mut ledger);
        assert_eq!(report.unlocked, vec!["Gold Coin".to_string()]);
        assert!(ledger.has_knowledge("Gold Coin"));
        assert_eq!(ledger.knowledge()["Gold Coin"].count, KNOWLEDGE_THRESHOLD + 1);
    }

    #[test]
    fn short_cash_ends_the_game() {
        let mut ledger = ProgressionLedger::new();
        ledger.set_day(5);
        ledger.set_cash(39);
        let outcome = begin_next_day(&mut ledger);
        assert_eq!(
            outcome,
            DayStart::GameOver {
                day_reached: 5,
                daily_cost: 40,
                cash: 39
            }
        );
        assert_eq!(ledger, ProgressionLedger::new());
        assert_eq!(ledger.day(), 1);
        assert_eq!(ledger.cash(), 1_000);
        assert_eq!(ledger.tier(), 1);
    }

    #[test]
    fn exact_upkeep_starts_next_day() {
        let mut ledger = ledger_with(vec![item("A", 100, 90)]);
        ledger.set_day(5);
        ledger.set_cash(40);
        ledger.advance_tier(6);
        ledger.record_skip();
        let outcome = begin_next_day(&mut ledger);
        assert_eq!(
            outcome,
            DayStart::Started {
                day: 6,
                passive_income: 0,
                daily_cost: 40
            }
        );
        assert_eq!(ledger.cash(), 0);
        assert_eq!(ledger.day(), 6);
        assert_eq!(ledger.tier(), 1);
        assert_eq!(ledger.skip_streak(), 0);
        assert!(ledger.acquired().is_empty());
    }

    #[test]
    fn passive_income_is_credited_after_upkeep_check() {
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(2_000);
        ledger.buy_building(crate::ledger::BuildingKind::MegaBuilding).unwrap();
        ledger.buy_building(crate::ledger::BuildingKind::Bank).unwrap();
        ledger.set_day(3);
        let outcome = begin_next_day(&mut ledger);
        assert_eq!(
            outcome,
            DayStart::Started {
                day: 4,
                passive_income: 220,
                daily_cost: 20
            }
        );
        assert_eq!(ledger.cash(), 400);
    }
}
