#![allow(missing_docs)]

//! A single shop visit: the offer, purchases and travel to the next shop.

use rand::Rng;
use tracing::{debug, info};

use crate::catalog::ItemCatalog;
use crate::error::{CommandResult, Rejection};
use crate::ledger::{
    insta_buy_discount, next_shop_cost, skip_shop_cost, ProgressionLedger, UpgradeKind,
};
use crate::models::PricedItem;
use crate::pricing::PricingEngine;

/// Items on offer per shop.
pub const SHOP_SIZE: usize = 5;
/// Consecutive skips before the legendary item may appear.
pub const LEGENDARY_SKIP_STREAK: u32 = 4;
/// Cash needed before the legendary item may appear.
pub const LEGENDARY_CASH_THRESHOLD: i64 = 1_000_000;
/// Chance of a legendary shop once the other conditions hold.
pub const LEGENDARY_CHANCE: f64 = 0.1;
/// Markup forced onto the first item when a shop has no losing offer.
pub const FORCED_LOSS_MARKUP: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopState {
    Empty,
    Offering,
    Settled,
}

/// How far to travel before the next shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceKind {
    /// One tier up.
    Next,
    /// Two tiers up, at a higher time cost.
    Skip,
}

impl AdvanceKind {
    pub fn tier_steps(self) -> u32 {
        match self {
            AdvanceKind::Next => 1,
            AdvanceKind::Skip => 2,
        }
    }

    /// Seconds the trip takes at the given stables level.
    pub fn time_cost(self, route_level: u32) -> f64 {
        match self {
            AdvanceKind::Next => next_shop_cost(route_level),
            AdvanceKind::Skip => skip_shop_cost(route_level),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// A fresh offer is on display.
    Advanced { cost: f64 },
    /// Not enough time left to travel; the day has to end.
    DayOver,
}

/// One item on display.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopSlot {
    pub item: PricedItem,
    pub bought: bool,
    /// Shown only once the loupe upgrade is built.
    pub overpriced: bool,
}

impl ShopSlot {
    pub fn is_profitable(&self) -> bool {
        self.item.profit() > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub index: usize,
    pub price: i64,
    /// The legendary item was bought.
    pub victory: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkPurchase {
    pub count: usize,
    pub total: i64,
    pub saved: i64,
    pub discount_percent: u32,
    pub victory: bool,
}

/// Ledger values an offer is rolled against.
#[derive(Debug, Clone, Copy)]
struct OfferContext {
    tier: u32,
    skip_streak: u32,
    cash: i64,
    loupe_level: u32,
}

impl OfferContext {
    fn from_ledger(ledger: &ProgressionLedger) -> Self {
        Self {
            tier: ledger.tier(),
            skip_streak: ledger.skip_streak(),
            cash: ledger.cash(),
            loupe_level: ledger.upgrade_level(UpgradeKind::Loupe),
        }
    }
}

struct Offer {
    slots: Vec<ShopSlot>,
    best_deal: Option<usize>,
    legendary: bool,
}

/// The offer currently on display and its lifecycle.
#[derive(Debug, Clone)]
pub struct ShopSession {
    state: ShopState,
    slots: Vec<ShopSlot>,
    best_deal: Option<usize>,
    legendary: bool,
    pricing: PricingEngine,
}

impl Default for ShopSession {
    fn default() -> Self {
        Self::new(PricingEngine)
    }
}

impl ShopSession {
    pub fn new(pricing: PricingEngine) -> Self {
        Self {
            state: ShopState::Empty,
            slots: Vec::new(),
            best_deal: None,
            legendary: false,
            pricing,
        }
    }

    pub fn state(&self) -> ShopState {
        self.state
    }

    pub fn slots(&self) -> &[ShopSlot] {
        &self.slots
    }

    /// Index of the most profitable item, fixed when the offer was rolled.
    pub fn best_deal(&self) -> Option<usize> {
        self.best_deal
    }

    /// Whether this is the rare legendary offer.
    pub fn is_legendary(&self) -> bool {
        self.legendary
    }

    pub fn remaining(&self) -> impl Iterator<Item = (usize, &ShopSlot)> {
        self.slots.iter().enumerate().filter(|(_, slot)| !slot.bought)
    }

    /// Replace the offer with a freshly rolled one.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        ledger: &ProgressionLedger,
        catalog: &ItemCatalog,
        rng: &mut R,
    ) -> CommandResult<()> {
        let offer = self.roll(OfferContext::from_ledger(ledger), catalog, rng)?;
        self.install(offer);
        Ok(())
    }

    fn install(&mut self, offer: Offer) {
        self.slots = offer.slots;
        self.best_deal = offer.best_deal;
        self.legendary = offer.legendary;
        self.state = ShopState::Offering;
    }

    fn roll<R: Rng + ?Sized>(
        &self,
        ctx: OfferContext,
        catalog: &ItemCatalog,
        rng: &mut R,
    ) -> CommandResult<Offer> {
        let legendary = ctx.skip_streak >= LEGENDARY_SKIP_STREAK
            && rng.gen::<f64>() < LEGENDARY_CHANCE
            && ctx.cash >= LEGENDARY_CASH_THRESHOLD;

        let mut items = Vec::with_capacity(SHOP_SIZE);
        for slot in 0..SHOP_SIZE {
            if legendary && slot == 0 {
                items.push(self.pricing.legendary_item());
                continue;
            }
            let template = catalog
                .sample(ctx.tier, rng)
                .ok_or(Rejection::EmptyCatalog(ctx.tier))?;
            items.push(self.pricing.price_item(&template, ctx.tier, rng));
        }

        if !legendary && !items.iter().any(PricedItem::is_unprofitable) {
            let first = &mut items[0];
            let marked_up = (first.market_value as f64 * FORCED_LOSS_MARKUP).round() as i64;
            first.shop_price = marked_up.max(first.market_value + 1).max(1);
            debug!(name = %first.name(), price = first.shop_price, "Forced a losing offer");
        }

        let best_deal = best_deal_index(&items);
        let slots = items
            .into_iter()
            .map(|item| {
                let overpriced =
                    ctx.loupe_level > 0 && self.pricing.profit(&item).is_overpriced;
                ShopSlot {
                    item,
                    bought: false,
                    overpriced,
                }
            })
            .collect();

        debug!(tier = ctx.tier, legendary, ?best_deal, "Shop generated");
        Ok(Offer {
            slots,
            best_deal,
            legendary,
        })
    }

    fn ensure_offering(&self) -> CommandResult<()> {
        if self.state == ShopState::Offering {
            Ok(())
        } else {
            Err(Rejection::ShopClosed)
        }
    }

    /// Buy the item at `index` at its shop price.
    pub fn buy(&mut self, index: usize, ledger: &mut ProgressionLedger) -> CommandResult<Purchase> {
        self.ensure_offering()?;
        let slot = self.slots.get(index).ok_or(Rejection::NoSuchItem(index))?;
        if slot.bought {
            return Err(Rejection::AlreadyBought(index));
        }
        let price = slot.item.shop_price;
        ledger.try_debit(price)?;

        let slot = &mut self.slots[index];
        slot.bought = true;
        ledger.acquire(slot.item.clone());
        let victory = slot.item.is_legendary;
        info!(name = %slot.item.name(), price, cash = ledger.cash(), "Item bought");
        Ok(Purchase {
            index,
            price,
            victory,
        })
    }

    /// Buy everything still on display at the insta-buy discount.
    pub fn buy_all(&mut self, ledger: &mut ProgressionLedger) -> CommandResult<BulkPurchase> {
        self.ensure_offering()?;
        let level = ledger.upgrade_level(UpgradeKind::InstaBuy);
        if level == 0 {
            return Err(Rejection::UpgradeLocked(UpgradeKind::InstaBuy));
        }

        let remaining: Vec<usize> = self.remaining().map(|(index, _)| index).collect();
        if remaining.is_empty() {
            return Err(Rejection::NothingToBuy);
        }

        let discount_percent = insta_buy_discount(level);
        let multiplier = f64::from(100 - discount_percent) / 100.0;
        let original: i64 = remaining
            .iter()
            .map(|&index| self.slots[index].item.shop_price)
            .sum();
        let total = (original as f64 * multiplier).round() as i64;
        ledger.try_debit(total)?;

        let mut victory = false;
        for &index in &remaining {
            let slot = &mut self.slots[index];
            slot.bought = true;
            let mut item = slot.item.clone();
            item.shop_price = ((item.shop_price as f64 * multiplier).round() as i64).max(1);
            victory |= item.is_legendary;
            ledger.acquire(item);
        }

        info!(count = remaining.len(), total, discount_percent, "Shop bought out");
        Ok(BulkPurchase {
            count: remaining.len(),
            total,
            saved: original - total,
            discount_percent,
            victory,
        })
    }

    /// Travel to another shop, or report that the day is out of time.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        kind: AdvanceKind,
        ledger: &mut ProgressionLedger,
        catalog: &ItemCatalog,
        rng: &mut R,
    ) -> CommandResult<AdvanceOutcome> {
        self.ensure_offering()?;
        let cost = kind.time_cost(ledger.upgrade_level(UpgradeKind::Route));
        if ledger.time_remaining() <= cost {
            return Ok(AdvanceOutcome::DayOver);
        }

        let mut ctx = OfferContext::from_ledger(ledger);
        ctx.tier += kind.tier_steps();
        ctx.skip_streak = match kind {
            AdvanceKind::Next => 0,
            AdvanceKind::Skip => ctx.skip_streak + 1,
        };
        let offer = self.roll(ctx, catalog, rng)?;

        ledger.spend_time(cost);
        ledger.advance_tier(kind.tier_steps());
        match kind {
            AdvanceKind::Next => ledger.reset_skip_streak(),
            AdvanceKind::Skip => ledger.record_skip(),
        }
        self.install(offer);
        debug!(?kind, cost, tier = ledger.tier(), "Advanced to next shop");
        Ok(AdvanceOutcome::Advanced { cost })
    }

    /// Close the shop for the day.
    pub fn settle(&mut self) {
        self.state = ShopState::Settled;
    }

    /// Drop the offer entirely.
    pub fn clear(&mut self) {
        self.state = ShopState::Empty;
        self.slots.clear();
        self.best_deal = None;
        self.legendary = false;
    }
}

/// Largest `market_value - shop_price`; the first occurrence wins ties.
pub fn best_deal_index(items: &[PricedItem]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (index, item) in items.iter().enumerate() {
        let profit = item.profit();
        if best.map_or(true, |(_, top)| profit > top) {
            best = Some((index, profit));
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ItemTemplate;
    use crate::pricing::Quality;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    pub(crate) fn item(name: &str, market_value: i64, shop_price: i64) -> PricedItem {
        let template = Arc::new(ItemTemplate::new(name, "?", "#000000", market_value, 1));
        let quality = Quality {
            color: 0.5,
            size: 0.5,
            cleanliness: 0.5,
        };
        let mut item = PricingEngine.price_with(&template, quality, 1.0);
        item.shop_price = shop_price;
        item
    }

    fn open_shop(items: Vec<PricedItem>) -> ShopSession {
        let mut shop = ShopSession::default();
        let best_deal = best_deal_index(&items);
        shop.install(Offer {
            slots: items
                .into_iter()
                .map(|item| ShopSlot {
                    item,
                    bought: false,
                    overpriced: false,
                })
                .collect(),
            best_deal,
            legendary: false,
        });
        shop
    }

    #[test]
    fn ordinary_offers_contain_a_loss() {
        let catalog = ItemCatalog::default();
        let mut ledger = ProgressionLedger::new();
        let mut shop = ShopSession::default();
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            ledger.advance_tier((seed % 3) as u32);
            shop.generate(&ledger, &catalog, &mut rng).unwrap();
            assert_eq!(shop.slots().len(), SHOP_SIZE);
            assert!(!shop.is_legendary());
            assert!(shop.slots().iter().any(|slot| slot.item.is_unprofitable()));
            assert!(shop.slots().iter().all(|slot| slot.item.shop_price >= 1));
        }
    }

    #[test]
    fn cheap_templates_still_yield_a_loss() {
        let catalog = ItemCatalog::new(vec![ItemTemplate::new("Pebble", ".", "#808080", 2, 1)]);
        let ledger = ProgressionLedger::new();
        let mut shop = ShopSession::default();
        for seed in 0..2_000 {
            let mut rng = StdRng::seed_from_u64(seed);
            shop.generate(&ledger, &catalog, &mut rng).unwrap();
            assert!(
                shop.slots().iter().any(|slot| slot.item.is_unprofitable()),
                "seed {seed} produced no losing offer"
            );
        }
    }

    #[test]
    fn best_deal_prefers_first_on_ties() {
        let items = vec![
            item("A", 100, 120),
            item("B", 100, 70),
            item("C", 200, 170),
            item("D", 50, 60),
        ];
        assert_eq!(best_deal_index(&items), Some(1));
        assert_eq!(best_deal_index(&[]), None);
    }

    #[test]
    fn best_deal_survives_purchases() {
        let catalog = ItemCatalog::default();
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(100_000);
        let mut rng = StdRng::seed_from_u64(17);
        let mut shop = ShopSession::default();
        shop.generate(&ledger, &catalog, &mut rng).unwrap();
        let designated = shop.best_deal();
        assert!(designated.is_some());
        for index in [designated.unwrap(), 0, 3, 4] {
            let _ = shop.buy(index, &mut ledger);
            assert_eq!(shop.best_deal(), designated);
        }
        shop.buy_all(&mut ledger).unwrap_err();
        assert_eq!(shop.best_deal(), designated);
    }

    #[test]
    fn buying_with_exact_cash_empties_wallet() {
        let mut shop = open_shop(vec![item("A", 100, 80), item("B", 100, 130)]);
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(80);
        let purchase = shop.buy(0, &mut ledger).unwrap();
        assert_eq!(purchase.price, 80);
        assert!(!purchase.victory);
        assert_eq!(ledger.cash(), 0);
        assert_eq!(ledger.acquired().len(), 1);
        assert!(shop.slots()[0].bought);
    }

    #[test]
    fn buying_one_short_is_rejected() {
        let mut shop = open_shop(vec![item("A", 100, 80)]);
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(79);
        assert_eq!(
            shop.buy(0, &mut ledger),
            Err(Rejection::InsufficientFunds {
                needed: 80,
                available: 79
            })
        );
        assert_eq!(ledger.cash(), 79);
        assert!(ledger.acquired().is_empty());
        assert!(!shop.slots()[0].bought);
    }

    #[test]
    fn double_buy_and_bad_index_are_rejected() {
        let mut shop = open_shop(vec![item("A", 100, 80)]);
        let mut ledger = ProgressionLedger::new();
        shop.buy(0, &mut ledger).unwrap();
        assert_eq!(shop.buy(0, &mut ledger), Err(Rejection::AlreadyBought(0)));
        assert_eq!(shop.buy(7, &mut ledger), Err(Rejection::NoSuchItem(7)));
        assert_eq!(ledger.cash(), 920);
    }

    #[test]
    fn settled_shop_refuses_commands() {
        let catalog = ItemCatalog::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut shop = open_shop(vec![item("A", 100, 80)]);
        let mut ledger = ProgressionLedger::new();
        shop.settle();
        assert_eq!(shop.buy(0, &mut ledger), Err(Rejection::ShopClosed));
        assert_eq!(
            shop.advance(AdvanceKind::Next, &mut ledger, &catalog, &mut rng),
            Err(Rejection::ShopClosed)
        );
        assert_eq!(ledger.cash(), 1_000);
    }

    #[test]
    fn bulk_buy_needs_upgrade_and_applies_discount() {
        let mut shop = open_shop(vec![
            item("A", 100, 100),
            item("B", 100, 200),
            item("C", 100, 300),
        ]);
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(10_000);
        assert_eq!(
            shop.buy_all(&mut ledger),
            Err(Rejection::UpgradeLocked(UpgradeKind::InstaBuy))
        );
        ledger.buy_upgrade(UpgradeKind::InstaBuy).unwrap();
        let cash = ledger.cash();

        shop.buy(0, &mut ledger).unwrap();
        let bulk = shop.buy_all(&mut ledger).unwrap();
        assert_eq!(bulk.count, 2);
        assert_eq!(bulk.discount_percent, 5);
        assert_eq!(bulk.total, 475);
        assert_eq!(bulk.saved, 25);
        assert_eq!(ledger.cash(), cash - 100 - 475);
        let prices: Vec<i64> = ledger.acquired().iter().map(|i| i.shop_price).collect();
        assert_eq!(prices, vec![100, 190, 285]);
        assert!(shop.slots().iter().all(|slot| slot.bought));
        assert_eq!(shop.buy_all(&mut ledger), Err(Rejection::NothingToBuy));
    }

    #[test]
    fn bulk_buy_is_all_or_nothing() {
        let mut shop = open_shop(vec![item("A", 100, 400), item("B", 100, 400)]);
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(2_500);
        ledger.buy_upgrade(UpgradeKind::InstaBuy).unwrap();
        assert_eq!(ledger.cash(), 0);
        ledger.set_cash(700);
        assert!(matches!(
            shop.buy_all(&mut ledger),
            Err(Rejection::InsufficientFunds { needed: 760, .. })
        ));
        assert_eq!(ledger.cash(), 700);
        assert!(ledger.acquired().is_empty());
        assert!(shop.remaining().count() == 2);
    }

    #[test]
    fn advancing_spends_time_and_raises_tier() {
        let catalog = ItemCatalog::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut ledger = ProgressionLedger::new();
        let mut shop = ShopSession::default();
        shop.generate(&ledger, &catalog, &mut rng).unwrap();

        let outcome = shop
            .advance(AdvanceKind::Skip, &mut ledger, &catalog, &mut rng)
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced { cost: 10.0 });
        assert_eq!(ledger.tier(), 3);
        assert_eq!(ledger.skip_streak(), 1);
        assert_eq!(ledger.time_remaining(), 50.0);

        let outcome = shop
            .advance(AdvanceKind::Next, &mut ledger, &catalog, &mut rng)
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced { cost: 5.0 });
        assert_eq!(ledger.tier(), 4);
        assert_eq!(ledger.skip_streak(), 0);
        assert_eq!(ledger.time_remaining(), 45.0);
        assert!(shop.slots().iter().all(|slot| !slot.bought));
    }

    #[test]
    fn advancing_without_time_ends_day() {
        let catalog = ItemCatalog::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut ledger = ProgressionLedger::new();
        let mut shop = ShopSession::default();
        shop.generate(&ledger, &catalog, &mut rng).unwrap();
        ledger.set_time_remaining(5.0);
        let before = shop.slots().to_vec();
        let outcome = shop
            .advance(AdvanceKind::Next, &mut ledger, &catalog, &mut rng)
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::DayOver);
        assert_eq!(ledger.tier(), 1);
        assert_eq!(ledger.time_remaining(), 5.0);
        assert_eq!(shop.slots(), before.as_slice());
    }

    #[test]
    fn legendary_shop_appears_after_skip_streak() {
        let catalog = ItemCatalog::default();
        let mut ledger = ProgressionLedger::new();
        ledger.set_cash(LEGENDARY_CASH_THRESHOLD);
        for _ in 0..LEGENDARY_SKIP_STREAK {
            ledger.record_skip();
        }
        let mut shop = ShopSession::default();
        let mut seen = false;
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            shop.generate(&ledger, &catalog, &mut rng).unwrap();
            if shop.is_legendary() {
                seen = true;
                assert!(shop.slots()[0].item.is_legendary);
                assert_eq!(shop.best_deal(), Some(0));
                let purchase = shop.buy(0, &mut ledger).unwrap();
                assert!(purchase.victory);
                break;
            }
        }
        assert!(seen, "no legendary shop in 300 rolls");
    }

    #[test]
    fn legendary_needs_cash() {
        let catalog = ItemCatalog::default();
        let mut ledger = ProgressionLedger::new();
        for _ in 0..10 {
            ledger.record_skip();
        }
        let mut shop = ShopSession::default();
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            shop.generate(&ledger, &catalog, &mut rng).unwrap();
            assert!(!shop.is_legendary());
        }
    }

    #[test]
    fn loupe_flags_overpriced_items() {
        let catalog = ItemCatalog::default();
        let mut ledger = ProgressionLedger::new();
        let mut shop = ShopSession::default();
        let mut rng = StdRng::seed_from_u64(21);
        shop.generate(&ledger, &catalog, &mut rng).unwrap();
        assert!(shop.slots().iter().all(|slot| !slot.overpriced));

        ledger.buy_upgrade(UpgradeKind::Loupe).unwrap();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            shop.generate(&ledger, &catalog, &mut rng).unwrap();
            for slot in shop.slots() {
                assert_eq!(slot.overpriced, PricingEngine.profit(&slot.item).is_overpriced);
            }
        }
    }
}
