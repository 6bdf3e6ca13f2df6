#![allow(missing_docs)]

//! The game facade: owns the ledger, the shop and the day loop, and is the
//! only place commands enter the core.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::ItemCatalog;
use crate::clock::{self, DayClock};
use crate::config::AppConfig;
use crate::day::{self, DayPhase, DayReport, DayStart};
use crate::error::{CommandResult, Rejection};
use crate::ledger::{BuildingKind, ProgressionLedger, SnapshotError, UpgradeKind};
use crate::models::PricedItem;
use crate::shop::{AdvanceKind, AdvanceOutcome, BulkPurchase, Purchase, ShopSession};
use crate::stats::{self, Achievement, DayStats, GameExport};

/// What a clock tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Stale epoch, stopped clock or no day running.
    Ignored,
    /// Time was spent; this much is left.
    Running(f64),
    /// The day ran out and was settled.
    DayEnded,
}

/// Why the game could not be saved.
#[derive(Debug, Error)]
pub enum SaveError {
    /// A settled day or a won game cannot be resumed.
    #[error("cannot save while in {0:?}")]
    Unavailable(DayPhase),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A single run of the game.
#[derive(Debug)]
pub struct Game<R = StdRng> {
    ledger: ProgressionLedger,
    catalog: ItemCatalog,
    shop: ShopSession,
    clock: DayClock,
    phase: DayPhase,
    report: Option<DayReport>,
    debug_mode: bool,
    rng: R,
}

impl Game<StdRng> {
    /// Build a game from settings; a configured seed makes the run
    /// reproducible.
    pub fn new(config: &AppConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut game = Self::with_rng(rng, DayClock::new(config.tick_interval()));
        game.debug_mode = config.debug_mode;
        game
    }
}

impl<R: Rng> Game<R> {
    /// Build a game around an explicit random source and clock.
    pub fn with_rng(rng: R, clock: DayClock) -> Self {
        Self {
            ledger: ProgressionLedger::new(),
            catalog: ItemCatalog::default(),
            shop: ShopSession::default(),
            clock,
            phase: DayPhase::Intro,
            report: None,
            debug_mode: false,
            rng,
        }
    }

    /// Replace the item catalog. Takes effect with the next offer.
    pub fn with_catalog(mut self, catalog: ItemCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn ledger(&self) -> &ProgressionLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn shop(&self) -> &ShopSession {
        &self.shop
    }

    pub fn clock(&self) -> &DayClock {
        &self.clock
    }

    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    /// Report of the most recently settled day.
    pub fn report(&self) -> Option<&DayReport> {
        self.report.as_ref()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn cash(&self) -> i64 {
        self.ledger.cash()
    }

    pub fn day(&self) -> u32 {
        self.ledger.day()
    }

    pub fn tier(&self) -> u32 {
        self.ledger.tier()
    }

    pub fn time_remaining(&self) -> f64 {
        self.ledger.time_remaining()
    }

    pub fn acquired(&self) -> &[PricedItem] {
        self.ledger.acquired()
    }

    /// Seconds a trip of `kind` costs with the current stables.
    pub fn advance_cost(&self, kind: AdvanceKind) -> f64 {
        kind.time_cost(self.ledger.upgrade_level(UpgradeKind::Route))
    }

    /// Slot to highlight as the best deal, once the tip button is built.
    pub fn best_deal_hint(&self) -> Option<usize> {
        if self.ledger.upgrade_level(UpgradeKind::TipButton) == 0 {
            return None;
        }
        self.shop.best_deal()
    }

    pub fn is_time_low(&self) -> bool {
        self.phase == DayPhase::Shopping && clock::is_time_low(self.ledger.time_remaining())
    }

    pub fn time_efficiency(&self) -> f64 {
        clock::time_efficiency(self.ledger.time_remaining(), self.ledger.max_day_time())
    }

    pub fn day_stats(&self) -> DayStats {
        DayStats::from_items(self.ledger.acquired())
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        stats::achievements(&self.ledger)
    }

    /// Begin play from the intro or after a game over, resuming the day held
    /// by the ledger. Returns the clock epoch for the tick scheduler.
    pub fn start_game(&mut self) -> CommandResult<u64> {
        match self.phase {
            DayPhase::Intro | DayPhase::GameOver => {}
            DayPhase::Shopping | DayPhase::Reporting => return Err(Rejection::DayInProgress),
            DayPhase::Victory => return Err(Rejection::GameFinished),
        }
        self.shop.generate(&self.ledger, &self.catalog, &mut self.rng)?;
        if self.ledger.time_remaining() <= 0.0 {
            self.ledger.set_time_remaining(self.ledger.max_day_time());
        }
        self.report = None;
        self.phase = DayPhase::Shopping;
        let epoch = self.clock.start();
        info!(day = self.ledger.day(), cash = self.ledger.cash(), epoch, "Game started");
        Ok(epoch)
    }

    /// Re-roll the current offer at the current tier.
    pub fn generate_shop(&mut self) -> CommandResult<()> {
        self.ensure_shopping()?;
        self.shop.generate(&self.ledger, &self.catalog, &mut self.rng)
    }

    pub fn buy_item(&mut self, index: usize) -> CommandResult<Purchase> {
        self.ensure_shopping()?;
        let purchase = self.shop.buy(index, &mut self.ledger)?;
        if purchase.victory {
            self.win();
        }
        Ok(purchase)
    }

    /// Buy everything left at the insta-buy discount.
    pub fn buy_all_shop(&mut self) -> CommandResult<BulkPurchase> {
        self.ensure_shopping()?;
        let purchase = self.shop.buy_all(&mut self.ledger)?;
        if purchase.victory {
            self.win();
        }
        Ok(purchase)
    }

    /// Travel to the next shop; ends the day when time is too short.
    pub fn advance_shop(&mut self, kind: AdvanceKind) -> CommandResult<AdvanceOutcome> {
        self.ensure_shopping()?;
        let outcome = self
            .shop
            .advance(kind, &mut self.ledger, &self.catalog, &mut self.rng)?;
        if outcome == AdvanceOutcome::DayOver {
            self.end_day()?;
        }
        Ok(outcome)
    }

    /// Spend one tick of day time if `epoch` belongs to the running clock.
    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        if self.phase != DayPhase::Shopping || !self.clock.accepts(epoch) {
            return TickOutcome::Ignored;
        }
        self.ledger.spend_time(self.clock.step_seconds());
        let remaining = self.ledger.time_remaining();
        if remaining > 0.0 {
            return TickOutcome::Running(remaining);
        }
        self.ledger.set_time_remaining(0.0);
        match self.end_day() {
            Ok(_) => TickOutcome::DayEnded,
            Err(_) => TickOutcome::Ignored,
        }
    }

    /// Close the shop and settle the day.
    pub fn end_day(&mut self) -> CommandResult<&DayReport> {
        self.ensure_shopping()?;
        self.clock.stop();
        self.shop.settle();
        let report = day::settle_day(&mut self.ledger);
        self.phase = DayPhase::Reporting;
        Ok(&*self.report.insert(report))
    }

    /// Pay upkeep and open the first shop of the next day, or end the game.
    pub fn start_next_day(&mut self) -> CommandResult<DayStart> {
        match self.phase {
            DayPhase::Reporting => {}
            DayPhase::Shopping => return Err(Rejection::DayInProgress),
            DayPhase::Victory => return Err(Rejection::GameFinished),
            DayPhase::Intro | DayPhase::GameOver => return Err(Rejection::DayNotEnded),
        }
        if self.catalog.available_templates(1).is_empty() {
            return Err(Rejection::EmptyCatalog(1));
        }

        self.clock.stop();
        self.shop.clear();
        self.report = None;
        let outcome = day::begin_next_day(&mut self.ledger);
        match outcome {
            DayStart::GameOver { .. } => {
                self.phase = DayPhase::GameOver;
            }
            DayStart::Started { .. } => {
                self.shop.generate(&self.ledger, &self.catalog, &mut self.rng)?;
                self.phase = DayPhase::Shopping;
                self.clock.start();
            }
        }
        Ok(outcome)
    }

    pub fn buy_upgrade(&mut self, kind: UpgradeKind) -> CommandResult<u32> {
        self.ensure_playable()?;
        self.ledger.buy_upgrade(kind)
    }

    pub fn buy_building(&mut self, kind: BuildingKind) -> CommandResult<u32> {
        self.ensure_playable()?;
        self.ledger.buy_building(kind)
    }

    /// Throw the run away and return to the intro.
    pub fn reset_game(&mut self) {
        self.clock.stop();
        self.ledger = ProgressionLedger::new();
        self.shop.clear();
        self.report = None;
        self.phase = DayPhase::Intro;
        info!("Game reset");
    }

    /// Flip the debug overlay. Returns the new setting.
    pub fn toggle_debug(&mut self) -> bool {
        self.debug_mode = !self.debug_mode;
        self.debug_mode
    }

    /// Encode the ledger for a save file. Refused while a day report is open,
    /// since its items are already sold, and after a win.
    pub fn save_game(&self) -> Result<Value, SaveError> {
        match self.phase {
            DayPhase::Reporting | DayPhase::Victory => Err(SaveError::Unavailable(self.phase)),
            _ => Ok(self.ledger.to_value()?),
        }
    }

    /// Replace the ledger with a saved one. Returns `false`, leaving the
    /// running game untouched, when the data does not decode or validate.
    pub fn load_game(&mut self, raw: &str) -> bool {
        self.install_ledger(ProgressionLedger::from_json(raw))
    }

    /// Like [`Game::load_game`] for an already parsed value.
    pub fn load_value(&mut self, value: Value) -> bool {
        self.install_ledger(ProgressionLedger::from_value(value))
    }

    fn install_ledger(&mut self, decoded: Result<ProgressionLedger, SnapshotError>) -> bool {
        match decoded {
            Ok(ledger) => {
                self.clock.stop();
                self.ledger = ledger;
                self.shop.clear();
                self.report = None;
                self.phase = DayPhase::Intro;
                info!(day = self.ledger.day(), cash = self.ledger.cash(), "Save loaded");
                true
            }
            Err(err) => {
                warn!("Rejected save data: {err}");
                false
            }
        }
    }

    /// Build the shareable export document.
    pub fn export_game_data(&self) -> GameExport {
        GameExport::new(&self.ledger)
    }

    fn win(&mut self) {
        self.clock.stop();
        self.shop.settle();
        self.phase = DayPhase::Victory;
        info!(day = self.ledger.day(), cash = self.ledger.cash(), "Legendary item bought");
    }

    fn ensure_shopping(&self) -> CommandResult<()> {
        match self.phase {
            DayPhase::Shopping => Ok(()),
            DayPhase::Victory => Err(Rejection::GameFinished),
            _ => Err(Rejection::ShopClosed),
        }
    }

    fn ensure_playable(&self) -> CommandResult<()> {
        match self.phase {
            DayPhase::GameOver | DayPhase::Victory => Err(Rejection::GameFinished),
            _ => Ok(()),
        }
    }
}
