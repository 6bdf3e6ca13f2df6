#![warn(clippy::all, missing_docs)]

//! Core rules for Haggle, a trading game about buying low from roadside
//! shops and selling at market value before the day runs out.
//!
//! This crate hosts the item catalog, pricing, the shop and day loop, the
//! progression ledger, configuration and save files used by the terminal
//! UI and any future frontends.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod day;
pub mod error;
pub mod game;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod save;
pub mod shop;
pub mod stats;

pub use catalog::ItemCatalog;
pub use clock::DayClock;
pub use config::AppConfig;
pub use day::{DayPhase, DayReport, DayStart};
pub use error::{CommandResult, Rejection};
pub use game::{Game, SaveError, TickOutcome};
pub use ledger::{BuildingKind, ProgressionLedger, UpgradeKind};
pub use models::{ItemTemplate, PricedItem};
pub use pricing::PricingEngine;
pub use save::{SaveEntry, SaveManager};
pub use shop::{AdvanceKind, AdvanceOutcome, ShopSession};
