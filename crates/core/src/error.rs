#![allow(missing_docs)]

//! Rejections for player commands that leave state untouched.

use thiserror::Error;

use crate::ledger::UpgradeKind;

/// Why a command was refused. A rejected command never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("insufficient funds: need ${needed}, have ${available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("no item at slot {0}")]
    NoSuchItem(usize),
    #[error("item {0} was already bought")]
    AlreadyBought(usize),
    #[error("nothing left to buy in this shop")]
    NothingToBuy,
    #[error("{0} upgrade is at max level")]
    MaxLevel(UpgradeKind),
    #[error("{0} upgrade has not been built")]
    UpgradeLocked(UpgradeKind),
    #[error("no shop is open")]
    ShopClosed,
    #[error("invalid item template {name}: {reason}")]
    InvalidTemplate { name: String, reason: &'static str },
    #[error("no items are available at tier {0}")]
    EmptyCatalog(u32),
    #[error("the day is still running")]
    DayInProgress,
    #[error("the day has not ended yet")]
    DayNotEnded,
    #[error("the game is over")]
    GameFinished,
}

/// Result alias for player commands.
pub type CommandResult<T> = std::result::Result<T, Rejection>;
