//! Plain key/value encoding of the ledger for saves and exports.

use serde_json::Value;
use thiserror::Error;

use super::{ProgressionLedger, UpgradeKind};

/// Why an encoded ledger could not be restored.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed ledger data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SnapshotError {
    SnapshotError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl ProgressionLedger {
    /// Encode as a JSON object with camelCase keys.
    pub fn to_value(&self) -> Result<Value, SnapshotError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a ledger. Missing keys take their starting values; values that
    /// break ledger invariants are refused.
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        let ledger: ProgressionLedger = serde_json::from_value(value)?;
        ledger.validate()?;
        Ok(ledger)
    }

    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let ledger: ProgressionLedger = serde_json::from_str(raw)?;
        ledger.validate()?;
        Ok(ledger)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        if self.cash < 0 {
            return Err(invalid("cash", format!("{} is negative", self.cash)));
        }
        if self.day == 0 {
            return Err(invalid("day", "must be at least 1"));
        }
        if self.tier == 0 {
            return Err(invalid("tier", "must be at least 1"));
        }
        if !self.time_remaining.is_finite() || self.time_remaining < 0.0 {
            return Err(invalid(
                "timeRemaining",
                format!("{} is not a valid duration", self.time_remaining),
            ));
        }
        for kind in UpgradeKind::ALL {
            let level = self.upgrade_level(kind);
            if level > kind.max_level() {
                return Err(invalid(
                    "upgrades",
                    format!("{kind} level {level} exceeds {}", kind.max_level()),
                ));
            }
        }
        for item in &self.acquired {
            if item.shop_price < 1 {
                return Err(invalid(
                    "dailyInventory",
                    format!("{} has shop price {}", item.name(), item.shop_price),
                ));
            }
            if item.market_value < 0 {
                return Err(invalid(
                    "dailyInventory",
                    format!("{} has market value {}", item.name(), item.market_value),
                ));
            }
            if item.base_value < 1 {
                return Err(invalid(
                    "dailyInventory",
                    format!("{} has base value {}", item.name(), item.base_value),
                ));
            }
            let qualities = [item.color_quality, item.size_quality, item.cleanliness];
            if qualities.iter().any(|q| !(0.0..=1.0).contains(q)) {
                return Err(invalid(
                    "dailyInventory",
                    format!("{} has quality outside [0, 1]", item.name()),
                ));
            }
        }
        Ok(())
    }
}
