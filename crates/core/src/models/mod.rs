//! Shared domain models.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CommandResult, Rejection};

/// Immutable description of an item kind that shops can stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    /// Display name, also the key for item knowledge.
    pub name: String,
    /// Short glyph rendered by frontends.
    #[serde(default)]
    pub glyph: String,
    /// Accent colour as `#rrggbb`.
    #[serde(default)]
    pub color: String,
    /// Reference price the market value is drawn around.
    pub base_price: i64,
    /// Lowest tier at which shops may stock the item.
    pub min_tier: u32,
}

impl ItemTemplate {
    /// Build a template with presentation hints.
    pub fn new(name: &str, glyph: &str, color: &str, base_price: i64, min_tier: u32) -> Self {
        Self {
            name: name.to_string(),
            glyph: glyph.to_string(),
            color: color.to_string(),
            base_price,
            min_tier,
        }
    }

    /// Refuse templates that could price below zero or never unlock.
    pub fn validate(&self) -> CommandResult<()> {
        let reason = if self.base_price <= 0 {
            "base price must be positive"
        } else if self.min_tier == 0 {
            "minimum tier must be at least 1"
        } else {
            return Ok(());
        };
        Err(Rejection::InvalidTemplate {
            name: self.name.clone(),
            reason,
        })
    }
}

/// A template instance with rolled quality and prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedItem {
    /// Shared template the item was rolled from.
    pub template: Arc<ItemTemplate>,
    /// Colour vibrancy in `[0, 1]`.
    pub color_quality: f64,
    /// Physical size in `[0, 1]`.
    pub size_quality: f64,
    /// Cleanliness in `[0, 1]`; 0 is filthy.
    pub cleanliness: f64,
    /// Copy of the template's base price.
    pub base_value: i64,
    /// Hidden value realised at the end of the day.
    pub market_value: i64,
    /// Price the shop asks for. Always at least 1.
    pub shop_price: i64,
    /// Set when settlement mirrored this item's loss into a gain.
    #[serde(default)]
    pub loss_reverted: bool,
    /// Shop price before a loss revert rewrote it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_shop_price: Option<i64>,
    /// Marks the one-of-a-kind winning item.
    #[serde(default)]
    pub is_legendary: bool,
}

impl PricedItem {
    /// Display name of the underlying template.
    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Signed gain from buying at the shop price and selling at market value.
    pub fn profit(&self) -> i64 {
        self.market_value - self.shop_price
    }

    /// Price the player actually handed over, ignoring any loss revert.
    pub fn paid_price(&self) -> i64 {
        self.original_shop_price.unwrap_or(self.shop_price)
    }

    /// Mean of the three quality parameters.
    pub fn purity(&self) -> f64 {
        (self.color_quality + self.size_quality + self.cleanliness) / 3.0
    }

    /// Whether the item sells below market value.
    pub fn is_unprofitable(&self) -> bool {
        self.market_value < self.shop_price
    }
}

/// Profitability summary used for shop badges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitInfo {
    /// `market_value - shop_price`.
    pub profit: i64,
    /// Profit relative to market value.
    pub profit_percent: f64,
    /// Strictly positive profit.
    pub is_profitable: bool,
    /// Loses more than 5% of market value.
    pub is_overpriced: bool,
}

/// Presentation attributes derived purely from quality parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemVisuals {
    /// Brightness multiplier in `[0.7, 1.3]`.
    pub brightness: f64,
    /// Opacity in `[0.8, 1.0]`.
    pub opacity: f64,
    /// Saturation percentage in `[0, 120]`.
    pub saturation: f64,
    /// Relative glyph size in `[2, 5]`.
    pub size_scale: f64,
    /// Dirt overlay intensity in `[0, 0.6]`.
    pub griminess: f64,
}
