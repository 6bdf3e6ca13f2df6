//! Quality-driven pricing of item instances.

use std::f64::consts::PI;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::Rng;
use tracing::trace;

use crate::models::{ItemTemplate, ItemVisuals, PricedItem, ProfitInfo};

/// Standard deviation of the market multiplier.
pub const PRICE_STD_DEV: f64 = 0.15;
/// Lowest multiplier a market value can be drawn with.
pub const MIN_MARKET_MULTIPLIER: f64 = 0.3;
/// Share of market value each quality parameter swings the shop price by.
pub const QUALITY_SWING: f64 = 0.4;
/// Loss ratio beyond which an item counts as overpriced.
pub const OVERPRICED_THRESHOLD: f64 = -0.05;

/// Name of the winning item.
pub const LEGENDARY_NAME: &str = "Potion of Immortality";
const LEGENDARY_VALUE: i64 = 10_000_000;
const LEGENDARY_PRICE: i64 = 1_000_000;

static LEGENDARY_TEMPLATE: Lazy<Arc<ItemTemplate>> = Lazy::new(|| {
    Arc::new(ItemTemplate::new(
        LEGENDARY_NAME,
        "🧪",
        "#ff0080",
        LEGENDARY_VALUE,
        1,
    ))
});

/// The three independent quality rolls of an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality {
    /// Colour vibrancy.
    pub color: f64,
    /// Physical size.
    pub size: f64,
    /// Cleanliness; 0 is filthy.
    pub cleanliness: f64,
}

impl Quality {
    /// Draw each parameter uniformly from `[0, 1)`.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            color: rng.gen::<f64>(),
            size: rng.gen::<f64>(),
            cleanliness: rng.gen::<f64>(),
        }
    }

    /// Summed price effect, roughly within `±0.6`.
    pub fn total_effect(&self) -> f64 {
        quality_effect(self.color) + quality_effect(self.size) + quality_effect(self.cleanliness)
    }
}

/// `(q - 0.5) * 0.4`, a symmetric ±20% swing.
pub fn quality_effect(quality: f64) -> f64 {
    (quality - 0.5) * QUALITY_SWING
}

/// Sample `N(mean, std_dev)` with the Box–Muller transform.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let mut u = 0.0;
    while u == 0.0 {
        u = rng.gen::<f64>();
    }
    let mut v = 0.0;
    while v == 0.0 {
        v = rng.gen::<f64>();
    }
    let z0 = (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos();
    z0 * std_dev + mean
}

/// Mean market-to-base ratio at `tier`; higher tiers skew upward.
pub fn price_to_base_mean(tier: u32) -> f64 {
    0.9 + f64::from(tier) * 0.02
}

/// Turns templates into priced items.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine;

impl PricingEngine {
    /// Roll quality and market value for `template` at `tier`.
    pub fn price_item<R: Rng + ?Sized>(
        &self,
        template: &Arc<ItemTemplate>,
        tier: u32,
        rng: &mut R,
    ) -> PricedItem {
        let quality = Quality::roll(rng);
        let multiplier = self.market_multiplier(tier, rng);
        let item = self.price_with(template, quality, multiplier);
        trace!(
            name = %item.name(),
            tier,
            multiplier,
            market = item.market_value,
            price = item.shop_price,
            "Priced item"
        );
        item
    }

    /// Draw the clamped market multiplier for `tier`.
    pub fn market_multiplier<R: Rng + ?Sized>(&self, tier: u32, rng: &mut R) -> f64 {
        gaussian(rng, price_to_base_mean(tier), PRICE_STD_DEV).max(MIN_MARKET_MULTIPLIER)
    }

    /// Deterministic pricing from already drawn parameters.
    pub fn price_with(
        &self,
        template: &Arc<ItemTemplate>,
        quality: Quality,
        multiplier: f64,
    ) -> PricedItem {
        let base_value = template.base_price;
        let market_value =
            (base_value as f64 * multiplier.max(MIN_MARKET_MULTIPLIER)).round() as i64;
        let shop_price = (market_value as f64 * (1.0 + quality.total_effect())).round() as i64;
        PricedItem {
            template: Arc::clone(template),
            color_quality: quality.color,
            size_quality: quality.size,
            cleanliness: quality.cleanliness,
            base_value,
            market_value,
            shop_price: shop_price.max(1),
            loss_reverted: false,
            original_shop_price: None,
            is_legendary: false,
        }
    }

    /// The fixed, pristine winning item.
    pub fn legendary_item(&self) -> PricedItem {
        PricedItem {
            template: Arc::clone(&LEGENDARY_TEMPLATE),
            color_quality: 1.0,
            size_quality: 1.0,
            cleanliness: 1.0,
            base_value: LEGENDARY_VALUE,
            market_value: LEGENDARY_VALUE,
            shop_price: LEGENDARY_PRICE,
            loss_reverted: false,
            original_shop_price: None,
            is_legendary: true,
        }
    }

    /// Profitability badges for `item`.
    pub fn profit(&self, item: &PricedItem) -> ProfitInfo {
        let profit = item.profit();
        let profit_percent = if item.market_value == 0 {
            0.0
        } else {
            profit as f64 / item.market_value as f64
        };
        ProfitInfo {
            profit,
            profit_percent,
            is_profitable: profit > 0,
            is_overpriced: profit_percent < OVERPRICED_THRESHOLD,
        }
    }

    /// Presentation attributes for `item`.
    pub fn visuals(&self, item: &PricedItem) -> ItemVisuals {
        ItemVisuals {
            brightness: (0.7 + item.color_quality * 0.6).clamp(0.7, 1.3),
            opacity: (0.8 + item.purity() * 0.2).clamp(0.8, 1.0),
            saturation: item.color_quality * 120.0,
            size_scale: 2.0 + item.size_quality * 3.0,
            griminess: griminess(item.cleanliness),
        }
    }
}

/// Dirt overlay intensity: near-flat when clean, ramping to 0.6 when filthy.
pub fn griminess(cleanliness: f64) -> f64 {
    if cleanliness >= 0.5 {
        (1.0 - cleanliness) * 0.3
    } else if cleanliness >= 0.35 {
        0.15 + ((0.5 - cleanliness) / 0.15) * 0.1
    } else {
        0.25 + ((0.35 - cleanliness) / 0.35) * 0.35
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemCatalog;
    use rand::{rngs::StdRng, SeedableRng};

    fn template(base_price: i64) -> Arc<ItemTemplate> {
        Arc::new(ItemTemplate::new("Test Idol", "I", "#123456", base_price, 1))
    }

    fn neutral() -> Quality {
        Quality {
            color: 0.5,
            size: 0.5,
            cleanliness: 0.5,
        }
    }

    #[test]
    fn generated_prices_hold_invariants() {
        let engine = PricingEngine;
        let catalog = ItemCatalog::default();
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..10_000u32 {
            let tier = 1 + i % 15;
            let template = catalog.sample(tier, &mut rng).expect("template");
            let item = engine.price_item(&template, tier, &mut rng);
            assert!(item.shop_price >= 1);
            assert!(item.market_value >= 0);
            let floor = (item.base_value as f64 * MIN_MARKET_MULTIPLIER).round() as i64;
            assert!(item.market_value >= floor);
            for q in [item.color_quality, item.size_quality, item.cleanliness] {
                assert!((0.0..=1.0).contains(&q));
            }
            assert_eq!(item.base_value, template.base_price);
        }
    }

    #[test]
    fn multiplier_never_below_floor() {
        let engine = PricingEngine;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10_000 {
            assert!(engine.market_multiplier(1, &mut rng) >= MIN_MARKET_MULTIPLIER);
        }
    }

    #[test]
    fn gaussian_centres_on_mean() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples = 20_000;
        let sum: f64 = (0..samples).map(|_| gaussian(&mut rng, 1.0, 0.15)).sum();
        let mean = sum / samples as f64;
        assert!((mean - 1.0).abs() < 0.01, "mean drifted to {mean}");
    }

    #[test]
    fn neutral_quality_sells_at_market() {
        let item = PricingEngine.price_with(&template(200), neutral(), 1.0);
        assert_eq!(item.market_value, 200);
        assert_eq!(item.shop_price, 200);
    }

    #[test]
    fn quality_extremes_swing_sixty_percent() {
        let engine = PricingEngine;
        let best = Quality {
            color: 1.0,
            size: 1.0,
            cleanliness: 1.0,
        };
        let worst = Quality {
            color: 0.0,
            size: 0.0,
            cleanliness: 0.0,
        };
        assert_eq!(engine.price_with(&template(100), best, 1.0).shop_price, 160);
        assert_eq!(engine.price_with(&template(100), worst, 1.0).shop_price, 40);
    }

    #[test]
    fn shop_price_floors_at_one() {
        let worst = Quality {
            color: 0.0,
            size: 0.0,
            cleanliness: 0.0,
        };
        let item = PricingEngine.price_with(&template(1), worst, 0.3);
        assert_eq!(item.market_value, 0);
        assert_eq!(item.shop_price, 1);
    }

    #[test]
    fn tier_raises_mean() {
        assert!((price_to_base_mean(1) - 0.92).abs() < 1e-9);
        assert!((price_to_base_mean(10) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn legendary_is_fixed() {
        let engine = PricingEngine;
        let a = engine.legendary_item();
        let b = engine.legendary_item();
        assert_eq!(a, b);
        assert!(a.is_legendary);
        assert_eq!(a.name(), LEGENDARY_NAME);
        assert_eq!(a.shop_price, 1_000_000);
        assert_eq!(a.market_value, 10_000_000);
        assert_eq!(a.cleanliness, 1.0);
    }

    #[test]
    fn overpriced_needs_five_percent_loss() {
        let engine = PricingEngine;
        let mut item = engine.price_with(&template(100), neutral(), 1.0);
        item.shop_price = 105;
        assert!(!engine.profit(&item).is_overpriced);
        item.shop_price = 106;
        let info = engine.profit(&item);
        assert!(info.is_overpriced);
        assert!(!info.is_profitable);
        assert_eq!(info.profit, -6);
    }

    #[test]
    fn griminess_segments() {
        assert!(griminess(1.0).abs() < 1e-9);
        assert!((griminess(0.5) - 0.15).abs() < 1e-9);
        assert!((griminess(0.35) - 0.25).abs() < 1e-9);
        assert!((griminess(0.0) - 0.6).abs() < 1e-9);
        let steep = griminess(0.1) - griminess(0.2);
        let moderate = griminess(0.4) - griminess(0.5);
        assert!(steep > moderate);
    }

    #[test]
    fn visuals_stay_in_range() {
        let engine = PricingEngine;
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1_000 {
            let item = engine.price_item(&template(300), 4, &mut rng);
            let visuals = engine.visuals(&item);
            assert!((0.7..=1.3).contains(&visuals.brightness));
            assert!((0.8..=1.0).contains(&visuals.opacity));
            assert!((0.0..=120.0).contains(&visuals.saturation));
            assert!((2.0..=5.0).contains(&visuals.size_scale));
            assert!((0.0..=0.6).contains(&visuals.griminess));
        }
    }
}
