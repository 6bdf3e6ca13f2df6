//! Item templates and tier-gated sampling.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::Rng;
use tracing::warn;

use crate::error::CommandResult;
use crate::models::ItemTemplate;

static DEFAULT_TEMPLATES: Lazy<Vec<ItemTemplate>> = Lazy::new(|| {
    vec![
        ItemTemplate::new("Diamond Shard", "💎", "#3b82f6", 100, 1),
        ItemTemplate::new("Gold Coin", "🪙", "#f59e0b", 150, 1),
        ItemTemplate::new("Silver Ring", "💍", "#6b7280", 120, 1),
        ItemTemplate::new("Ruby Crown", "👑", "#dc2626", 300, 3),
        ItemTemplate::new("Ancient Vase", "🏺", "#92400e", 250, 3),
        ItemTemplate::new("Crystal Ball", "🔮", "#7c3aed", 400, 4),
        ItemTemplate::new("Magic Potion", "⚗", "#059669", 350, 4),
        ItemTemplate::new("Mystical Beads", "📿", "#be185d", 500, 6),
        ItemTemplate::new("Protective Amulet", "🧿", "#1e40af", 550, 6),
        ItemTemplate::new("Golden Key", "🗝", "#d97706", 650, 8),
        ItemTemplate::new("Sacred Scroll", "📜", "#78350f", 700, 8),
        ItemTemplate::new("Dragon Egg", "🥚", "#991b1b", 1000, 10),
        ItemTemplate::new("Phoenix Feather", "🪶", "#c2410c", 1200, 12),
    ]
});

/// Ordered list of item templates shops draw from.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    templates: Vec<Arc<ItemTemplate>>,
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES.iter().cloned())
    }
}

impl ItemCatalog {
    /// Build a catalog from explicit templates. Invalid templates are dropped.
    pub fn new(templates: impl IntoIterator<Item = ItemTemplate>) -> Self {
        let templates = templates
            .into_iter()
            .filter(|template| match template.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, "Dropping item template");
                    false
                }
            })
            .map(Arc::new)
            .collect();
        Self { templates }
    }

    /// All templates in definition order.
    pub fn templates(&self) -> &[Arc<ItemTemplate>] {
        &self.templates
    }

    /// Append a template; existing shops keep their own references.
    pub fn add_template(&mut self, template: ItemTemplate) -> CommandResult<()> {
        template.validate()?;
        self.templates.push(Arc::new(template));
        Ok(())
    }

    /// Look up a template by exact name.
    pub fn template(&self, name: &str) -> Option<&Arc<ItemTemplate>> {
        self.templates.iter().find(|template| template.name == name)
    }

    /// Templates unlocked at `tier`.
    pub fn available_templates(&self, tier: u32) -> Vec<&Arc<ItemTemplate>> {
        self.templates
            .iter()
            .filter(|template| template.min_tier <= tier)
            .collect()
    }

    /// Unlocked templates repeated by their frequency weight.
    pub fn weighted_pool(&self, tier: u32) -> Vec<&Arc<ItemTemplate>> {
        let mut pool = Vec::new();
        for template in self.available_templates(tier) {
            let weight = template_weight(template.min_tier);
            pool.extend(std::iter::repeat(template).take(weight));
        }
        pool
    }

    /// Draw one template uniformly from the weighted pool.
    pub fn sample<R: Rng + ?Sized>(&self, tier: u32, rng: &mut R) -> Option<Arc<ItemTemplate>> {
        let pool = self.weighted_pool(tier);
        if pool.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..pool.len());
        Some(Arc::clone(pool[index]))
    }
}

/// `max(1, 10 - (min_tier - 1) * 2)`.
fn template_weight(min_tier: u32) -> usize {
    let penalty = i64::from(min_tier.saturating_sub(1)) * 2;
    (10 - penalty).max(1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::pricing::PricingEngine;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn availability_respects_min_tier() {
        let catalog = ItemCatalog::default();
        for tier in 1..=14 {
            let available = catalog.available_templates(tier);
            assert!(available.iter().all(|template| template.min_tier <= tier));
            let hidden = catalog
                .templates()
                .iter()
                .filter(|template| template.min_tier > tier)
                .count();
            assert_eq!(available.len() + hidden, catalog.templates().len());
        }
        assert_eq!(catalog.available_templates(1).len(), 3);
        assert_eq!(catalog.available_templates(12).len(), 13);
    }

    #[test]
    fn weights_favour_low_tiers() {
        assert_eq!(template_weight(1), 10);
        assert_eq!(template_weight(3), 6);
        assert_eq!(template_weight(4), 4);
        assert_eq!(template_weight(6), 1);
        assert_eq!(template_weight(12), 1);

        let catalog = ItemCatalog::default();
        let pool = catalog.weighted_pool(4);
        let count = |name: &str| pool.iter().filter(|t| t.name == name).count();
        assert_eq!(count("Gold Coin"), 10);
        assert_eq!(count("Ruby Crown"), 6);
        assert_eq!(count("Crystal Ball"), 4);
        assert!(count("Gold Coin") > count("Ruby Crown"));
        assert!(count("Ruby Crown") > count("Crystal Ball"));
    }

    #[test]
    fn sampling_stays_within_tier() {
        let catalog = ItemCatalog::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let template = catalog.sample(3, &mut rng).expect("tier 3 has templates");
            assert!(template.min_tier <= 3);
        }
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let catalog = ItemCatalog::new(vec![ItemTemplate::new("Relic", "R", "#000000", 900, 5)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(catalog.sample(4, &mut rng).is_none());
        assert!(catalog.sample(5, &mut rng).is_some());
    }

    #[test]
    fn added_templates_are_discoverable() {
        let mut catalog = ItemCatalog::default();
        catalog
            .add_template(ItemTemplate::new("Star Map", "✶", "#ffffff", 800, 9))
            .unwrap();
        assert_eq!(catalog.template("Star Map").map(|t| t.base_price), Some(800));
        assert!(catalog.template("Nonexistent").is_none());
    }

    #[test]
    fn invalid_templates_are_refused() {
        let mut catalog = ItemCatalog::default();
        let count = catalog.templates().len();
        assert!(matches!(
            catalog.add_template(ItemTemplate::new("Debt", "-", "#000000", -100, 1)),
            Err(Rejection::InvalidTemplate { .. })
        ));
        assert!(matches!(
            catalog.add_template(ItemTemplate::new("Void", "0", "#000000", 0, 1)),
            Err(Rejection::InvalidTemplate { .. })
        ));
        assert!(matches!(
            catalog.add_template(ItemTemplate::new("Limbo", "?", "#000000", 50, 0)),
            Err(Rejection::InvalidTemplate { .. })
        ));
        assert_eq!(catalog.templates().len(), count);

        let filtered = ItemCatalog::new(vec![
            ItemTemplate::new("Debt", "-", "#000000", -100, 1),
            ItemTemplate::new("Coin", "c", "#f59e0b", 1, 1),
        ]);
        assert_eq!(filtered.templates().len(), 1);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let template = filtered.sample(1, &mut rng).unwrap();
            let item = PricingEngine.price_item(&template, 1, &mut rng);
            assert!(item.market_value >= 0);
            assert!(item.shop_price >= 1);
        }
    }
}
