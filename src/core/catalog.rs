//! Read-only catalog lookups for pricing.
//!
//! Everything one order needs is fetched in at most three queries, one per table, instead of
//! a round trip per line.

use crate::{
    core::pricing::LineRequest,
    entities::{ItemVariant, MenuItem, Modifier, item_variant, menu_item, modifier},
    errors::Result,
};
use sea_orm::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Catalog rows referenced by a batch of line requests.
#[derive(Debug, Default, Clone)]
pub struct CatalogSnapshot {
    /// Menu items of the restaurant, by id
    pub items: HashMap<i64, menu_item::Model>,
    /// Variants of those items, by id
    pub variants: HashMap<i64, item_variant::Model>,
    /// Modifiers of the restaurant, by id
    pub modifiers: HashMap<i64, modifier::Model>,
}

/// Loads the items, variants and modifiers named by `lines`.
///
/// Rows belonging to another restaurant are left out, so callers treat them exactly like
/// ids that do not exist.
pub async fn load_for_lines<C>(
    db: &C,
    restaurant_id: i64,
    lines: &[LineRequest],
) -> Result<CatalogSnapshot>
where
    C: ConnectionTrait,
{
    let item_ids: BTreeSet<i64> = lines.iter().map(|l| l.menu_item_id).collect();
    let variant_ids: BTreeSet<i64> = lines.iter().filter_map(|l| l.variant_id).collect();
    let modifier_ids: BTreeSet<i64> = lines
        .iter()
        .flat_map(|l| l.modifier_ids.iter().copied())
        .collect();

    let mut snapshot = CatalogSnapshot::default();

    if !item_ids.is_empty() {
        snapshot.items = MenuItem::find()
            .filter(menu_item::Column::Id.is_in(item_ids))
            .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
    }

    if !variant_ids.is_empty() {
        snapshot.variants = ItemVariant::find()
            .filter(item_variant::Column::Id.is_in(variant_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();
    }

    if !modifier_ids.is_empty() {
        snapshot.modifiers = Modifier::find()
            .filter(modifier::Column::Id.is_in(modifier_ids))
            .filter(modifier::Column::RestaurantId.eq(restaurant_id))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
    }

    debug!(
        items = snapshot.items.len(),
        variants = snapshot.variants.len(),
        modifiers = snapshot.modifiers.len(),
        "Loaded catalog for restaurant {}",
        restaurant_id
    );
    Ok(snapshot)
}
