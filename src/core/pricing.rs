//! Pricing resolver - Turns line requests into priced, snapshotted line items.
//!
//! A selected variant's price replaces the item's base price. A variant that does not belong
//! to the item is ignored and the base price is used. Modifiers add their price per unit;
//! unknown modifier ids are dropped. None of this writes anything.

use crate::{
    core::{
        catalog::{self, CatalogSnapshot},
        money::round_money,
    },
    entities::{
        item_variant, menu_item, modifier,
        order_item::{self, ModifierSnapshot, ModifierSnapshots},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

/// Largest quantity accepted on one line.
pub const MAX_QUANTITY: i32 = 9999;

/// One requested line: what the guest picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// Catalog item
    pub menu_item_id: i64,
    /// Units ordered
    pub quantity: i32,
    /// Optional size/portion variant
    #[serde(default)]
    pub variant_id: Option<i64>,
    /// Add-ons
    #[serde(default)]
    pub modifier_ids: Vec<i64>,
    /// Kitchen notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl LineRequest {
    /// A plain line with no variant, modifiers or notes.
    #[must_use]
    pub const fn new(menu_item_id: i64, quantity: i32) -> Self {
        Self {
            menu_item_id,
            quantity,
            variant_id: None,
            modifier_ids: Vec::new(),
            notes: None,
        }
    }
}

/// Frozen variant choice of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSnapshot {
    /// Catalog id
    pub id: i64,
    /// Name at order time
    pub name: String,
    /// Price at order time
    pub price: Decimal,
}

/// A fully priced line, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    /// Catalog item
    pub menu_item_id: i64,
    /// Item name at order time
    pub item_name: String,
    /// Per-unit price after variant substitution
    pub unit_price: Decimal,
    /// Per-unit sum of modifier prices
    pub customization_amount: Decimal,
    /// Units ordered
    pub quantity: i32,
    /// `(unit_price + customization_amount) * quantity`
    pub total_price: Decimal,
    /// Variant applied, if any
    pub variant: Option<VariantSnapshot>,
    /// Modifiers applied
    pub modifiers: Vec<ModifierSnapshot>,
    /// Kitchen notes
    pub notes: Option<String>,
}

impl PricedLine {
    /// Builds the row to insert for this line.
    #[must_use]
    pub fn into_active_model(self, order_id: i64, now: DateTime<Utc>) -> order_item::ActiveModel {
        let (variant_id, variant_name, variant_price) = match self.variant {
            Some(v) => (Some(v.id), Some(v.name), Some(v.price)),
            None => (None, None, None),
        };
        order_item::ActiveModel {
            order_id: Set(order_id),
            menu_item_id: Set(self.menu_item_id),
            item_name: Set(self.item_name),
            unit_price: Set(self.unit_price),
            quantity: Set(self.quantity),
            customization_amount: Set(self.customization_amount),
            total_price: Set(self.total_price),
            variant_id: Set(variant_id),
            variant_name: Set(variant_name),
            variant_price: Set(variant_price),
            modifiers: Set(ModifierSnapshots(self.modifiers)),
            notes: Set(self.notes),
            created_at: Set(now),
            ..Default::default()
        }
    }
}

/// Validates the shape of a batch of line requests.
pub fn validate_lines(lines: &[LineRequest]) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation("order must contain at least one item"));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(Error::validation(format!(
                "quantity must be positive, got {} for menu item {}",
                line.quantity, line.menu_item_id
            )));
        }
        if line.quantity > MAX_QUANTITY {
            return Err(Error::validation(format!(
                "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {}",
                line.quantity
            )));
        }
    }
    Ok(())
}

/// Prices one line from already-resolved catalog rows.
///
/// `variant` is ignored unless it belongs to `item`.
#[must_use]
pub fn price_line(
    item: &menu_item::Model,
    variant: Option<&item_variant::Model>,
    modifiers: &[&modifier::Model],
    quantity: i32,
    notes: Option<String>,
) -> PricedLine {
    let variant = variant.filter(|v| v.menu_item_id == item.id);
    let unit_price = round_money(variant.map_or(item.price, |v| v.price));

    let modifiers: Vec<ModifierSnapshot> = modifiers
        .iter()
        .map(|m| ModifierSnapshot {
            id: m.id,
            name: m.name.clone(),
            price: round_money(m.price),
            group: m.group_name.clone(),
        })
        .collect();
    let customization_amount = modifiers.iter().map(|m| m.price).sum::<Decimal>();
    let total_price = round_money((unit_price + customization_amount) * Decimal::from(quantity));

    PricedLine {
        menu_item_id: item.id,
        item_name: item.name.clone(),
        unit_price,
        customization_amount,
        quantity,
        total_price,
        variant: variant.map(|v| VariantSnapshot {
            id: v.id,
            name: v.name.clone(),
            price: round_money(v.price),
        }),
        modifiers,
        notes,
    }
}

/// Prices every line against a loaded catalog.
pub fn price_lines(catalog: &CatalogSnapshot, lines: &[LineRequest]) -> Result<Vec<PricedLine>> {
    lines
        .iter()
        .map(|line| {
            let item = catalog
                .items
                .get(&line.menu_item_id)
                .ok_or(Error::NotFound {
                    entity: "menu item",
                    id: line.menu_item_id,
                })?;
            if !item.is_available {
                return Err(Error::validation(format!(
                    "menu item '{}' is not available",
                    item.name
                )));
            }
            let variant = line.variant_id.and_then(|id| catalog.variants.get(&id));
            let modifiers: Vec<&modifier::Model> = line
                .modifier_ids
                .iter()
                .filter_map(|id| catalog.modifiers.get(id))
                .collect();
            Ok(price_line(
                item,
                variant,
                &modifiers,
                line.quantity,
                line.notes.clone(),
            ))
        })
        .collect()
}

/// Validates, batch-loads and prices a set of line requests.
pub async fn resolve_lines<C>(
    db: &C,
    restaurant_id: i64,
    lines: &[LineRequest],
) -> Result<Vec<PricedLine>>
where
    C: ConnectionTrait,
{
    validate_lines(lines)?;
    let catalog = catalog::load_for_lines(db, restaurant_id, lines).await?;
    price_lines(&catalog, lines)
}

/// Sum of line totals.
#[must_use]
pub fn lines_subtotal(lines: &[PricedLine]) -> Decimal {
    round_money(lines.iter().map(|l| l.total_price).sum())
}
