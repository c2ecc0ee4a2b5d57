//! Resource counters shown next to items (charges, ammunition, quantities).

use crate::i18n::Localization;
use crate::record::{CharacterRecord, ConsumeKind, Item, ItemId, ItemKind};
use serde::{Deserialize, Serialize};

/// Where an item's displayed counter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A counter on the record itself, such as legendary resistances.
    Attribute,
    /// The item's own uses.
    Charges,
    /// Quantity of another item spent as a material.
    Material,
    /// Quantity of another item spent as ammunition.
    Ammo,
    /// The item's own quantity.
    Consume,
    /// A consumption target with no consumption type.
    Untyped,
}

/// Display data for an item's resource counter.
///
/// `target` is the path an edit to `current` should be written to, on the
/// record for attributes or on `entity` otherwise. Lookups that fail leave
/// fields empty instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub item_id: ItemId,
    pub kind: ResourceKind,
    pub current: Option<i64>,
    /// Maximum, when one is shown.
    pub limit: Option<i64>,
    pub target: Option<String>,
    pub entity: Option<ItemId>,
    pub limit_target: Option<String>,
    pub refresh: Option<String>,
    /// Name of the referenced ammunition or material item.
    pub name: Option<String>,
}

impl ResourceSummary {
    fn new(item: &Item, kind: ResourceKind) -> Self {
        Self {
            item_id: item.id.clone(),
            kind,
            current: None,
            limit: None,
            target: None,
            entity: None,
            limit_target: None,
            refresh: None,
            name: None,
        }
    }

    /// Whether the counter resolved to a value.
    pub fn is_complete(&self) -> bool {
        self.current.is_some() && self.target.is_some()
    }
}

/// Whether an item shows a resource counter at all.
pub fn has_resource(item: &Item) -> bool {
    item.consume_target().is_some()
        || matches!(item.kind, ItemKind::Consumable | ItemKind::Loot)
        || item.uses.as_ref().and_then(|u| u.declared_max()).is_some()
}

/// Which kind of counter an item shows, by priority.
pub fn resource_kind(item: &Item) -> Option<ResourceKind> {
    if !has_resource(item) {
        return None;
    }
    if matches!(item.kind, ItemKind::Consumable | ItemKind::Loot) {
        return Some(ResourceKind::Consume);
    }
    if item.uses.as_ref().and_then(|u| u.declared_max()).is_some() {
        return Some(ResourceKind::Charges);
    }
    let kind = match item.consume.as_ref().map(|c| c.kind) {
        Some(ConsumeKind::Attribute) => ResourceKind::Attribute,
        Some(ConsumeKind::Charges) => ResourceKind::Charges,
        Some(ConsumeKind::Material) => ResourceKind::Material,
        Some(ConsumeKind::Ammo) => ResourceKind::Ammo,
        Some(ConsumeKind::Unset) | None => ResourceKind::Untyped,
    };
    Some(kind)
}

/// Build the resource counter for an item, if it has one.
pub fn resource_summary(
    item: &Item,
    record: &CharacterRecord,
    locale: &dyn Localization,
) -> Option<ResourceSummary> {
    let kind = resource_kind(item)?;
    let mut summary = ResourceSummary::new(item, kind);

    match kind {
        ResourceKind::Attribute => {
            let target = item.consume_target().unwrap_or_default();
            match split_attribute_path(target) {
                Some((group, key)) => {
                    summary.current = record.lookup(target).and_then(|v| v.as_i64());
                    summary.limit = record
                        .lookup(&format!("{group}.{key}.max"))
                        .and_then(|v| v.as_i64());
                    summary.target = Some(target.to_string());
                    summary.refresh = Some(locale.resolve("resource-refresh"));
                }
                None => {
                    tracing::debug!(item = %item.id, path = target, "attribute target is not a group.key.field path");
                }
            }
        }
        ResourceKind::Charges => {
            let uses = item.uses.clone().unwrap_or_default();
            summary.target = Some("uses.value".to_string());
            summary.entity = Some(
                item.consume_target()
                    .map(ItemId::new)
                    .unwrap_or_else(|| item.id.clone()),
            );
            summary.current = uses.value;
            summary.limit = if item.is_spell() { None } else { uses.max };
            summary.limit_target = Some("uses.max".to_string());
            summary.refresh = uses.per.map(|per| locale.resolve(&format!("period.{}", per.id())));
        }
        ResourceKind::Material | ResourceKind::Ammo => {
            let entity = ItemId::new(item.consume_target().unwrap_or_default());
            match record.item(&entity) {
                Some(ammo) => {
                    summary.current = Some(ammo.quantity);
                    summary.target = Some("quantity".to_string());
                    summary.name = Some(ammo.name.clone());
                }
                None => {
                    tracing::debug!(item = %item.id, missing = %entity, "consumed item not found");
                }
            }
            summary.entity = Some(entity);
        }
        ResourceKind::Consume => {
            summary.entity = Some(item.id.clone());
            summary.current = Some(item.quantity);
            summary.target = Some("quantity".to_string());
        }
        ResourceKind::Untyped => {
            tracing::debug!(item = %item.id, "consumption target without a consumption type");
        }
    }

    Some(summary)
}

lazy_static::lazy_static! {
    static ref ATTRIBUTE_PATH: regex::Regex =
        regex::Regex::new(r"^(.+)\.(.+)\.(.+)$").expect("attribute path pattern is valid");
}

/// `resources.legres.value` splits into `("resources", "legres")`.
fn split_attribute_path(path: &str) -> Option<(String, String)> {
    let caps = ATTRIBUTE_PATH.captures(path)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}
