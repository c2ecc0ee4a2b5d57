//! Sorting a monster's items into stat-block sections.
//!
//! Every non-spell item lands in exactly one [`FeatureCategory`]. Categories
//! are tried in [`FeatureCategory::ORDER`] and the first match wins; the
//! last category, equipment, matches anything.

use crate::format::squash;
use crate::i18n::Localization;
use crate::record::{ActivationType, Item, ItemId, ItemKind};
use serde::{Deserialize, Serialize};

/// Consumption target that marks a legendary resistance feature.
pub const LEGENDARY_RESISTANCE_TARGET: &str = "resources.legres.value";

/// Stat-block sections for non-spell items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureCategory {
    LegendaryResistance,
    LegendaryAction,
    LairAction,
    Multiattack,
    Casting,
    Reaction,
    Attack,
    Action,
    Feature,
    Equipment,
}

impl FeatureCategory {
    /// Priority order of the classification rules.
    pub const ORDER: [FeatureCategory; 10] = [
        FeatureCategory::LegendaryResistance,
        FeatureCategory::LegendaryAction,
        FeatureCategory::LairAction,
        FeatureCategory::Multiattack,
        FeatureCategory::Casting,
        FeatureCategory::Reaction,
        FeatureCategory::Attack,
        FeatureCategory::Action,
        FeatureCategory::Feature,
        FeatureCategory::Equipment,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FeatureCategory::LegendaryResistance => "legendary-resistance",
            FeatureCategory::LegendaryAction => "legendary-action",
            FeatureCategory::LairAction => "lair-action",
            FeatureCategory::Multiattack => "multiattack",
            FeatureCategory::Casting => "casting",
            FeatureCategory::Reaction => "reaction",
            FeatureCategory::Attack => "attack",
            FeatureCategory::Action => "action",
            FeatureCategory::Feature => "feature",
            FeatureCategory::Equipment => "equipment",
        }
    }

    /// Item type a new entry in this section should be created as.
    pub fn create_type(&self) -> &'static str {
        match self {
            FeatureCategory::Attack => "weapon",
            FeatureCategory::Equipment => "loot",
            _ => "feat",
        }
    }

    /// This category's rule, taken on its own.
    pub fn matches(&self, item: &Item, locale: &dyn Localization) -> bool {
        match self {
            FeatureCategory::LegendaryResistance => is_legendary_resistance(item),
            FeatureCategory::LegendaryAction => is_legendary_action(item),
            FeatureCategory::LairAction => is_lair_action(item),
            FeatureCategory::Multiattack => is_multiattack(item, locale),
            FeatureCategory::Casting => is_casting(item, locale),
            FeatureCategory::Reaction => is_reaction(item),
            FeatureCategory::Attack => matches!(item.kind, ItemKind::Weapon(_)),
            FeatureCategory::Action => is_action(item),
            FeatureCategory::Feature => matches!(item.kind, ItemKind::Feat),
            FeatureCategory::Equipment => true,
        }
    }

    /// The first category in priority order whose rule matches.
    pub fn of(item: &Item, locale: &dyn Localization) -> FeatureCategory {
        Self::ORDER
            .into_iter()
            .find(|category| category.matches(item, locale))
            .unwrap_or(FeatureCategory::Equipment)
    }
}

/// Item ids in one section, in record order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub category: FeatureCategory,
    pub items: Vec<ItemId>,
}

/// Every category's bucket, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBuckets {
    buckets: Vec<Bucket>,
}

impl CategoryBuckets {
    fn empty() -> Self {
        Self {
            buckets: FeatureCategory::ORDER
                .into_iter()
                .map(|category| Bucket {
                    category,
                    items: Vec::new(),
                })
                .collect(),
        }
    }

    fn push(&mut self, category: FeatureCategory, id: ItemId) {
        if let Some(bucket) = self.buckets.iter_mut().find(|b| b.category == category) {
            bucket.items.push(id);
        }
    }

    pub fn get(&self, category: FeatureCategory) -> &[ItemId] {
        self.buckets
            .iter()
            .find(|b| b.category == category)
            .map(|b| b.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    /// Which bucket holds an item, if any.
    pub fn category_of(&self, id: &ItemId) -> Option<FeatureCategory> {
        self.buckets
            .iter()
            .find(|b| b.items.contains(id))
            .map(|b| b.category)
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.items.len()).sum()
    }
}

/// Partition non-spell items into stat-block sections.
///
/// Spells are skipped; they belong to the spellbook.
pub fn classify_items<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    locale: &dyn Localization,
) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::empty();
    for item in items.into_iter().filter(|item| !item.is_spell()) {
        buckets.push(FeatureCategory::of(item, locale), item.id.clone());
    }
    buckets
}

// ============================================================================
// Item predicates
// ============================================================================

fn name_matches(item: &Item, locale: &dyn Localization, key: &str) -> bool {
    let name = squash(&item.name);
    locale
        .resolve_list(key)
        .iter()
        .any(|locator| !locator.is_empty() && name.contains(locator.as_str()))
}

pub fn is_legendary_resistance(item: &Item) -> bool {
    item.consume_target() == Some(LEGENDARY_RESISTANCE_TARGET)
}

pub fn is_legendary_action(item: &Item) -> bool {
    item.activation.kind == ActivationType::Legendary
}

pub fn is_lair_action(item: &Item) -> bool {
    item.activation.kind == ActivationType::Lair
}

pub fn is_reaction(item: &Item) -> bool {
    item.activation.kind == ActivationType::Reaction
}

/// Has an activation that is neither "none" nor a bonus action.
pub fn is_action(item: &Item) -> bool {
    !matches!(
        item.activation.kind,
        ActivationType::Unset | ActivationType::None | ActivationType::Bonus
    )
}

pub fn is_multiattack(item: &Item, locale: &dyn Localization) -> bool {
    name_matches(item, locale, "multiattack-locators")
}

/// Named like a spellcasting feature, and not an innate one.
pub fn is_spellcasting(item: &Item, locale: &dyn Localization) -> bool {
    !is_innate_spellcasting(item, locale) && name_matches(item, locale, "spellcasting-locators")
}

pub fn is_innate_spellcasting(item: &Item, locale: &dyn Localization) -> bool {
    name_matches(item, locale, "innate-casting-locators")
}

/// The description mentions warlock or pact magic.
pub fn is_pact_magic(item: &Item, locale: &dyn Localization) -> bool {
    let description = squash(&item.description);
    locale
        .resolve_list("warlock-locators")
        .iter()
        .any(|locator| !locator.is_empty() && description.contains(locator.as_str()))
}

pub fn is_casting(item: &Item, locale: &dyn Localization) -> bool {
    is_spellcasting(item, locale) || is_innate_spellcasting(item, locale)
}

/// Which kind of spellcasting a casting feature describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastingType {
    Standard,
    Innate,
    Pact,
}

impl CastingType {
    pub fn of(item: &Item, locale: &dyn Localization) -> CastingType {
        if !is_spellcasting(item, locale) {
            CastingType::Innate
        } else if is_pact_magic(item, locale) {
            CastingType::Pact
        } else {
            CastingType::Standard
        }
    }
}

/// Which special-action rules an action-like item also satisfies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMarkers {
    pub multiattack: bool,
    pub legendary: bool,
    pub lair: bool,
    pub legendary_resistance: bool,
    pub reaction: bool,
    /// Any of the above; such actions are listed in their own section only.
    pub special_action: bool,
}

impl ActionMarkers {
    pub fn of(item: &Item, locale: &dyn Localization) -> Self {
        let mut markers = Self {
            multiattack: is_multiattack(item, locale),
            legendary: is_legendary_action(item),
            lair: is_lair_action(item),
            legendary_resistance: is_legendary_resistance(item),
            reaction: is_reaction(item),
            special_action: false,
        };
        markers.special_action = markers.multiattack
            || markers.legendary
            || markers.lair
            || markers.legendary_resistance
            || markers.reaction;
        markers
    }
}
