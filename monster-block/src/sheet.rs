//! Sheet configuration and the view builder.
//!
//! [`ViewBuilder::build`] turns a [`CharacterRecord`] into a [`SheetView`]:
//! header rows, classified feature sections, spellbooks and the flags a
//! renderer needs. Every call starts from scratch and nothing is cached.

use crate::attack::{describe_attack, AttackDescription};
use crate::casting::{describe_casting, CastingDescription};
use crate::classify::{classify_items, ActionMarkers, FeatureCategory};
use crate::dice::{average_roll, DiceEvaluator, RollData, StandardEvaluator};
use crate::format::{format_challenge_rating, format_number_commas, signed};
use crate::i18n::{english, Localization};
use crate::notify::{Notifier, TracingNotifier};
use crate::record::{
    Ability, CharacterRecord, HitPoints, Item, ItemId, MovementKind, PreparationMode, ProficiencyLevel,
    SenseKind, Skill, TraitSet,
};
use crate::resources::{resource_summary, ResourceSummary};
use crate::spellbook::{build_spellbook, innate_spellbook, SpellbookSection, Stratum};
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Sheet themes and the CSS class each one applies.
pub const THEMES: [(&str, &str); 7] = [
    ("default", "default-theme"),
    ("foundry", "foundry-theme"),
    ("srd", "srd-theme"),
    ("dark", "dark-theme"),
    ("cool", "cool-theme"),
    ("hot", "hot-theme"),
    ("custom", ""),
];

/// Per-actor display flags, stored by the host under kebab-case keys.
///
/// Missing keys take their defaults, so a partial flag object from an
/// older sheet version still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SheetFlags {
    pub initialized: bool,
    pub editing: bool,
    pub show_delete: bool,
    pub show_bio: bool,
    pub show_resources: bool,
    pub show_not_prof: bool,
    pub show_skill_save: bool,
    pub show_lair_actions: bool,
    pub attack_descriptions: bool,
    pub casting_feature: bool,
    pub inline_secrets: bool,
    pub hidden_secrets: bool,
    pub current_hit_points: bool,
    pub maximum_hit_points: bool,
    pub hide_profile_image: bool,
    pub theme_choice: String,
    pub custom_theme_class: String,
    pub scale: f64,
    pub compact_window: bool,
    pub compact_feats: bool,
    pub compact_layout: bool,
    /// Base font size in pixels; the host's own size when unset.
    pub font_size: Option<f64>,
}

impl Default for SheetFlags {
    fn default() -> Self {
        Self {
            initialized: true,
            editing: true,
            show_delete: false,
            show_bio: false,
            show_resources: true,
            show_not_prof: false,
            show_skill_save: true,
            show_lair_actions: false,
            attack_descriptions: true,
            casting_feature: true,
            inline_secrets: false,
            hidden_secrets: false,
            current_hit_points: true,
            maximum_hit_points: false,
            hide_profile_image: false,
            theme_choice: "default".to_string(),
            custom_theme_class: String::new(),
            scale: 1.0,
            compact_window: true,
            compact_feats: true,
            compact_layout: false,
            font_size: None,
        }
    }
}

impl SheetFlags {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// CSS class for the chosen theme. Unknown themes fall back to the default.
    pub fn theme_class(&self) -> String {
        if self.theme_choice == "custom" {
            return self.custom_theme_class.clone();
        }
        THEMES
            .iter()
            .find(|(name, _)| *name == self.theme_choice)
            .map(|(_, class)| class.to_string())
            .unwrap_or_else(|| {
                tracing::debug!(theme = %self.theme_choice, "unknown theme, using default");
                THEMES[0].1.to_string()
            })
    }

    /// The flags as a given viewer sees them.
    ///
    /// Viewers who cannot edit never see editing controls, delete buttons
    /// only show while editing, and limited viewers always see the biography.
    pub fn effective(&self, options: &SheetOptions) -> SheetFlags {
        let mut flags = self.clone();
        if !options.owner || !options.editable {
            flags.editing = false;
        }
        if !flags.editing {
            flags.show_delete = false;
        }
        if options.limited {
            flags.show_bio = true;
        }
        flags
    }
}

/// What the current viewer may do with the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetOptions {
    pub owner: bool,
    pub editable: bool,
    pub limited: bool,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            owner: true,
            editable: true,
            limited: false,
        }
    }
}

/// Collaborators and settings for one build.
pub struct SheetContext<'a> {
    pub locale: &'a dyn Localization,
    pub evaluator: &'a dyn DiceEvaluator,
    pub notifier: &'a dyn Notifier,
    pub flags: SheetFlags,
    pub options: SheetOptions,
}

impl<'a> SheetContext<'a> {
    /// Context with the standard evaluator and a tracing notifier.
    pub fn new(locale: &'a dyn Localization) -> Self {
        Self {
            locale,
            evaluator: &StandardEvaluator,
            notifier: &TracingNotifier,
            flags: SheetFlags::default(),
            options: SheetOptions::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: &'a dyn DiceEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_flags(mut self, flags: SheetFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_options(mut self, options: SheetOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for SheetContext<'_> {
    fn default() -> Self {
        Self::new(english())
    }
}

// ============================================================================
// View types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    /// Challenge rating as printed, with fractions below 1 ("1/4").
    pub challenge: String,
    pub xp: u64,
    /// Experience points with thousands separators.
    pub xp_label: String,
    pub hp: HitPoints,
    /// Average of the hit-dice formula, 0 without one.
    pub hp_average: i64,
    /// Proficiency bonus with its sign, e.g. "+6".
    pub prof: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityRow {
    pub ability: Ability,
    pub label: String,
    pub abbr: String,
    pub value: i64,
    /// Signed modifier, e.g. "+8".
    pub modifier: String,
    /// Signed saving throw bonus.
    pub save: String,
    pub proficient: bool,
    /// Record path an edit of the score is written to.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRow {
    pub skill: Skill,
    pub label: String,
    pub ability_abbr: String,
    pub level: ProficiencyLevel,
    pub level_label: String,
    /// Signed skill bonus.
    pub total: String,
    /// Hidden unless proficient or the sheet shows every skill.
    pub visible: bool,
    /// Record path of the skill's proficiency value.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRow {
    pub name: MovementKind,
    pub label: String,
    /// Walking speed is printed without a label.
    pub show_label: bool,
    /// Blank when the creature lacks this movement.
    pub value: String,
    pub unit: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseRow {
    pub name: SenseKind,
    pub label: String,
    pub value: String,
    pub unit: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialSenses {
    /// Absent when the special senses text already lists it.
    pub passive_perception: Option<String>,
    pub special: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitRow {
    pub key: String,
    pub label: String,
    /// Localized names of the listed values.
    pub values: Vec<String>,
    /// Free text the host stores alongside the values.
    pub custom: String,
    /// Values and custom text joined for display.
    pub text: String,
}

/// One item as shown in a feature section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureView {
    pub id: ItemId,
    pub name: String,
    /// Item type id, e.g. "weapon".
    pub kind: String,
    pub description: String,
    pub resource: Option<ResourceSummary>,
    /// Set for items in the action-like sections.
    pub markers: Option<ActionMarkers>,
    pub attack: Option<AttackDescription>,
    pub casting: Option<CastingDescription>,
    pub recharge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSection {
    pub category: FeatureCategory,
    pub label: String,
    /// Item type the section's "add" control creates.
    pub create_type: String,
    pub items: Vec<FeatureView>,
}

/// Conditions the renderer branches on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub has_save_profs: bool,
    pub has_skills: bool,
    pub has_casting_feature: bool,
    pub is_spellcaster: bool,
    pub is_innate_spellcaster: bool,
    pub is_warlock: bool,
    pub has_at_will_spells: bool,
    pub has_legendary_actions: bool,
    pub has_lair: bool,
    pub has_reactions: bool,
    pub has_loot: bool,
}

/// Everything a renderer needs to draw the stat block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetView {
    pub header: Header,
    pub abilities: Vec<AbilityRow>,
    pub skills: Vec<SkillRow>,
    pub movement: Vec<MovementRow>,
    pub senses: Vec<SenseRow>,
    pub special_senses: SpecialSenses,
    pub traits: Vec<TraitRow>,
    pub features: Vec<FeatureSection>,
    pub spellbook: Vec<SpellbookSection>,
    pub innate_spellbook: Vec<Stratum>,
    pub info: SheetInfo,
    /// Flags as the current viewer sees them.
    pub flags: SheetFlags,
    pub theme_class: String,
    pub not_owner: bool,
    pub limited: bool,
}

impl SheetView {
    pub fn section(&self, category: FeatureCategory) -> Option<&FeatureSection> {
        self.features.iter().find(|s| s.category == category)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct ViewBuilder<'a> {
    ctx: SheetContext<'a>,
}

impl Default for ViewBuilder<'_> {
    fn default() -> Self {
        Self::new(SheetContext::default())
    }
}

impl<'a> ViewBuilder<'a> {
    pub fn new(ctx: SheetContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn build(&self, record: &CharacterRecord) -> SheetView {
        tracing::debug!(actor = %record.name, items = record.items.len(), "building sheet view");
        let locale = self.ctx.locale;

        let spellbook = build_spellbook(record, locale);
        let innate = innate_spellbook(&spellbook, locale);
        let features = self.features(record, &spellbook);
        let info = sheet_info(record, &features);
        let flags = self.ctx.flags.effective(&self.ctx.options);

        SheetView {
            header: self.header(record),
            abilities: ability_rows(record, locale),
            skills: skill_rows(record, &flags, locale),
            movement: movement_rows(record, locale),
            senses: sense_rows(record, locale),
            special_senses: special_senses(record, locale),
            traits: trait_rows(record, locale),
            features,
            spellbook,
            innate_spellbook: innate,
            info,
            theme_class: flags.theme_class(),
            flags,
            not_owner: !self.ctx.options.owner,
            limited: self.ctx.options.limited,
        }
    }

    fn header(&self, record: &CharacterRecord) -> Header {
        let hp = record.attributes.hp.clone();
        let formula = Some(hp.formula.as_str()).filter(|f| !f.is_empty());
        let hp_average = average_roll(
            formula,
            &RollData::from_record(record),
            self.ctx.evaluator,
            self.ctx.notifier,
        );
        let xp = record.xp();
        Header {
            name: record.name.clone(),
            challenge: format_challenge_rating(record.details.cr),
            xp,
            xp_label: format_number_commas(xp),
            hp,
            hp_average,
            prof: signed(record.attributes.prof),
        }
    }

    fn features(&self, record: &CharacterRecord, spellbook: &[SpellbookSection]) -> Vec<FeatureSection> {
        let locale = self.ctx.locale;
        let buckets = classify_items(&record.items, locale);
        buckets
            .iter()
            .map(|bucket| FeatureSection {
                category: bucket.category,
                label: locale.resolve(&format!("category.{}", bucket.category.key())),
                create_type: bucket.category.create_type().to_string(),
                items: bucket
                    .items
                    .iter()
                    .filter_map(|id| record.item(id))
                    .map(|item| self.feature(item, bucket.category, record, spellbook))
                    .collect(),
            })
            .collect()
    }

    fn feature(
        &self,
        item: &Item,
        category: FeatureCategory,
        record: &CharacterRecord,
        spellbook: &[SpellbookSection],
    ) -> FeatureView {
        let locale = self.ctx.locale;
        let markers = match category {
            FeatureCategory::LegendaryAction
            | FeatureCategory::LairAction
            | FeatureCategory::Multiattack
            | FeatureCategory::Reaction
            | FeatureCategory::Action => Some(ActionMarkers::of(item, locale)),
            _ => None,
        };
        let attack = match category {
            FeatureCategory::Attack => describe_attack(item, record, &self.ctx),
            _ => None,
        };
        let casting = match category {
            FeatureCategory::Casting => describe_casting(item, record, spellbook, &self.ctx),
            _ => None,
        };

        FeatureView {
            id: item.id.clone(),
            name: item.name.clone(),
            kind: item.kind.id().to_string(),
            description: item.description.clone(),
            resource: resource_summary(item, record, locale),
            markers,
            attack,
            casting,
            recharge: recharge_label(item, locale),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

fn ability_rows(record: &CharacterRecord, locale: &dyn Localization) -> Vec<AbilityRow> {
    Ability::all()
        .into_iter()
        .map(|ability| {
            let score = record.ability(ability);
            AbilityRow {
                ability,
                label: locale.resolve(&format!("ability.{}", ability.id())),
                abbr: locale.resolve(&format!("ability-abbr.{}", ability.id())),
                value: score.value,
                modifier: signed(score.modifier()),
                save: signed(score.save(record.attributes.prof)),
                proficient: score.proficient,
                key: format!("abilities.{}.value", ability.id()),
            }
        })
        .collect()
}

fn skill_rows(record: &CharacterRecord, flags: &SheetFlags, locale: &dyn Localization) -> Vec<SkillRow> {
    Skill::ALL
        .into_iter()
        .map(|skill| {
            let entry = record.skills.get(&skill).cloned().unwrap_or_default();
            let ability = entry.ability.unwrap_or_else(|| skill.ability());
            SkillRow {
                skill,
                label: locale.resolve(&format!("skill.{}", skill.id())),
                ability_abbr: locale.resolve(&format!("ability-abbr.{}", ability.id())),
                level: entry.value,
                level_label: locale.resolve(&format!("proficiency.{}", entry.value.key())),
                total: signed(record.skill_total(skill)),
                visible: entry.value != ProficiencyLevel::None || flags.show_not_prof,
                key: format!("skills.{}.value", skill.id()),
            }
        })
        .collect()
}

/// Movement rows in stat-block order. Walk carries no label and fly reads
/// as hover for hovering creatures.
pub fn movement_rows(record: &CharacterRecord, locale: &dyn Localization) -> Vec<MovementRow> {
    let movement = &record.attributes.movement;
    let unit = format!("{}{}", movement.units, locale.resolve("speed-unit-suffix"));
    MovementKind::ORDER
        .into_iter()
        .map(|kind| {
            let label_key = if kind == MovementKind::Fly && movement.hover {
                "movement.hover".to_string()
            } else {
                format!("movement.{}", kind.id())
            };
            let speed = movement.speed(kind);
            MovementRow {
                name: kind,
                label: locale.resolve(&label_key).to_lowercase(),
                show_label: kind != MovementKind::Walk,
                value: blank_if_zero(speed),
                unit: unit.clone(),
                key: format!("attributes.movement.{}", kind.id()),
            }
        })
        .collect()
}

pub fn sense_rows(record: &CharacterRecord, locale: &dyn Localization) -> Vec<SenseRow> {
    let senses = &record.attributes.senses;
    let unit = format!("{}{}", senses.units, locale.resolve("speed-unit-suffix"));
    SenseKind::ORDER
        .into_iter()
        .map(|kind| SenseRow {
            name: kind,
            label: locale.resolve(&format!("sense.{}", kind.id())).to_lowercase(),
            value: blank_if_zero(senses.range(kind)),
            unit: unit.clone(),
            key: format!("attributes.senses.{}", kind.id()),
        })
        .collect()
}

fn special_senses(record: &CharacterRecord, locale: &dyn Localization) -> SpecialSenses {
    let special = record.attributes.senses.special.clone();
    let locator = locale.resolve("perception-locator").to_lowercase();
    let listed = !locator.is_empty() && special.to_lowercase().contains(&locator);
    SpecialSenses {
        passive_perception: (!listed).then(|| {
            locale.format(
                "passive-perception",
                &[("pp", record.passive_perception().to_string())],
            )
        }),
        special,
    }
}

fn blank_if_zero(value: u32) -> String {
    if value > 0 {
        value.to_string()
    } else {
        String::new()
    }
}

fn trait_rows(record: &CharacterRecord, locale: &dyn Localization) -> Vec<TraitRow> {
    let traits = &record.traits;
    [
        ("dv", &traits.dv, "damage"),
        ("dr", &traits.dr, "damage"),
        ("di", &traits.di, "damage"),
        ("ci", &traits.ci, "condition"),
        ("languages", &traits.languages, "language"),
    ]
    .into_iter()
    .map(|(key, set, prefix)| trait_row(key, set, prefix, locale))
    .collect()
}

fn trait_row(key: &str, set: &TraitSet, prefix: &str, locale: &dyn Localization) -> TraitRow {
    let values: Vec<String> = set
        .value
        .iter()
        .map(|value| {
            if prefix == "damage" && value == "physical" {
                locale.resolve("physical-damage")
            } else {
                locale.resolve(&format!("{prefix}.{value}"))
            }
        })
        .collect();
    let mut text = values.join(", ");
    if !set.custom.is_empty() {
        if !text.is_empty() {
            text.push_str("; ");
        }
        text.push_str(&set.custom);
    }
    TraitRow {
        key: format!("traits.{key}"),
        label: locale.resolve(&format!("trait.{key}")),
        values,
        custom: set.custom.clone(),
        text,
    }
}

/// "Recharge 5-6", or "Recharge 6" for a single face.
fn recharge_label(item: &Item, locale: &dyn Localization) -> Option<String> {
    let value = item.recharge.as_ref()?.value?;
    let range = if value >= 6 {
        "6".to_string()
    } else {
        format!("{value}-6")
    };
    Some(locale.format("recharge", &[("range", range)]))
}

fn sheet_info(record: &CharacterRecord, features: &[FeatureSection]) -> SheetInfo {
    let has_items = |category: FeatureCategory| {
        features
            .iter()
            .any(|section| section.category == category && !section.items.is_empty())
    };
    let has_mode = |mode: PreparationMode| {
        record
            .spells()
            .filter_map(|item| item.spell())
            .any(|spell| spell.preparation == mode)
    };

    SheetInfo {
        has_save_profs: record.abilities.values().any(|score| score.proficient),
        has_skills: record
            .skills
            .values()
            .any(|entry| entry.value != ProficiencyLevel::None),
        has_casting_feature: has_items(FeatureCategory::Casting),
        is_spellcaster: record.spells().filter_map(|item| item.spell()).any(|spell| {
            spell.level > 0
                && matches!(spell.preparation, PreparationMode::Prepared | PreparationMode::Always)
        }),
        is_innate_spellcaster: has_mode(PreparationMode::Innate),
        is_warlock: has_mode(PreparationMode::Pact),
        has_at_will_spells: has_mode(PreparationMode::Atwill),
        has_legendary_actions: has_items(FeatureCategory::LegendaryAction),
        has_lair: has_items(FeatureCategory::LairAction),
        has_reactions: has_items(FeatureCategory::Reaction),
        has_loot: has_items(FeatureCategory::Equipment),
    }
}
