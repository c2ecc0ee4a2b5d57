//! Typed monster records as read from the document store.
//!
//! Records arrive as JSON. [`CharacterRecord::from_json`] is the boundary:
//! anything past it is a well-formed record the view builder can trust.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Errors from reading a record at the data-store boundary.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Malformed record JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate item id: {0}")]
    DuplicateItemId(ItemId),
    #[error("Item {0} has an empty name")]
    UnnamedItem(ItemId),
}

// ============================================================================
// Identifiers
// ============================================================================

/// Document id of an owned item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Abilities
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    #[serde(rename = "str")]
    Strength,
    #[serde(rename = "dex")]
    Dexterity,
    #[serde(rename = "con")]
    Constitution,
    #[serde(rename = "int")]
    Intelligence,
    #[serde(rename = "wis")]
    Wisdom,
    #[serde(rename = "cha")]
    Charisma,
}

impl Ability {
    /// Short id used in data paths and locale keys.
    pub fn id(&self) -> &'static str {
        match self {
            Ability::Strength => "str",
            Ability::Dexterity => "dex",
            Ability::Constitution => "con",
            Ability::Intelligence => "int",
            Ability::Wisdom => "wis",
            Ability::Charisma => "cha",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One ability score with its save proficiency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityScore {
    #[serde(default = "default_score")]
    pub value: i64,
    /// Modifier stored by the host; the score decides when absent.
    #[serde(default, rename = "mod", skip_serializing_if = "Option::is_none")]
    pub modifier: Option<i64>,
    /// Proficient in saving throws with this ability.
    #[serde(default)]
    pub proficient: bool,
}

fn default_score() -> i64 {
    10
}

impl AbilityScore {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            modifier: None,
            proficient: false,
        }
    }

    pub fn proficient(mut self) -> Self {
        self.proficient = true;
        self
    }

    /// The stored modifier, or the one implied by the score.
    pub fn modifier(&self) -> i64 {
        // Floor division: 8-9 = -1, 10-11 = 0, 12-13 = +1
        self.modifier.unwrap_or_else(|| (self.value - 10).div_euclid(2))
    }

    pub fn save(&self, proficiency_bonus: i64) -> i64 {
        self.modifier() + if self.proficient { proficiency_bonus } else { 0 }
    }
}

impl Default for AbilityScore {
    fn default() -> Self {
        Self::new(10)
    }
}

// ============================================================================
// Skills
// ============================================================================

/// D&D 5e skills, keyed by their short data id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    #[serde(rename = "acr")]
    Acrobatics,
    #[serde(rename = "ani")]
    AnimalHandling,
    #[serde(rename = "arc")]
    Arcana,
    #[serde(rename = "ath")]
    Athletics,
    #[serde(rename = "dec")]
    Deception,
    #[serde(rename = "his")]
    History,
    #[serde(rename = "ins")]
    Insight,
    #[serde(rename = "itm")]
    Intimidation,
    #[serde(rename = "inv")]
    Investigation,
    #[serde(rename = "med")]
    Medicine,
    #[serde(rename = "nat")]
    Nature,
    #[serde(rename = "prc")]
    Perception,
    #[serde(rename = "prf")]
    Performance,
    #[serde(rename = "per")]
    Persuasion,
    #[serde(rename = "rel")]
    Religion,
    #[serde(rename = "slt")]
    SleightOfHand,
    #[serde(rename = "ste")]
    Stealth,
    #[serde(rename = "sur")]
    Survival,
}

impl Skill {
    pub const ALL: [Skill; 18] = [
        Skill::Acrobatics,
        Skill::AnimalHandling,
        Skill::Arcana,
        Skill::Athletics,
        Skill::Deception,
        Skill::History,
        Skill::Insight,
        Skill::Intimidation,
        Skill::Investigation,
        Skill::Medicine,
        Skill::Nature,
        Skill::Perception,
        Skill::Performance,
        Skill::Persuasion,
        Skill::Religion,
        Skill::SleightOfHand,
        Skill::Stealth,
        Skill::Survival,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Skill::Acrobatics => "acr",
            Skill::AnimalHandling => "ani",
            Skill::Arcana => "arc",
            Skill::Athletics => "ath",
            Skill::Deception => "dec",
            Skill::History => "his",
            Skill::Insight => "ins",
            Skill::Intimidation => "itm",
            Skill::Investigation => "inv",
            Skill::Medicine => "med",
            Skill::Nature => "nat",
            Skill::Perception => "prc",
            Skill::Performance => "prf",
            Skill::Persuasion => "per",
            Skill::Religion => "rel",
            Skill::SleightOfHand => "slt",
            Skill::Stealth => "ste",
            Skill::Survival => "sur",
        }
    }

    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Proficiency level for skills, stored as a multiplier of the proficiency bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "f64", into = "f64")]
pub enum ProficiencyLevel {
    #[default]
    None,
    Half,
    Proficient,
    Expertise,
}

impl ProficiencyLevel {
    pub fn multiplier(&self) -> f64 {
        match self {
            ProficiencyLevel::None => 0.0,
            ProficiencyLevel::Half => 0.5,
            ProficiencyLevel::Proficient => 1.0,
            ProficiencyLevel::Expertise => 2.0,
        }
    }

    pub fn bonus(&self, proficiency_bonus: i64) -> i64 {
        match self {
            ProficiencyLevel::None => 0,
            ProficiencyLevel::Half => proficiency_bonus.div_euclid(2),
            ProficiencyLevel::Proficient => proficiency_bonus,
            ProficiencyLevel::Expertise => proficiency_bonus * 2,
        }
    }

    /// Next level when the sheet's proficiency toggle is clicked.
    pub fn cycle(&self) -> ProficiencyLevel {
        match self {
            ProficiencyLevel::None => ProficiencyLevel::Proficient,
            ProficiencyLevel::Proficient => ProficiencyLevel::Expertise,
            ProficiencyLevel::Expertise => ProficiencyLevel::Half,
            ProficiencyLevel::Half => ProficiencyLevel::None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ProficiencyLevel::None => "none",
            ProficiencyLevel::Half => "half",
            ProficiencyLevel::Proficient => "proficient",
            ProficiencyLevel::Expertise => "expertise",
        }
    }
}

impl From<f64> for ProficiencyLevel {
    fn from(value: f64) -> Self {
        if value >= 2.0 {
            ProficiencyLevel::Expertise
        } else if value >= 1.0 {
            ProficiencyLevel::Proficient
        } else if value > 0.0 {
            ProficiencyLevel::Half
        } else {
            ProficiencyLevel::None
        }
    }
}

impl From<ProficiencyLevel> for f64 {
    fn from(level: ProficiencyLevel) -> Self {
        level.multiplier()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillEntry {
    #[serde(default)]
    pub value: ProficiencyLevel,
    /// Overrides the skill's usual ability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<Ability>,
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub max: i64,
    /// Hit dice, e.g. `19d12+133`.
    #[serde(default)]
    pub formula: String,
}

/// Movement speeds. Zero means the creature lacks that movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    #[serde(default)]
    pub walk: u32,
    #[serde(default)]
    pub burrow: u32,
    #[serde(default)]
    pub climb: u32,
    #[serde(default)]
    pub fly: u32,
    #[serde(default)]
    pub swim: u32,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default)]
    pub hover: bool,
}

fn default_units() -> String {
    "ft".to_string()
}

impl Movement {
    pub fn new(walk: u32) -> Self {
        Self {
            walk,
            ..Self::default()
        }
    }

    pub fn speed(&self, kind: MovementKind) -> u32 {
        match kind {
            MovementKind::Walk => self.walk,
            MovementKind::Burrow => self.burrow,
            MovementKind::Climb => self.climb,
            MovementKind::Fly => self.fly,
            MovementKind::Swim => self.swim,
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            walk: 30,
            burrow: 0,
            climb: 0,
            fly: 0,
            swim: 0,
            units: default_units(),
            hover: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Walk,
    Burrow,
    Climb,
    Fly,
    Swim,
}

impl MovementKind {
    /// Display order on the stat block.
    pub const ORDER: [MovementKind; 5] = [
        MovementKind::Walk,
        MovementKind::Burrow,
        MovementKind::Climb,
        MovementKind::Fly,
        MovementKind::Swim,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            MovementKind::Walk => "walk",
            MovementKind::Burrow => "burrow",
            MovementKind::Climb => "climb",
            MovementKind::Fly => "fly",
            MovementKind::Swim => "swim",
        }
    }
}

/// Sense ranges plus free text for anything unusual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Senses {
    #[serde(default)]
    pub blindsight: u32,
    #[serde(default)]
    pub darkvision: u32,
    #[serde(default)]
    pub tremorsense: u32,
    #[serde(default)]
    pub truesight: u32,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default)]
    pub special: String,
}

impl Default for Senses {
    fn default() -> Self {
        Self {
            blindsight: 0,
            darkvision: 0,
            tremorsense: 0,
            truesight: 0,
            units: default_units(),
            special: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenseKind {
    Blindsight,
    Darkvision,
    Tremorsense,
    Truesight,
}

impl SenseKind {
    pub const ORDER: [SenseKind; 4] = [
        SenseKind::Blindsight,
        SenseKind::Darkvision,
        SenseKind::Tremorsense,
        SenseKind::Truesight,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SenseKind::Blindsight => "blindsight",
            SenseKind::Darkvision => "darkvision",
            SenseKind::Tremorsense => "tremorsense",
            SenseKind::Truesight => "truesight",
        }
    }
}

impl Senses {
    pub fn range(&self, kind: SenseKind) -> u32 {
        match kind {
            SenseKind::Blindsight => self.blindsight,
            SenseKind::Darkvision => self.darkvision,
            SenseKind::Tremorsense => self.tremorsense,
            SenseKind::Truesight => self.truesight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default)]
    pub hp: HitPoints,
    #[serde(default)]
    pub movement: Movement,
    #[serde(default)]
    pub senses: Senses,
    /// Proficiency bonus.
    #[serde(default = "default_prof")]
    pub prof: i64,
    /// Spell save DC.
    #[serde(default)]
    pub spelldc: i64,
    /// Spellcasting ability; intelligence when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spellcasting: Option<Ability>,
}

fn default_prof() -> i64 {
    2
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            hp: HitPoints::default(),
            movement: Movement::default(),
            senses: Senses::default(),
            prof: default_prof(),
            spelldc: 10,
            spellcasting: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Details {
    /// Challenge rating; fractions are stored as 0.125, 0.25 and 0.5.
    #[serde(default)]
    pub cr: f64,
    /// Experience value; derived from the challenge rating when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    /// Caster level used in "is a 9th-level spellcaster".
    #[serde(default)]
    pub spell_level: u32,
}

/// A tracked counter such as legendary actions remaining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValue {
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub max: i64,
}

/// Spell slots for one level (or the pact pool).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlot {
    /// Slots remaining.
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub max: i64,
    /// Manual maximum that replaces `max`.
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_max: Option<i64>,
    /// Slot level; only meaningful for the pact pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

impl SpellSlot {
    pub fn slots(&self) -> i64 {
        self.override_max.unwrap_or(self.max)
    }
}

/// Selected trait ids plus free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraitSet {
    #[serde(default)]
    pub value: Vec<String>,
    #[serde(default)]
    pub custom: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Traits {
    #[serde(default)]
    pub di: TraitSet,
    #[serde(default)]
    pub dr: TraitSet,
    #[serde(default)]
    pub dv: TraitSet,
    #[serde(default)]
    pub ci: TraitSet,
    #[serde(default)]
    pub languages: TraitSet,
}

// ============================================================================
// Items
// ============================================================================

/// How an item is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    /// No activation recorded at all.
    #[default]
    #[serde(rename = "")]
    Unset,
    None,
    Action,
    Bonus,
    Reaction,
    Minute,
    Hour,
    Day,
    Special,
    Legendary,
    Lair,
    Crew,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Activation {
    #[serde(default, rename = "type")]
    pub kind: ActivationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
    /// Free text such as "one creature it is grappling"; replaces the
    /// attack's target text when set.
    #[serde(default)]
    pub condition: String,
}

impl Activation {
    pub fn of(kind: ActivationType) -> Self {
        Self {
            kind,
            cost: None,
            condition: String::new(),
        }
    }
}

/// What an item spends when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumeKind {
    #[default]
    #[serde(rename = "")]
    Unset,
    Attribute,
    Charges,
    Material,
    Ammo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Consume {
    #[serde(default, rename = "type")]
    pub kind: ConsumeKind,
    /// A dotted record path for attributes, otherwise the id of the
    /// consumed item.
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

impl Consume {
    pub fn new(kind: ConsumeKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            amount: Some(1),
        }
    }
}

/// Recovery period for limited uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsePeriod {
    Sr,
    Lr,
    Day,
    Charges,
}

impl UsePeriod {
    pub fn id(&self) -> &'static str {
        match self {
            UsePeriod::Sr => "sr",
            UsePeriod::Lr => "lr",
            UsePeriod::Day => "day",
            UsePeriod::Charges => "charges",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Uses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per: Option<UsePeriod>,
}

impl Uses {
    pub fn per_day(max: i64) -> Self {
        Self {
            value: Some(max),
            max: Some(max),
            per: Some(UsePeriod::Day),
        }
    }

    /// A declared, non-zero maximum.
    pub fn declared_max(&self) -> Option<i64> {
        self.max.filter(|max| *max != 0)
    }
}

/// "Recharge 5-6" style abilities.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Recharge {
    /// Lowest d6 face that recharges the ability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    /// Ready to use.
    #[serde(default)]
    pub charged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Mwak,
    Rwak,
    Msak,
    Rsak,
    Save,
    Heal,
    Util,
    #[default]
    Other,
}

impl ActionType {
    pub fn id(&self) -> &'static str {
        match self {
            ActionType::Mwak => "mwak",
            ActionType::Rwak => "rwak",
            ActionType::Msak => "msak",
            ActionType::Rsak => "rsak",
            ActionType::Save => "save",
            ActionType::Heal => "heal",
            ActionType::Util => "util",
            ActionType::Other => "other",
        }
    }

    pub fn is_ranged(&self) -> bool {
        matches!(self, ActionType::Rwak | ActionType::Rsak)
    }

    pub fn is_spell_attack(&self) -> bool {
        matches!(self, ActionType::Msak | ActionType::Rsak)
    }
}

/// One damage roll: formula plus damage type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct DamagePart {
    pub formula: String,
    pub damage_type: String,
}

impl DamagePart {
    pub fn new(formula: impl Into<String>, damage_type: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            damage_type: damage_type.into(),
        }
    }
}

impl From<(String, String)> for DamagePart {
    fn from((formula, damage_type): (String, String)) -> Self {
        Self {
            formula,
            damage_type,
        }
    }
}

impl From<DamagePart> for (String, String) {
    fn from(part: DamagePart) -> Self {
        (part.formula, part.damage_type)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Damage {
    #[serde(default)]
    pub parts: Vec<DamagePart>,
    #[serde(default)]
    pub versatile: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<u32>,
    #[serde(default)]
    pub units: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WeaponProperties {
    #[serde(default, rename = "thr")]
    pub thrown: bool,
    #[serde(default, rename = "fin")]
    pub finesse: bool,
    #[serde(default, rename = "ver")]
    pub versatile: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponData {
    #[serde(default)]
    pub action_type: ActionType,
    #[serde(default)]
    pub damage: Damage,
    #[serde(default)]
    pub range: Range,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub properties: WeaponProperties,
    /// Flat bonus added to the to-hit on top of ability and proficiency.
    #[serde(default)]
    pub attack_bonus: i64,
    #[serde(default = "default_true")]
    pub proficient: bool,
    /// Attack ability override; otherwise picked by finesse and range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<Ability>,
}

fn default_true() -> bool {
    true
}

impl Default for WeaponData {
    fn default() -> Self {
        Self {
            action_type: ActionType::Mwak,
            damage: Damage::default(),
            range: Range::default(),
            target: Target::default(),
            properties: WeaponProperties::default(),
            attack_bonus: 0,
            proficient: true,
            ability: None,
        }
    }
}

/// How a spell is made available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreparationMode {
    #[default]
    Prepared,
    Always,
    Innate,
    Pact,
    Atwill,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellData {
    /// Spell level; 0 for cantrips.
    #[serde(default)]
    pub level: u8,
    /// Decides the spellbook section.
    #[serde(default)]
    pub preparation: PreparationMode,
    /// Casting ability when it differs from the record's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<Ability>,
}

impl SpellData {
    pub fn new(level: u8, preparation: PreparationMode) -> Self {
        Self {
            level,
            preparation,
            ability: None,
        }
    }
}

/// The kind-specific part of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Weapon(WeaponData),
    Spell(SpellData),
    Feat,
    Consumable,
    Loot,
    Equipment,
}

impl ItemKind {
    pub fn id(&self) -> &'static str {
        match self {
            ItemKind::Weapon(_) => "weapon",
            ItemKind::Spell(_) => "spell",
            ItemKind::Feat => "feat",
            ItemKind::Consumable => "consumable",
            ItemKind::Loot => "loot",
            ItemKind::Equipment => "equipment",
        }
    }
}

/// An owned item: weapon, spell, feature or piece of gear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// HTML description.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consume: Option<Consume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<Uses>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recharge: Option<Recharge>,
    #[serde(flatten)]
    pub kind: ItemKind,
}

fn default_quantity() -> i64 {
    1
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
            description: String::new(),
            activation: Activation::default(),
            consume: None,
            uses: None,
            quantity: 1,
            recharge: None,
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_activation(mut self, kind: ActivationType) -> Self {
        self.activation.kind = kind;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.activation.condition = condition.into();
        self
    }

    pub fn with_consume(mut self, consume: Consume) -> Self {
        self.consume = Some(consume);
        self
    }

    pub fn with_uses(mut self, uses: Uses) -> Self {
        self.uses = Some(uses);
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_recharge(mut self, value: u8) -> Self {
        self.recharge = Some(Recharge {
            value: Some(value),
            charged: true,
        });
        self
    }

    pub fn weapon(&self) -> Option<&WeaponData> {
        match &self.kind {
            ItemKind::Weapon(data) => Some(data),
            _ => None,
        }
    }

    pub fn spell(&self) -> Option<&SpellData> {
        match &self.kind {
            ItemKind::Spell(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_spell(&self) -> bool {
        matches!(self.kind, ItemKind::Spell(_))
    }

    /// The consumption target, if one is actually set.
    pub fn consume_target(&self) -> Option<&str> {
        self.consume
            .as_ref()
            .map(|c| c.target.as_str())
            .filter(|t| !t.is_empty())
    }
}

// ============================================================================
// Character record
// ============================================================================

/// A monster as stored by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    #[serde(default)]
    pub abilities: BTreeMap<Ability, AbilityScore>,
    #[serde(default)]
    pub skills: BTreeMap<Skill, SkillEntry>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceValue>,
    #[serde(default)]
    pub spells: BTreeMap<String, SpellSlot>,
    #[serde(default)]
    pub traits: Traits,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl CharacterRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abilities: Ability::all()
                .into_iter()
                .map(|a| (a, AbilityScore::default()))
                .collect(),
            skills: BTreeMap::new(),
            attributes: Attributes::default(),
            details: Details::default(),
            resources: BTreeMap::new(),
            spells: BTreeMap::new(),
            traits: Traits::default(),
            items: Vec::new(),
        }
    }

    /// Parse and validate a record from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let record: CharacterRecord = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Parse and validate a record from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let record: CharacterRecord = serde_json::from_value(value)?;
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), RecordError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(RecordError::UnnamedItem(item.id.clone()));
            }
            if !seen.insert(&item.id) {
                return Err(RecordError::DuplicateItemId(item.id.clone()));
            }
        }
        Ok(())
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn spells(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_spell())
    }

    /// Ability score, falling back to a flat 10.
    pub fn ability(&self, ability: Ability) -> AbilityScore {
        self.abilities.get(&ability).cloned().unwrap_or_default()
    }

    pub fn ability_modifier(&self, ability: Ability) -> i64 {
        self.ability(ability).modifier()
    }

    pub fn skill_total(&self, skill: Skill) -> i64 {
        let entry = self.skills.get(&skill).cloned().unwrap_or_default();
        let ability = entry.ability.unwrap_or_else(|| skill.ability());
        self.ability_modifier(ability) + entry.value.bonus(self.attributes.prof)
    }

    pub fn passive_perception(&self) -> i64 {
        10 + self.skill_total(Skill::Perception)
    }

    pub fn spell_slot(&self, key: &str) -> SpellSlot {
        self.spells.get(key).copied().unwrap_or_default()
    }

    /// Look up a value by dotted path, e.g. `resources.legres.value`.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let root = serde_json::to_value(self).ok()?;
        let pointer = format!("/{}", path.replace('.', "/"));
        root.pointer(&pointer).cloned()
    }

    /// Experience value, derived from the challenge rating when not stored.
    pub fn xp(&self) -> u64 {
        self.details
            .xp
            .unwrap_or_else(|| crate::format::xp_for_challenge_rating(self.details.cr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier_floors() {
        assert_eq!(AbilityScore::new(8).modifier(), -1);
        assert_eq!(AbilityScore::new(9).modifier(), -1);
        assert_eq!(AbilityScore::new(10).modifier(), 0);
        assert_eq!(AbilityScore::new(27).modifier(), 8);
    }

    #[test]
    fn test_stored_modifier_wins() {
        let score = AbilityScore {
            value: 10,
            modifier: Some(3),
            proficient: false,
        };
        assert_eq!(score.modifier(), 3);
        assert_eq!(score.proficient().save(4), 7);
    }

    #[test]
    fn test_proficiency_from_multiplier() {
        assert_eq!(ProficiencyLevel::from(0.0), ProficiencyLevel::None);
        assert_eq!(ProficiencyLevel::from(0.5), ProficiencyLevel::Half);
        assert_eq!(ProficiencyLevel::from(1.0), ProficiencyLevel::Proficient);
        assert_eq!(ProficiencyLevel::from(2.0), ProficiencyLevel::Expertise);
        assert_eq!(ProficiencyLevel::Half.bonus(5), 2);
    }

    #[test]
    fn test_proficiency_cycle_visits_every_level() {
        let mut level = ProficiencyLevel::None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            level = level.cycle();
            seen.push(level);
        }
        assert_eq!(level, ProficiencyLevel::None);
        assert!(seen.contains(&ProficiencyLevel::Half));
        assert!(seen.contains(&ProficiencyLevel::Expertise));
    }

    #[test]
    fn test_item_json_shape() {
        let json = r#"{
            "id": "bite",
            "name": "Bite",
            "type": "weapon",
            "activation": {"type": "action"},
            "action_type": "mwak",
            "damage": {"parts": [["2d10+8", "piercing"], ["2d6", "fire"]]},
            "range": {"value": 10, "units": "ft"}
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        let weapon = item.weapon().unwrap();
        assert_eq!(item.activation.kind, ActivationType::Action);
        assert_eq!(weapon.damage.parts.len(), 2);
        assert_eq!(weapon.damage.parts[1].damage_type, "fire");
        assert!(weapon.proficient);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_unit_item_kinds_parse() {
        let item: Item =
            serde_json::from_str(r#"{"id": "a", "name": "Amulet", "type": "loot", "quantity": 3}"#)
                .unwrap();
        assert!(matches!(item.kind, ItemKind::Loot));
        assert_eq!(item.quantity, 3);
        assert_eq!(item.activation.kind, ActivationType::Unset);
    }

    #[test]
    fn test_duplicate_item_ids_rejected() {
        let json = r#"{
            "name": "Goblin",
            "items": [
                {"id": "x", "name": "Scimitar", "type": "weapon"},
                {"id": "x", "name": "Shortbow", "type": "weapon"}
            ]
        }"#;
        assert!(matches!(
            CharacterRecord::from_json(json),
            Err(RecordError::DuplicateItemId(_))
        ));
    }

    #[test]
    fn test_unknown_item_type_rejected() {
        let json = r#"{"name": "Goblin", "items": [{"id": "x", "name": "Cart", "type": "vehicle"}]}"#;
        assert!(matches!(
            CharacterRecord::from_json(json),
            Err(RecordError::Json(_))
        ));
    }

    #[test]
    fn test_lookup_dotted_path() {
        let mut record = CharacterRecord::new("Lich");
        record
            .resources
            .insert("legres".to_string(), ResourceValue { value: 2, max: 3 });
        assert_eq!(
            record.lookup("resources.legres.value").and_then(|v| v.as_i64()),
            Some(2)
        );
        assert_eq!(
            record.lookup("resources.legres.max").and_then(|v| v.as_i64()),
            Some(3)
        );
        assert!(record.lookup("resources.nothing.value").is_none());
    }

    #[test]
    fn test_skill_totals_use_proficiency_multiplier() {
        let mut record = CharacterRecord::new("Scout");
        record.abilities.insert(Ability::Wisdom, AbilityScore::new(14));
        record.attributes.prof = 2;
        record.skills.insert(
            Skill::Perception,
            SkillEntry {
                value: ProficiencyLevel::Expertise,
                ability: None,
            },
        );
        assert_eq!(record.skill_total(Skill::Perception), 6);
        assert_eq!(record.passive_perception(), 16);
    }
}
