//! Localization lookup.
//!
//! Keys resolve to either a single string or a list of strings. Lists hold
//! matching tables such as the names that identify a multiattack, so a
//! translation can recognise "Mehrfachangriff" without touching the
//! classifier.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// String lookup supplied by the host.
pub trait Localization {
    /// Resolve a key to display text. Unknown keys resolve to themselves.
    fn resolve(&self, key: &str) -> String;

    /// Resolve a key to a list of strings. Unknown keys give an empty list.
    fn resolve_list(&self, key: &str) -> Vec<String>;

    /// Resolve a key and substitute `{name}` placeholders.
    fn format(&self, key: &str, args: &[(&str, String)]) -> String {
        let mut text = self.resolve(key);
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocaleEntry {
    Text(String),
    List(Vec<String>),
}

/// A table of localized strings, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleTable {
    entries: HashMap<String, LocaleEntry>,
}

impl LocaleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat JSON object of `key: string | [string]`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The built-in English table.
    pub fn english() -> Self {
        ENGLISH.clone()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: LocaleEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn with_text(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, LocaleEntry::Text(text.into()));
        self
    }

    pub fn with_list<S: Into<String>>(mut self, key: impl Into<String>, list: impl IntoIterator<Item = S>) -> Self {
        self.insert(key, LocaleEntry::List(list.into_iter().map(Into::into).collect()));
        self
    }

    /// Overlay `other` on top of this table.
    pub fn merge(mut self, other: LocaleTable) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Localization for LocaleTable {
    fn resolve(&self, key: &str) -> String {
        match self.entries.get(key) {
            Some(LocaleEntry::Text(text)) => text.clone(),
            Some(LocaleEntry::List(list)) => list.join(", "),
            None => {
                tracing::debug!(key, "missing localization key");
                key.to_string()
            }
        }
    }

    fn resolve_list(&self, key: &str) -> Vec<String> {
        match self.entries.get(key) {
            Some(LocaleEntry::List(list)) => list.clone(),
            Some(LocaleEntry::Text(text)) => vec![text.clone()],
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Built-in English strings
// ============================================================================

const ENGLISH_TEXT: &[(&str, &str)] = &[
    // Feature sections
    ("category.legendary-resistance", "Legendary Resistance"),
    ("category.legendary-action", "Legendary Actions"),
    ("category.lair-action", "Lair Actions"),
    ("category.multiattack", "Multiattack"),
    ("category.casting", "Features"),
    ("category.reaction", "Reactions"),
    ("category.attack", "Attacks"),
    ("category.action", "Actions"),
    ("category.feature", "Features"),
    ("category.equipment", "Inventory"),
    // Abilities
    ("ability.str", "Strength"),
    ("ability.dex", "Dexterity"),
    ("ability.con", "Constitution"),
    ("ability.int", "Intelligence"),
    ("ability.wis", "Wisdom"),
    ("ability.cha", "Charisma"),
    ("ability-abbr.str", "Str"),
    ("ability-abbr.dex", "Dex"),
    ("ability-abbr.con", "Con"),
    ("ability-abbr.int", "Int"),
    ("ability-abbr.wis", "Wis"),
    ("ability-abbr.cha", "Cha"),
    // Skills
    ("skill.acr", "Acrobatics"),
    ("skill.ani", "Animal Handling"),
    ("skill.arc", "Arcana"),
    ("skill.ath", "Athletics"),
    ("skill.dec", "Deception"),
    ("skill.his", "History"),
    ("skill.ins", "Insight"),
    ("skill.itm", "Intimidation"),
    ("skill.inv", "Investigation"),
    ("skill.med", "Medicine"),
    ("skill.nat", "Nature"),
    ("skill.prc", "Perception"),
    ("skill.prf", "Performance"),
    ("skill.per", "Persuasion"),
    ("skill.rel", "Religion"),
    ("skill.slt", "Sleight of Hand"),
    ("skill.ste", "Stealth"),
    ("skill.sur", "Survival"),
    ("proficiency.none", "Not Proficient"),
    ("proficiency.half", "Half Proficient"),
    ("proficiency.proficient", "Proficient"),
    ("proficiency.expertise", "Expertise"),
    // Movement and senses
    ("movement.walk", "Walk"),
    ("movement.burrow", "Burrow"),
    ("movement.climb", "Climb"),
    ("movement.fly", "Fly"),
    ("movement.hover", "Fly (hover)"),
    ("movement.swim", "Swim"),
    ("sense.blindsight", "Blindsight"),
    ("sense.darkvision", "Darkvision"),
    ("sense.tremorsense", "Tremorsense"),
    ("sense.truesight", "Truesight"),
    ("speed-unit-suffix", "."),
    ("passive-perception", "passive Perception {pp}"),
    ("perception-locator", "perception"),
    // Traits
    ("trait.di", "Damage Immunities"),
    ("trait.dr", "Damage Resistances"),
    ("trait.dv", "Damage Vulnerabilities"),
    ("trait.ci", "Condition Immunities"),
    ("trait.languages", "Languages"),
    ("physical-damage", "bludgeoning, piercing, and slashing from nonmagical attacks"),
    ("damage.acid", "Acid"),
    ("damage.bludgeoning", "Bludgeoning"),
    ("damage.cold", "Cold"),
    ("damage.fire", "Fire"),
    ("damage.force", "Force"),
    ("damage.lightning", "Lightning"),
    ("damage.necrotic", "Necrotic"),
    ("damage.piercing", "Piercing"),
    ("damage.poison", "Poison"),
    ("damage.psychic", "Psychic"),
    ("damage.radiant", "Radiant"),
    ("damage.slashing", "Slashing"),
    ("damage.thunder", "Thunder"),
    ("damage.healing", "Healing"),
    ("damage.temphp", "Temporary Healing"),
    ("condition.blinded", "Blinded"),
    ("condition.charmed", "Charmed"),
    ("condition.deafened", "Deafened"),
    ("condition.exhaustion", "Exhaustion"),
    ("condition.frightened", "Frightened"),
    ("condition.grappled", "Grappled"),
    ("condition.incapacitated", "Incapacitated"),
    ("condition.invisible", "Invisible"),
    ("condition.paralyzed", "Paralyzed"),
    ("condition.petrified", "Petrified"),
    ("condition.poisoned", "Poisoned"),
    ("condition.prone", "Prone"),
    ("condition.restrained", "Restrained"),
    ("condition.stunned", "Stunned"),
    ("condition.unconscious", "Unconscious"),
    ("language.common", "Common"),
    ("language.draconic", "Draconic"),
    ("language.elvish", "Elvish"),
    ("language.giant", "Giant"),
    ("language.goblin", "Goblin"),
    ("language.infernal", "Infernal"),
    ("language.undercommon", "Undercommon"),
    // Resources
    ("resource-refresh", "Day"),
    ("period.sr", "Short Rest"),
    ("period.lr", "Long Rest"),
    ("period.day", "Day"),
    ("period.charges", "Charges"),
    ("recharge", "Recharge {range}"),
    // Attacks
    ("action-type.mwak", "Melee Weapon Attack"),
    ("action-type.rwak", "Ranged Weapon Attack"),
    ("action-type.msak", "Melee Spell Attack"),
    ("action-type.rsak", "Ranged Spell Attack"),
    ("action-type.save", "Saving Throw"),
    ("action-type.heal", "Healing"),
    ("action-type.util", "Utility"),
    ("action-type.other", "Other"),
    ("thrown-label", "Melee or Ranged Weapon Attack"),
    ("attack-to-hit", "{bonus} to hit"),
    ("attack-range", "{reach} {range}{sep}{max} {units}."),
    ("thrown-range", "reach {melee} {units} or range {range}{sep}{max} {units}."),
    ("reach", "reach"),
    ("range", "range"),
    ("attack-target", "{quantity} {type}"),
    ("target", "target"),
    ("targets", "targets"),
    ("attack-damage", "{average} ({formula}) {type} damage"),
    // Spellcasting
    ("cantrips", "Cantrips"),
    ("at-will", "at will"),
    ("innate-at-will", "At will"),
    ("per-day", "{uses}/day"),
    ("spell-cost", "{cost} each"),
    ("spell-level", "{level} level"),
    ("spell-slots", "({slots} slots)"),
    ("spell-pact-slots", "({slots} {level}-level slots)"),
    ("caster-name-level", "The {name} is a {level}-level spellcaster."),
    ("casting-ability", "Its spellcasting ability is {ability}"),
    ("innate-casting-ability", "The {name}'s innate spellcasting ability is {ability}"),
    ("casting-stats", "(spell save DC {savedc}, {bonus} to hit with spell attacks)."),
    ("warlock-slot-regain", "It regains its expended spell slots when it finishes a short or long rest."),
    ("caster-spells-prepared", "The {name} has the following spells prepared:"),
    ("warlock-spells-prepared", "It knows the following warlock spells:"),
    ("innate-spells-known", "It can innately cast the following spells, requiring no material components:"),
    ("caster-at-will", "The {name} can cast the following spells at will:"),
];

const ENGLISH_LISTS: &[(&str, &[&str])] = &[
    ("ordinal-suffixes", &["st", "nd", "rd", "th"]),
    ("number-words", &["zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine"]),
    ("multiattack-locators", &["multiattack"]),
    ("spellcasting-locators", &["spellcasting"]),
    ("innate-casting-locators", &["innatespellcasting"]),
    ("warlock-locators", &["warlock", "pactmagic"]),
];

lazy_static::lazy_static! {
    static ref ENGLISH: LocaleTable = {
        let mut table = LocaleTable::new();
        for (key, text) in ENGLISH_TEXT {
            table.insert(*key, LocaleEntry::Text(text.to_string()));
        }
        for (key, list) in ENGLISH_LISTS {
            table.insert(*key, LocaleEntry::List(list.iter().map(|s| s.to_string()).collect()));
        }
        table
    };
}

/// The built-in English table, shared.
pub fn english() -> &'static LocaleTable {
    &ENGLISH
}
