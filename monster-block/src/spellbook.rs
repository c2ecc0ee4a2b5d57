//! Spellbook sections and their stat-block strata.
//!
//! The base spellbook groups spells the way the host system does: one
//! section per spell level, plus the pact, innate and at-will pools. A
//! casting feature then shows a filtered view of it:
//!
//! - standard casters see cantrips and each slot level,
//! - pact casters see cantrips and the combined pact section,
//! - innate casters see their spells regrouped by uses per day.

use crate::classify::CastingType;
use crate::format::format_ordinal;
use crate::i18n::Localization;
use crate::record::{Ability, CharacterRecord, Item, ItemId, PreparationMode};
use crate::resources::{resource_summary, ResourceSummary};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which pool a spellbook section holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "level")]
pub enum SectionKind {
    AtWill,
    Innate,
    Cantrip,
    Pact,
    Level(u8),
}

impl SectionKind {
    /// Sort key used by the host: -20 at-will, -10 innate, 0 cantrips,
    /// 0.5 pact, then the spell level.
    pub fn order(&self) -> f64 {
        match self {
            SectionKind::AtWill => -20.0,
            SectionKind::Innate => -10.0,
            SectionKind::Cantrip => 0.0,
            SectionKind::Pact => 0.5,
            SectionKind::Level(level) => *level as f64,
        }
    }

    /// Key of the section's slot pool in the record.
    pub fn prop(&self) -> String {
        match self {
            SectionKind::AtWill => "atwill".to_string(),
            SectionKind::Innate => "innate".to_string(),
            SectionKind::Cantrip => "spell0".to_string(),
            SectionKind::Pact => "pact".to_string(),
            SectionKind::Level(level) => format!("spell{level}"),
        }
    }

    pub fn of(level: u8, mode: PreparationMode) -> SectionKind {
        match mode {
            PreparationMode::Atwill => SectionKind::AtWill,
            PreparationMode::Innate => SectionKind::Innate,
            PreparationMode::Pact => SectionKind::Pact,
            _ if level == 0 => SectionKind::Cantrip,
            PreparationMode::Prepared | PreparationMode::Always => SectionKind::Level(level),
        }
    }

    fn cmp_order(&self, other: &SectionKind) -> Ordering {
        self.order().total_cmp(&other.order())
    }
}

/// A spell as listed in the spellbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellEntry {
    pub id: ItemId,
    pub name: String,
    pub level: u8,
    pub mode: PreparationMode,
    pub ability: Option<Ability>,
    /// Uses per day for innate spells; 0 means at will.
    pub uses: i64,
    pub resource: Option<ResourceSummary>,
}

impl SpellEntry {
    fn from_item(item: &Item, record: &CharacterRecord, locale: &dyn Localization) -> Option<Self> {
        let spell = item.spell()?;
        Some(Self {
            id: item.id.clone(),
            name: item.name.clone(),
            level: spell.level,
            mode: spell.preparation,
            ability: spell.ability,
            uses: item.uses.as_ref().and_then(|u| u.max).unwrap_or(0),
            resource: resource_summary(item, record, locale),
        })
    }
}

/// One section of the base spellbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellbookSection {
    pub kind: SectionKind,
    pub order: f64,
    pub spells: Vec<SpellEntry>,
    /// Slot count for the section's pool (override wins over max).
    pub slots: Option<i64>,
    /// Casting a spell from this section spends a slot.
    pub uses_slots: bool,
}

impl SpellbookSection {
    fn new(kind: SectionKind, record: &CharacterRecord) -> Self {
        let uses_slots = matches!(kind, SectionKind::Level(_) | SectionKind::Pact);
        Self {
            kind,
            order: kind.order(),
            spells: Vec::new(),
            slots: uses_slots.then(|| record.spell_slot(&kind.prop()).slots()),
            uses_slots,
        }
    }
}

/// Group a record's spells into sections ordered by [`SectionKind::order`].
///
/// Levels with slots get a section even when no spell of that level is
/// known, and so does the pact pool.
pub fn build_spellbook(record: &CharacterRecord, locale: &dyn Localization) -> Vec<SpellbookSection> {
    let mut sections: Vec<SpellbookSection> = Vec::new();

    let mut section_for = |kind: SectionKind, sections: &mut Vec<SpellbookSection>| -> usize {
        match sections.iter().position(|s| s.kind == kind) {
            Some(index) => index,
            None => {
                sections.push(SpellbookSection::new(kind, record));
                sections.len() - 1
            }
        }
    };

    for level in 1..=9u8 {
        if record.spell_slot(&format!("spell{level}")).slots() > 0 {
            section_for(SectionKind::Level(level), &mut sections);
        }
    }
    if record.spell_slot("pact").slots() > 0 {
        section_for(SectionKind::Pact, &mut sections);
    }

    for item in record.spells() {
        if let Some(entry) = SpellEntry::from_item(item, record, locale) {
            let index = section_for(SectionKind::of(entry.level, entry.mode), &mut sections);
            sections[index].spells.push(entry);
        }
    }

    sections.sort_by(|a, b| a.kind.cmp_order(&b.kind));
    sections
}

/// A spellbook section as shown in a casting feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratum {
    pub kind: SectionKind,
    /// Host sort key: at will -20, innate -10, cantrips 0, pact 0.5,
    /// otherwise the spell level.
    pub order: f64,
    pub label: String,
    pub slot_label: Option<String>,
    /// Record path of the stratum's slot pool, e.g. "spells.spell3".
    pub slot_key: Option<String>,
    /// Highest spell level in the stratum; slotted and cantrip strata
    /// never report less than 1.
    pub max_spell_level: u8,
    pub slots: Option<i64>,
    /// Uses per day, for innate strata.
    pub uses: Option<i64>,
    pub spells: Vec<SpellEntry>,
}

/// Strata for a casting feature.
///
/// At-will and innate spells never appear for standard or pact casters,
/// and pact casters see only cantrips and the pact section. Innate casters
/// get [`innate_spellbook`].
pub fn stratify_spellbook(
    spellbook: &[SpellbookSection],
    casting: CastingType,
    locale: &dyn Localization,
) -> Vec<Stratum> {
    if casting == CastingType::Innate {
        return innate_spellbook(spellbook, locale);
    }
    spellbook
        .iter()
        .filter(|section| match section.kind {
            SectionKind::AtWill | SectionKind::Innate => false,
            SectionKind::Cantrip | SectionKind::Pact => true,
            SectionKind::Level(_) => casting != CastingType::Pact,
        })
        .map(|section| stratum_for(section, casting, locale))
        .collect()
}

fn stratum_for(section: &SpellbookSection, casting: CastingType, locale: &dyn Localization) -> Stratum {
    let floor = match section.kind {
        SectionKind::Level(level) => level,
        _ => 1,
    };
    let max_spell_level = section
        .spells
        .iter()
        .map(|spell| spell.level)
        .fold(floor, u8::max);

    let mut stratum = Stratum {
        kind: section.kind,
        order: section.order,
        label: String::new(),
        slot_label: None,
        slot_key: None,
        max_spell_level,
        slots: section.slots,
        uses: None,
        spells: section.spells.clone(),
    };

    if section.kind == SectionKind::Cantrip {
        stratum.label = locale.resolve("cantrips");
        stratum.slot_label = Some(locale.resolve("at-will"));
        return stratum;
    }

    let pact = casting == CastingType::Pact;
    let max_ordinal = format_ordinal(max_spell_level as i64, locale);
    let level = if pact {
        format!("{}-{}", format_ordinal(1, locale), max_ordinal)
    } else {
        max_ordinal.clone()
    };
    stratum.label = locale.format("spell-level", &[("level", level)]);
    stratum.slot_key = Some(if pact {
        "spells.pact".to_string()
    } else {
        format!("spells.spell{max_spell_level}")
    });
    let slots = section.slots.unwrap_or(0).to_string();
    stratum.slot_label = Some(locale.format(
        if pact { "spell-pact-slots" } else { "spell-slots" },
        &[("slots", slots), ("level", max_ordinal)],
    ));
    stratum
}

/// Regroup innate spells by uses per day.
///
/// Spells usable at will (zero uses) come first; the remaining strata run
/// from most to fewest uses.
pub fn innate_spellbook(spellbook: &[SpellbookSection], locale: &dyn Localization) -> Vec<Stratum> {
    let mut strata: Vec<Stratum> = Vec::new();

    let innate = spellbook
        .iter()
        .filter(|section| section.kind == SectionKind::Innate)
        .flat_map(|section| section.spells.iter());

    for spell in innate {
        let uses = spell.uses;
        match strata.iter_mut().find(|s| s.uses == Some(uses)) {
            Some(stratum) => stratum.spells.push(spell.clone()),
            None => strata.push(Stratum {
                kind: SectionKind::Innate,
                order: SectionKind::Innate.order(),
                label: innate_label(uses, locale),
                slot_label: None,
                slot_key: None,
                max_spell_level: spell.level,
                slots: None,
                uses: Some(uses),
                spells: vec![spell.clone()],
            }),
        }
    }

    for stratum in &mut strata {
        stratum.max_spell_level = stratum.spells.iter().map(|s| s.level).max().unwrap_or(0);
    }

    strata.sort_by(|a, b| compare_innate_uses(a.uses.unwrap_or(0), b.uses.unwrap_or(0)));
    strata
}

fn innate_label(uses: i64, locale: &dyn Localization) -> String {
    if uses < 1 {
        locale.resolve("innate-at-will")
    } else {
        let per_day = locale.format("per-day", &[("uses", uses.to_string())]);
        locale.format("spell-cost", &[("cost", per_day)])
    }
}

/// Zero uses sorts first, then descending.
fn compare_innate_uses(a: i64, b: i64) -> Ordering {
    match (a == 0, b == 0) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => b.cmp(&a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::LocaleTable;
    use crate::record::{ItemKind, SpellData, SpellSlot, Uses};

    fn spell(id: &str, level: u8, mode: PreparationMode) -> Item {
        Item::new(id, id, ItemKind::Spell(SpellData::new(level, mode)))
    }

    fn innate(id: &str, uses: i64) -> Item {
        let item = spell(id, 1, PreparationMode::Innate);
        if uses > 0 {
            item.with_uses(Uses::per_day(uses))
        } else {
            item
        }
    }

    fn slots(max: i64) -> SpellSlot {
        SpellSlot {
            value: max,
            max,
            override_max: None,
            level: None,
        }
    }

    fn orders(strata: &[Stratum]) -> Vec<f64> {
        strata.iter().map(|s| s.order).collect()
    }

    #[test]
    fn test_section_kinds() {
        assert_eq!(SectionKind::of(0, PreparationMode::Prepared), SectionKind::Cantrip);
        assert_eq!(SectionKind::of(3, PreparationMode::Always), SectionKind::Level(3));
        assert_eq!(SectionKind::of(3, PreparationMode::Pact), SectionKind::Pact);
        // Pact magic keeps its own section whatever the level
        assert_eq!(SectionKind::of(0, PreparationMode::Pact), SectionKind::Pact);
        assert_eq!(SectionKind::of(0, PreparationMode::Atwill), SectionKind::AtWill);
        assert_eq!(SectionKind::of(5, PreparationMode::Innate), SectionKind::Innate);
        assert_eq!(SectionKind::AtWill.order(), -20.0);
        assert_eq!(SectionKind::Innate.order(), -10.0);
        assert_eq!(SectionKind::Pact.order(), 0.5);
    }

    #[test]
    fn test_build_spellbook_orders_sections() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Mage");
        record.spells.insert("spell1".into(), slots(4));
        record.spells.insert("spell2".into(), slots(3));
        record.items = vec![
            spell("magic-missile", 1, PreparationMode::Prepared),
            spell("fire-bolt", 0, PreparationMode::Prepared),
            spell("detect-magic", 1, PreparationMode::Atwill),
        ];
        let book = build_spellbook(&record, &locale);
        let kinds: Vec<_> = book.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::AtWill,
                SectionKind::Cantrip,
                SectionKind::Level(1),
                SectionKind::Level(2)
            ]
        );
        assert_eq!(book[2].slots, Some(4));
        // Level 2 has slots but no spells
        assert!(book[3].spells.is_empty());
    }

    #[test]
    fn test_standard_strata_labels() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Mage");
        record.spells.insert("spell3".into(), slots(2));
        record.items = vec![
            spell("fireball", 3, PreparationMode::Prepared),
            spell("light", 0, PreparationMode::Prepared),
            spell("mage-hand", 0, PreparationMode::Atwill),
        ];
        let book = build_spellbook(&record, &locale);
        let strata = stratify_spellbook(&book, CastingType::Standard, &locale);
        assert_eq!(orders(&strata), vec![0.0, 3.0]);
        assert_eq!(strata[0].label, "Cantrips");
        assert_eq!(strata[0].slot_label.as_deref(), Some("at will"));
        assert_eq!(strata[0].slot_key, None);
        assert_eq!(strata[1].label, "3rd level");
        assert_eq!(strata[1].slot_key.as_deref(), Some("spells.spell3"));
        assert_eq!(strata[1].slot_label.as_deref(), Some("(2 slots)"));
        assert_eq!(strata[1].max_spell_level, 3);
    }

    #[test]
    fn test_pact_strata_keep_only_cantrips_and_pact() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Fiend");
        record.spells.insert("spell1".into(), slots(2));
        record.spells.insert(
            "pact".into(),
            SpellSlot {
                level: Some(5),
                ..slots(3)
            },
        );
        record.items = vec![
            spell("eldritch-blast", 0, PreparationMode::Prepared),
            spell("minor-illusion", 0, PreparationMode::Pact),
            spell("hex", 1, PreparationMode::Pact),
            spell("hold-monster", 5, PreparationMode::Pact),
            spell("shield", 1, PreparationMode::Prepared),
            spell("disguise-self", 1, PreparationMode::Atwill),
            spell("darkness", 2, PreparationMode::Innate),
        ];
        let book = build_spellbook(&record, &locale);
        let strata = stratify_spellbook(&book, CastingType::Pact, &locale);
        assert_eq!(orders(&strata), vec![0.0, 0.5]);
        let pact = &strata[1];
        assert_eq!(pact.max_spell_level, 5);
        assert_eq!(pact.label, "1st-5th level");
        assert_eq!(pact.slot_key.as_deref(), Some("spells.pact"));
        assert_eq!(pact.slot_label.as_deref(), Some("(3 5th-level slots)"));
        let ids: Vec<_> = pact.spells.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["minor-illusion", "hex", "hold-monster"]);
        assert_eq!(strata[0].spells.len(), 1);
    }

    #[test]
    fn test_innate_only_section_is_hidden_from_standard_casters() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Drow Mage");
        record.items = vec![
            spell("darkness", 2, PreparationMode::Innate),
            spell("web", 2, PreparationMode::Prepared),
        ];
        let book = build_spellbook(&record, &locale);
        let standard = stratify_spellbook(&book, CastingType::Standard, &locale);
        assert!(standard.iter().all(|s| s.order != -10.0 && s.order != -20.0));
        let innate = stratify_spellbook(&book, CastingType::Innate, &locale);
        assert_eq!(innate, innate_spellbook(&book, &locale));
        assert_eq!(innate.len(), 1);
        assert_eq!(innate[0].order, -10.0);
        assert_eq!(innate[0].label, "At will");
        assert_eq!(innate[0].slot_key, None);
        assert!(innate[0].spells.iter().all(|s| s.mode == PreparationMode::Innate));
    }

    #[test]
    fn test_section_and_entry_fields() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Drow");
        record.spells.insert("spell2".into(), slots(2));
        record.items = vec![
            innate("dancing-lights", 0),
            spell("light", 0, PreparationMode::Prepared),
            spell("web", 2, PreparationMode::Prepared),
        ];
        let book = build_spellbook(&record, &locale);
        let uses_slots: Vec<_> = book.iter().map(|s| (s.kind, s.uses_slots)).collect();
        assert_eq!(
            uses_slots,
            vec![
                (SectionKind::Innate, false),
                (SectionKind::Cantrip, false),
                (SectionKind::Level(2), true)
            ]
        );
        // No uses recorded means at will
        assert_eq!(book[0].spells[0].uses, 0);
        let innate = innate_spellbook(&book, &locale);
        assert_eq!(innate[0].label, "At will");
        assert_eq!(innate[0].max_spell_level, 1);

        let strata = stratify_spellbook(&book, CastingType::Standard, &locale);
        assert_eq!(strata[0].max_spell_level, 1);
        assert_eq!(strata[1].max_spell_level, 2);
        assert_eq!(strata[1].slot_key.as_deref(), Some("spells.spell2"));
    }

    #[test]
    fn test_innate_spellbook_sorting() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Drow");
        record.items = vec![
            innate("darkness", 1),
            innate("dancing-lights", 0),
            innate("faerie-fire", 1),
            innate("levitate", 3),
            innate("detect-magic", 0),
        ];
        let book = build_spellbook(&record, &locale);
        let strata = innate_spellbook(&book, &locale);
        let uses: Vec<_> = strata.iter().map(|s| s.uses.unwrap()).collect();
        assert_eq!(uses, vec![0, 3, 1]);
        assert_eq!(strata[0].label, "At will");
        assert_eq!(strata[0].spells.len(), 2);
        assert_eq!(strata[1].label, "3/day each");
        assert_eq!(strata[2].spells.len(), 2);
        assert!(strata.iter().all(|s| s.slot_label.is_none()));
    }

    #[test]
    fn test_innate_spells_carry_resources() {
        let locale = LocaleTable::english();
        let mut record = CharacterRecord::new("Drow");
        record.items = vec![innate("darkness", 1)];
        let book = build_spellbook(&record, &locale);
        let strata = innate_spellbook(&book, &locale);
        let resource = strata[0].spells[0].resource.as_ref().unwrap();
        assert_eq!(resource.current, Some(1));
        assert_eq!(resource.limit, None);
    }

    #[test]
    fn test_compare_innate_uses() {
        assert_eq!(compare_innate_uses(0, 5), Ordering::Less);
        assert_eq!(compare_innate_uses(5, 0), Ordering::Greater);
        assert_eq!(compare_innate_uses(1, 3), Ordering::Greater);
        assert_eq!(compare_innate_uses(3, 1), Ordering::Less);
        assert_eq!(compare_innate_uses(0, 0), Ordering::Equal);
    }
}
