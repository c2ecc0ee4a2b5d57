//! The written description of a spellcasting feature.

use crate::classify::{is_casting, CastingType};
use crate::format::{format_ordinal, signed};
use crate::record::{Ability, CharacterRecord, Item};
use crate::sheet::SheetContext;
use crate::spellbook::{stratify_spellbook, SectionKind, SpellEntry, SpellbookSection, Stratum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastingDescription {
    pub casting_type: CastingType,
    pub caster_level: u32,
    /// "The mage is a 9th-level spellcaster." Empty for innate casting.
    pub level: String,
    pub ability: Ability,
    pub ability_text: String,
    pub save_dc: i64,
    pub attack_bonus: i64,
    pub stats: String,
    pub warlock_recharge: Option<String>,
    pub spell_intro: String,
    pub at_will_intro: Option<String>,
    pub at_will: Vec<SpellEntry>,
    pub spellbook: Vec<Stratum>,
}

/// Casting ability for a feature's spells.
///
/// Starts from the record's spellcasting ability (intelligence if unset);
/// the first spell in the feature's main stratum that names a different
/// ability overrides it.
pub fn casting_ability(strata: &[Stratum], casting: CastingType, record: &CharacterRecord) -> Ability {
    let main = record.attributes.spellcasting.unwrap_or(Ability::Intelligence);
    let stratum = strata.iter().find(|stratum| match casting {
        CastingType::Innate => stratum.kind == SectionKind::Innate,
        CastingType::Pact => stratum.kind == SectionKind::Pact,
        CastingType::Standard => stratum.order > SectionKind::Pact.order(),
    });
    stratum
        .and_then(|stratum| {
            stratum
                .spells
                .iter()
                .filter_map(|spell| spell.ability)
                .find(|ability| *ability != main)
        })
        .unwrap_or(main)
}

/// Spell attack bonus: ability modifier plus proficiency.
pub fn spell_attack_bonus(record: &CharacterRecord, ability: Ability) -> i64 {
    record.ability_modifier(ability) + record.attributes.prof
}

/// Describe a casting feature against the record's spellbook.
///
/// Items that are not casting features have no description.
pub fn describe_casting(
    item: &Item,
    record: &CharacterRecord,
    spellbook: &[SpellbookSection],
    ctx: &SheetContext<'_>,
) -> Option<CastingDescription> {
    let locale = ctx.locale;
    if !is_casting(item, locale) {
        return None;
    }

    let casting = CastingType::of(item, locale);
    let strata = stratify_spellbook(spellbook, casting, locale);
    let ability = casting_ability(&strata, casting, record);
    let attack_bonus = spell_attack_bonus(record, ability);
    let save_dc = record.attributes.spelldc;
    let caster_level = record.details.spell_level;
    let name = record.name.clone();
    let ability_label = locale.resolve(&format!("ability.{}", ability.id()));

    let level = match casting {
        CastingType::Innate => String::new(),
        _ => locale.format(
            "caster-name-level",
            &[
                ("name", name.clone()),
                ("level", format_ordinal(caster_level as i64, locale)),
            ],
        ),
    };
    let ability_key = match casting {
        CastingType::Innate => "innate-casting-ability",
        _ => "casting-ability",
    };
    let intro_key = match casting {
        CastingType::Standard => "caster-spells-prepared",
        CastingType::Pact => "warlock-spells-prepared",
        CastingType::Innate => "innate-spells-known",
    };

    let at_will: Vec<SpellEntry> = spellbook
        .iter()
        .filter(|section| section.kind == SectionKind::AtWill)
        .flat_map(|section| section.spells.iter().cloned())
        .collect();
    let at_will_intro = (!at_will.is_empty())
        .then(|| locale.format("caster-at-will", &[("name", name.clone())]));

    Some(CastingDescription {
        casting_type: casting,
        caster_level,
        level,
        ability,
        ability_text: locale.format(ability_key, &[("name", name.clone()), ("ability", ability_label)]),
        save_dc,
        attack_bonus,
        stats: locale.format(
            "casting-stats",
            &[("savedc", save_dc.to_string()), ("bonus", signed(attack_bonus))],
        ),
        warlock_recharge: (casting == CastingType::Pact).then(|| locale.resolve("warlock-slot-regain")),
        spell_intro: locale.format(intro_key, &[("name", name)]),
        at_will_intro,
        at_will,
        spellbook: strata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AbilityScore, ItemKind, PreparationMode, SpellData, SpellSlot, Uses};
    use crate::spellbook::build_spellbook;

    fn spell(id: &str, level: u8, mode: PreparationMode) -> Item {
        Item::new(id, id, ItemKind::Spell(SpellData::new(level, mode)))
    }

    fn mage() -> CharacterRecord {
        let mut record = CharacterRecord::new("Mage");
        record.abilities.insert(Ability::Intelligence, AbilityScore::new(17));
        record.abilities.insert(Ability::Charisma, AbilityScore::new(12));
        record.attributes.prof = 3;
        record.attributes.spelldc = 14;
        record.attributes.spellcasting = Some(Ability::Intelligence);
        record.details.spell_level = 9;
        record.spells.insert(
            "spell1".into(),
            SpellSlot {
                value: 4,
                max: 4,
                override_max: None,
                level: None,
            },
        );
        record.items = vec![
            Item::new("f", "Spellcasting", ItemKind::Feat),
            spell("fire-bolt", 0, PreparationMode::Prepared),
            spell("shield", 1, PreparationMode::Prepared),
            spell("disguise-self", 1, PreparationMode::Atwill),
        ];
        record
    }

    fn describe(record: &CharacterRecord, feature: &str) -> CastingDescription {
        let ctx = SheetContext::default();
        let book = build_spellbook(record, ctx.locale);
        let item = record.item(&crate::record::ItemId::new(feature)).unwrap();
        describe_casting(item, record, &book, &ctx).unwrap()
    }

    #[test]
    fn test_standard_casting_description() {
        let record = mage();
        let casting = describe(&record, "f");
        assert_eq!(casting.casting_type, CastingType::Standard);
        assert_eq!(casting.level, "The Mage is a 9th-level spellcaster.");
        assert_eq!(casting.ability, Ability::Intelligence);
        assert_eq!(casting.ability_text, "Its spellcasting ability is Intelligence");
        assert_eq!(casting.attack_bonus, 6);
        assert_eq!(casting.stats, "(spell save DC 14, +6 to hit with spell attacks).");
        assert_eq!(casting.warlock_recharge, None);
        assert_eq!(casting.spell_intro, "The Mage has the following spells prepared:");
        assert_eq!(casting.at_will.len(), 1);
        assert_eq!(
            casting.at_will_intro.as_deref(),
            Some("The Mage can cast the following spells at will:")
        );
        let orders: Vec<f64> = casting.spellbook.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0.0, 1.0]);
    }

    #[test]
    fn test_spell_ability_override() {
        let mut record = mage();
        let mut shield = spell("shield", 1, PreparationMode::Prepared);
        if let ItemKind::Spell(data) = &mut shield.kind {
            data.ability = Some(Ability::Charisma);
        }
        record.items[2] = shield;
        let casting = describe(&record, "f");
        assert_eq!(casting.ability, Ability::Charisma);
        assert_eq!(casting.attack_bonus, 4);
    }

    #[test]
    fn test_innate_casting_description() {
        let mut record = mage();
        record.items = vec![
            Item::new("i", "Innate Spellcasting", ItemKind::Feat),
            spell("darkness", 2, PreparationMode::Innate).with_uses(Uses::per_day(1)),
            spell("dancing-lights", 0, PreparationMode::Innate),
        ];
        let casting = describe(&record, "i");
        assert_eq!(casting.casting_type, CastingType::Innate);
        assert!(casting.level.is_empty());
        assert_eq!(
            casting.ability_text,
            "The Mage's innate spellcasting ability is Intelligence"
        );
        assert_eq!(casting.spellbook.len(), 2);
        assert_eq!(casting.spellbook[0].label, "At will");
        assert!(casting.at_will.is_empty());
        assert!(casting.at_will_intro.is_none());
    }

    #[test]
    fn test_pact_casting_description() {
        let mut record = mage();
        record.items[0] = Item::new("f", "Spellcasting", ItemKind::Feat)
            .with_description("<p>The fiend is a 5th-level warlock.</p>");
        let casting = describe(&record, "f");
        assert_eq!(casting.casting_type, CastingType::Pact);
        assert!(casting.warlock_recharge.is_some());
        assert_eq!(casting.spell_intro, "It knows the following warlock spells:");
        // Level 1 slots are not pact slots
        assert!(casting.spellbook.iter().all(|s| s.order == 0.0 || s.order == 0.5));
    }

    #[test]
    fn test_non_casting_items_have_no_description() {
        let record = mage();
        let ctx = SheetContext::default();
        let book = build_spellbook(&record, ctx.locale);
        let item = Item::new("x", "Keen Smell", ItemKind::Feat);
        assert!(describe_casting(&item, &record, &book, &ctx).is_none());
    }
}
