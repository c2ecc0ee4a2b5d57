//! Written-out attack descriptions, e.g.
//! "Melee Weapon Attack: +7 to hit, reach 10 ft., one target. Hit: 15 (2d10 + 4) piercing damage."

use crate::dice::{average_roll, simplify_formula, RollData};
use crate::format::{is_continuous_description, number_word, signed};
use crate::i18n::Localization;
use crate::record::{Ability, ActionType, CharacterRecord, Item, WeaponData};
use crate::sheet::SheetContext;
use serde::{Deserialize, Serialize};

/// One damage roll of an attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageLine {
    pub text: String,
    pub average: i64,
    pub formula: String,
    pub damage_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDescription {
    pub attack_type: String,
    pub to_hit: String,
    pub range: String,
    pub target: String,
    pub damage: Vec<DamageLine>,
    pub versatile: Option<DamageLine>,
    /// The item description continues the attack line instead of
    /// starting a new paragraph.
    pub continuous_description: bool,
}

/// Ability that drives a weapon's attack and damage rolls.
pub fn attack_ability(weapon: &WeaponData, record: &CharacterRecord) -> Ability {
    if let Some(ability) = weapon.ability {
        return ability;
    }
    if weapon.action_type.is_spell_attack() {
        return record.attributes.spellcasting.unwrap_or(Ability::Intelligence);
    }
    if weapon.properties.finesse {
        let str_mod = record.ability_modifier(Ability::Strength);
        let dex_mod = record.ability_modifier(Ability::Dexterity);
        return if dex_mod > str_mod {
            Ability::Dexterity
        } else {
            Ability::Strength
        };
    }
    if weapon.action_type == ActionType::Rwak {
        Ability::Dexterity
    } else {
        Ability::Strength
    }
}

/// Total attack roll bonus: ability modifier, proficiency when proficient,
/// and the weapon's own bonus.
pub fn attack_bonus(weapon: &WeaponData, record: &CharacterRecord) -> i64 {
    let proficiency = if weapon.proficient {
        record.attributes.prof
    } else {
        0
    };
    record.ability_modifier(attack_ability(weapon, record)) + proficiency + weapon.attack_bonus
}

/// Describe a weapon item. Non-weapons have no attack description.
pub fn describe_attack(
    item: &Item,
    record: &CharacterRecord,
    ctx: &SheetContext<'_>,
) -> Option<AttackDescription> {
    let weapon = item.weapon()?;
    let locale = ctx.locale;
    let data = RollData::from_record(record)
        .with("mod", record.ability_modifier(attack_ability(weapon, record)));

    let damage = weapon
        .damage
        .parts
        .iter()
        .map(|part| damage_line(&part.formula, &part.damage_type, &data, ctx))
        .collect();

    let versatile = if weapon.damage.versatile.is_empty() {
        None
    } else {
        let damage_type = weapon
            .damage
            .parts
            .first()
            .map(|part| part.damage_type.as_str())
            .unwrap_or("");
        Some(damage_line(&weapon.damage.versatile, damage_type, &data, ctx))
    };

    Some(AttackDescription {
        attack_type: attack_type(weapon, locale),
        to_hit: locale.format(
            "attack-to-hit",
            &[("bonus", signed(attack_bonus(weapon, record)))],
        ),
        range: range_text(weapon, locale),
        target: target_text(item, weapon, locale),
        damage,
        versatile,
        continuous_description: is_continuous_description(&item.description),
    })
}

fn attack_type(weapon: &WeaponData, locale: &dyn Localization) -> String {
    if weapon.properties.thrown {
        locale.resolve("thrown-label")
    } else {
        locale.resolve(&format!("action-type.{}", weapon.action_type.id()))
    }
}

fn range_text(weapon: &WeaponData, locale: &dyn Localization) -> String {
    let range = &weapon.range;
    let (sep, max) = match range.long {
        Some(long) if long > 0 => ("/".to_string(), long.to_string()),
        _ => (String::new(), String::new()),
    };
    let args = [
        (
            "reach",
            locale.resolve(if weapon.action_type.is_ranged() { "range" } else { "reach" }),
        ),
        ("melee", weapon.target.width.unwrap_or(0).to_string()),
        ("range", range.value.unwrap_or(0).to_string()),
        ("sep", sep),
        ("max", max),
        ("units", range.units.clone()),
    ];
    let key = if weapon.properties.thrown {
        "thrown-range"
    } else {
        "attack-range"
    };
    locale.format(key, &args)
}

fn target_text(item: &Item, weapon: &WeaponData, locale: &dyn Localization) -> String {
    if !item.activation.condition.is_empty() {
        return item.activation.condition.clone();
    }
    let count = weapon.target.value.filter(|v| *v > 0).unwrap_or(1);
    let kind = if !weapon.target.kind.is_empty() {
        weapon.target.kind.clone()
    } else if count > 1 {
        locale.resolve("targets")
    } else {
        locale.resolve("target")
    };
    locale.format(
        "attack-target",
        &[("quantity", number_word(count as i64, locale)), ("type", kind)],
    )
}

fn damage_line(formula: &str, damage_type: &str, data: &RollData, ctx: &SheetContext<'_>) -> DamageLine {
    let average = average_roll(Some(formula), data, ctx.evaluator, ctx.notifier);
    let simplified = simplify_formula(formula, data);
    let type_label = damage_type_label(damage_type, ctx.locale);
    DamageLine {
        text: ctx.locale.format(
            "attack-damage",
            &[
                ("average", average.to_string()),
                ("formula", simplified.clone()),
                ("type", type_label.to_lowercase()),
            ],
        ),
        average,
        formula: simplified,
        damage_type: type_label,
    }
}

/// Display name of a damage type tag; empty tags stay empty.
pub fn damage_type_label(damage_type: &str, locale: &dyn Localization) -> String {
    if damage_type.is_empty() {
        String::new()
    } else {
        locale.resolve(&format!("damage.{damage_type}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AbilityScore, ActivationType, DamagePart, ItemKind, Range, Target};
    use crate::testing::RecordingNotifier;

    fn ogre() -> CharacterRecord {
        let mut record = CharacterRecord::new("Ogre");
        record.abilities.insert(Ability::Strength, AbilityScore::new(19));
        record.abilities.insert(Ability::Dexterity, AbilityScore::new(8));
        record.attributes.prof = 2;
        record
    }

    fn greatclub() -> Item {
        let mut weapon = WeaponData::default();
        weapon.damage.parts = vec![DamagePart::new("2d8 + @mod", "bludgeoning")];
        weapon.range = Range {
            value: Some(5),
            long: None,
            units: "ft".to_string(),
        };
        Item::new("club", "Greatclub", ItemKind::Weapon(weapon)).with_activation(ActivationType::Action)
    }

    #[test]
    fn test_melee_attack_description() {
        let notifier = RecordingNotifier::new();
        let ctx = SheetContext::default().with_notifier(&notifier);
        let record = ogre();
        let attack = describe_attack(&greatclub(), &record, &ctx).unwrap();
        assert_eq!(attack.attack_type, "Melee Weapon Attack");
        assert_eq!(attack.to_hit, "+6 to hit");
        assert_eq!(attack.range, "reach 5 ft.");
        assert_eq!(attack.target, "one target");
        assert_eq!(attack.damage.len(), 1);
        let line = &attack.damage[0];
        assert_eq!(line.average, 13);
        assert_eq!(line.formula, "2d8 + 4");
        assert_eq!(line.damage_type, "Bludgeoning");
        assert_eq!(line.text, "13 (2d8 + 4) bludgeoning damage");
        assert!(attack.versatile.is_none());
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_ranged_attack_with_long_range_and_targets() {
        let ctx = SheetContext::default();
        let mut record = ogre();
        record.abilities.insert(Ability::Dexterity, AbilityScore::new(16));
        let mut weapon = WeaponData {
            action_type: ActionType::Rwak,
            ..WeaponData::default()
        };
        weapon.range = Range {
            value: Some(150),
            long: Some(600),
            units: "ft".to_string(),
        };
        weapon.target = Target {
            value: Some(2),
            width: None,
            kind: String::new(),
        };
        let bow = Item::new("bow", "Longbow", ItemKind::Weapon(weapon));
        let attack = describe_attack(&bow, &record, &ctx).unwrap();
        assert_eq!(attack.attack_type, "Ranged Weapon Attack");
        assert_eq!(attack.to_hit, "+5 to hit");
        assert_eq!(attack.range, "range 150/600 ft.");
        assert_eq!(attack.target, "two targets");
        assert!(attack.damage.is_empty());
    }

    #[test]
    fn test_thrown_versatile_finesse_weapon() {
        let ctx = SheetContext::default();
        let mut record = ogre();
        record.abilities.insert(Ability::Dexterity, AbilityScore::new(20));
        let mut weapon = WeaponData::default();
        weapon.properties.thrown = true;
        weapon.properties.finesse = true;
        weapon.damage.parts = vec![DamagePart::new("1d6 + @mod", "piercing")];
        weapon.damage.versatile = "1d8 + @mod".to_string();
        weapon.range = Range {
            value: Some(20),
            long: Some(60),
            units: "ft".to_string(),
        };
        weapon.target.width = Some(5);
        let spear = Item::new("spear", "Spear", ItemKind::Weapon(weapon));
        let attack = describe_attack(&spear, &record, &ctx).unwrap();
        assert_eq!(attack.attack_type, "Melee or Ranged Weapon Attack");
        assert_eq!(attack.to_hit, "+7 to hit");
        assert_eq!(attack.range, "reach 5 ft or range 20/60 ft.");
        let versatile = attack.versatile.unwrap();
        assert_eq!(versatile.average, 9);
        assert_eq!(versatile.damage_type, "Piercing");
    }

    #[test]
    fn test_condition_replaces_target_text() {
        let ctx = SheetContext::default();
        let item = greatclub().with_condition("one creature it is grappling");
        let attack = describe_attack(&item, &ogre(), &ctx).unwrap();
        assert_eq!(attack.target, "one creature it is grappling");
    }

    #[test]
    fn test_negative_to_hit_and_no_proficiency() {
        let ctx = SheetContext::default();
        let mut record = ogre();
        record.abilities.insert(Ability::Strength, AbilityScore::new(6));
        let weapon = WeaponData {
            proficient: false,
            ..WeaponData::default()
        };
        let item = Item::new("w", "Flail", ItemKind::Weapon(weapon));
        let attack = describe_attack(&item, &record, &ctx).unwrap();
        assert_eq!(attack.to_hit, "-2 to hit");
    }

    #[test]
    fn test_bad_damage_formula_degrades_and_reports() {
        let notifier = RecordingNotifier::new();
        let ctx = SheetContext::default().with_notifier(&notifier);
        let mut weapon = WeaponData::default();
        weapon.damage.parts = vec![DamagePart::new("2d", "fire")];
        let item = Item::new("w", "Broken", ItemKind::Weapon(weapon));
        let attack = describe_attack(&item, &ogre(), &ctx).unwrap();
        assert_eq!(attack.damage[0].average, 0);
        assert_eq!(attack.damage[0].formula, "2d");
        assert_eq!(notifier.messages().len(), 1);
    }

    #[test]
    fn test_spell_attacks_use_spellcasting_ability() {
        let mut record = ogre();
        record.abilities.insert(Ability::Charisma, AbilityScore::new(18));
        record.attributes.spellcasting = Some(Ability::Charisma);
        let weapon = WeaponData {
            action_type: ActionType::Rsak,
            ..WeaponData::default()
        };
        assert_eq!(attack_ability(&weapon, &record), Ability::Charisma);
        assert_eq!(attack_bonus(&weapon, &record), 6);
    }

    #[test]
    fn test_non_weapons_have_no_attack() {
        let ctx = SheetContext::default();
        let item = Item::new("f", "Keen Smell", ItemKind::Feat);
        assert!(describe_attack(&item, &ogre(), &ctx).is_none());
    }
}
