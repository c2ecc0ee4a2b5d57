//! Testing utilities for stat-block views.
//!
//! This module provides tools for unit and integration tests:
//! - `RecordingNotifier` to observe reported failures
//! - `FailingEvaluator` to exercise formula error paths
//! - Sample monsters covering each kind of stat block
//! - Assertion helpers for built views

use crate::classify::FeatureCategory;
use crate::dice::{DiceError, DiceEvaluator, EvaluationMode, RollData};
use crate::notify::Notifier;
use crate::record::{
    Ability, AbilityScore, ActionType, ActivationType, CharacterRecord, Consume, ConsumeKind,
    DamagePart, Item, ItemId, ItemKind, PreparationMode, ProficiencyLevel, Range, ResourceValue,
    Skill, SkillEntry, SpellData, SpellSlot, Target, Uses, WeaponData,
};
use crate::sheet::SheetView;
use crate::spellbook::Stratum;
use std::cell::RefCell;

/// A notifier that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// An evaluator that rejects every formula.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEvaluator;

impl DiceEvaluator for FailingEvaluator {
    fn evaluate(&self, formula: &str, _data: &RollData, _mode: EvaluationMode) -> Result<i64, DiceError> {
        Err(DiceError::InvalidNotation(formula.to_string()))
    }
}

// ============================================================================
// Sample monsters
// ============================================================================

fn scores(record: &mut CharacterRecord, values: [i64; 6]) {
    for (ability, value) in Ability::all().into_iter().zip(values) {
        record.abilities.insert(ability, AbilityScore::new(value));
    }
}

fn proficient_saves(record: &mut CharacterRecord, abilities: &[Ability]) {
    for ability in abilities {
        if let Some(score) = record.abilities.get_mut(ability) {
            score.proficient = true;
        }
    }
}

fn skill(record: &mut CharacterRecord, skill: Skill, value: ProficiencyLevel) {
    record.skills.insert(skill, SkillEntry { value, ability: None });
}

fn slots(record: &mut CharacterRecord, key: &str, max: i64) {
    record.spells.insert(
        key.to_string(),
        SpellSlot {
            value: max,
            max,
            override_max: None,
            level: None,
        },
    );
}

fn spell(id: &str, name: &str, level: u8, mode: PreparationMode) -> Item {
    Item::new(id, name, ItemKind::Spell(SpellData::new(level, mode)))
}

fn melee(id: &str, name: &str, reach: u32, parts: &[(&str, &str)]) -> Item {
    let mut weapon = WeaponData::default();
    weapon.damage.parts = parts.iter().map(|(f, t)| DamagePart::new(*f, *t)).collect();
    weapon.range = Range {
        value: Some(reach),
        long: None,
        units: "ft".to_string(),
    };
    weapon.target = Target {
        value: Some(1),
        width: None,
        kind: String::new(),
    };
    Item::new(id, name, ItemKind::Weapon(weapon)).with_activation(ActivationType::Action)
}

/// An adult red dragon: legendary actions, lair actions and breath weapon.
pub fn sample_dragon() -> CharacterRecord {
    let mut record = CharacterRecord::new("Adult Red Dragon");
    scores(&mut record, [27, 10, 25, 16, 13, 21]);
    proficient_saves(
        &mut record,
        &[Ability::Dexterity, Ability::Constitution, Ability::Wisdom, Ability::Charisma],
    );
    skill(&mut record, Skill::Perception, ProficiencyLevel::Expertise);
    skill(&mut record, Skill::Stealth, ProficiencyLevel::Proficient);

    record.attributes.prof = 6;
    record.attributes.hp.value = 256;
    record.attributes.hp.max = 256;
    record.attributes.hp.formula = "19d12+133".to_string();
    record.attributes.movement.walk = 40;
    record.attributes.movement.climb = 40;
    record.attributes.movement.fly = 80;
    record.attributes.senses.blindsight = 60;
    record.attributes.senses.darkvision = 120;
    record.details.cr = 17.0;
    record.resources.insert("legres".to_string(), ResourceValue { value: 3, max: 3 });
    record.resources.insert("legact".to_string(), ResourceValue { value: 3, max: 3 });
    record.traits.di.value = vec!["fire".to_string()];
    record.traits.languages.value = vec!["common".to_string(), "draconic".to_string()];

    record.items = vec![
        Item::new("legendary-resistance", "Legendary Resistance (3/Day)", ItemKind::Feat)
            .with_activation(ActivationType::Special)
            .with_consume(Consume::new(ConsumeKind::Attribute, "resources.legres.value")),
        Item::new("multiattack", "Multiattack", ItemKind::Feat)
            .with_activation(ActivationType::Action)
            .with_description("<p>The dragon can use its Frightful Presence. It then makes three attacks.</p>"),
        melee("bite", "Bite", 10, &[("2d10 + @mod", "piercing"), ("2d6", "fire")]),
        melee("claw", "Claw", 5, &[("2d6 + @mod", "slashing")]),
        Item::new("frightful-presence", "Frightful Presence", ItemKind::Feat).with_activation(ActivationType::Action),
        Item::new("fire-breath", "Fire Breath", ItemKind::Feat)
            .with_activation(ActivationType::Action)
            .with_recharge(5),
        Item::new("detect", "Detect", ItemKind::Feat).with_activation(ActivationType::Legendary),
        melee("tail", "Tail Attack", 15, &[("2d8 + @mod", "bludgeoning")]).with_activation(ActivationType::Legendary),
        Item::new("magma", "Magma Eruption", ItemKind::Feat).with_activation(ActivationType::Lair),
        Item::new("hoard", "Dragon Hoard", ItemKind::Loot).with_quantity(1),
    ];
    record
}

/// A ninth-level wizard with a full slot table and a few at-will spells.
pub fn sample_mage() -> CharacterRecord {
    let mut record = CharacterRecord::new("Mage");
    scores(&mut record, [9, 14, 11, 17, 12, 11]);
    proficient_saves(&mut record, &[Ability::Intelligence, Ability::Wisdom]);
    skill(&mut record, Skill::Arcana, ProficiencyLevel::Proficient);
    skill(&mut record, Skill::History, ProficiencyLevel::Proficient);

    record.attributes.prof = 3;
    record.attributes.spelldc = 14;
    record.attributes.spellcasting = Some(Ability::Intelligence);
    record.attributes.hp.value = 40;
    record.attributes.hp.max = 40;
    record.attributes.hp.formula = "9d8".to_string();
    record.details.cr = 6.0;
    record.details.spell_level = 9;
    for (level, max) in [(1, 4), (2, 3), (3, 3), (4, 3), (5, 1)] {
        slots(&mut record, &format!("spell{level}"), max);
    }

    let mut dagger = WeaponData {
        action_type: ActionType::Mwak,
        ..WeaponData::default()
    };
    dagger.properties.finesse = true;
    dagger.properties.thrown = true;
    dagger.damage.parts = vec![DamagePart::new("1d4 + @mod", "piercing")];
    dagger.range = Range {
        value: Some(20),
        long: Some(60),
        units: "ft".to_string(),
    };
    dagger.target.width = Some(5);

    record.items = vec![
        Item::new("spellcasting", "Spellcasting", ItemKind::Feat)
            .with_description("<p>The mage is a 9th-level spellcaster.</p>"),
        Item::new("dagger", "Dagger", ItemKind::Weapon(dagger)).with_activation(ActivationType::Action),
        spell("fire-bolt", "Fire Bolt", 0, PreparationMode::Prepared),
        spell("light", "Light", 0, PreparationMode::Prepared),
        spell("mage-hand", "Mage Hand", 0, PreparationMode::Prepared),
        spell("detect-magic", "Detect Magic", 1, PreparationMode::Atwill),
        spell("magic-missile", "Magic Missile", 1, PreparationMode::Prepared),
        spell("shield", "Shield", 1, PreparationMode::Prepared),
        spell("misty-step", "Misty Step", 2, PreparationMode::Prepared),
        spell("counterspell", "Counterspell", 3, PreparationMode::Prepared),
        spell("fireball", "Fireball", 3, PreparationMode::Prepared),
        spell("greater-invisibility", "Greater Invisibility", 4, PreparationMode::Prepared),
        spell("cone-of-cold", "Cone of Cold", 5, PreparationMode::Always),
    ];
    record
}

/// A fiend that casts through pact magic.
pub fn sample_warlock() -> CharacterRecord {
    let mut record = CharacterRecord::new("Warlock of the Fiend");
    scores(&mut record, [10, 14, 15, 12, 12, 18]);
    record.attributes.prof = 3;
    record.attributes.spelldc = 15;
    record.attributes.spellcasting = Some(Ability::Charisma);
    record.details.cr = 7.0;
    record.details.spell_level = 17;
    record.spells.insert(
        "pact".to_string(),
        SpellSlot {
            value: 4,
            max: 4,
            override_max: None,
            level: Some(5),
        },
    );

    record.items = vec![
        Item::new("spellcasting", "Spellcasting", ItemKind::Feat)
            .with_description("<p>The warlock is a 17th-level spellcaster. It regains its expended spell slots when it finishes a short or long rest.</p>"),
        spell("eldritch-blast", "Eldritch Blast", 0, PreparationMode::Prepared),
        spell("fire-bolt", "Fire Bolt", 0, PreparationMode::Prepared),
        spell("mage-armor", "Mage Armor", 1, PreparationMode::Atwill),
        spell("burning-hands", "Burning Hands", 1, PreparationMode::Pact),
        spell("scorching-ray", "Scorching Ray", 2, PreparationMode::Pact),
        spell("fireball", "Fireball", 3, PreparationMode::Pact),
        spell("hellish-rebuke", "Hellish Rebuke", 5, PreparationMode::Pact),
    ];
    record
}

/// A drow with innate spellcasting and a crossbow that spends bolts.
pub fn sample_drow() -> CharacterRecord {
    let mut record = CharacterRecord::new("Drow");
    scores(&mut record, [10, 14, 10, 11, 11, 12]);
    skill(&mut record, Skill::Perception, ProficiencyLevel::Proficient);
    skill(&mut record, Skill::Stealth, ProficiencyLevel::Proficient);
    record.attributes.prof = 2;
    record.attributes.spelldc = 11;
    record.attributes.spellcasting = Some(Ability::Charisma);
    record.attributes.senses.darkvision = 120;
    record.details.cr = 0.25;
    record.traits.languages.value = vec!["elvish".to_string(), "undercommon".to_string()];

    let mut crossbow = WeaponData {
        action_type: ActionType::Rwak,
        ..WeaponData::default()
    };
    crossbow.damage.parts = vec![DamagePart::new("1d6 + @mod", "piercing")];
    crossbow.range = Range {
        value: Some(30),
        long: Some(120),
        units: "ft".to_string(),
    };

    record.items = vec![
        Item::new("innate", "Innate Spellcasting", ItemKind::Feat),
        melee("shortsword", "Shortsword", 5, &[("1d6 + @mod", "piercing")]),
        Item::new("hand-crossbow", "Hand Crossbow", ItemKind::Weapon(crossbow))
            .with_activation(ActivationType::Action)
            .with_consume(Consume::new(ConsumeKind::Ammo, "bolts")),
        Item::new("bolts", "Crossbow Bolts", ItemKind::Consumable).with_quantity(20),
        spell("dancing-lights", "Dancing Lights", 0, PreparationMode::Innate),
        spell("darkness", "Darkness", 2, PreparationMode::Innate).with_uses(Uses::per_day(1)),
        spell("faerie-fire", "Faerie Fire", 1, PreparationMode::Innate).with_uses(Uses::per_day(1)),
    ];
    record
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert that an item was placed in the given section.
pub fn assert_in_section(view: &SheetView, category: FeatureCategory, id: &str) {
    let section = view
        .section(category)
        .unwrap_or_else(|| panic!("No {} section in view", category.key()));
    assert!(
        section.items.iter().any(|item| item.id == ItemId::new(id)),
        "Expected {id} in the {} section",
        category.key()
    );
}

/// Assert the order keys of a list of strata.
pub fn assert_orders(strata: &[Stratum], expected: &[f64]) {
    let orders: Vec<f64> = strata.iter().map(|s| s.order).collect();
    assert_eq!(orders, expected, "Unexpected spellbook strata");
}
