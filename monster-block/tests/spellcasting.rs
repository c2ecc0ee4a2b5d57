//! Integration tests for spellbooks and casting features.
//!
//! Run with: `cargo test -p monster-block --test spellcasting`

use monster_block::casting::CastingDescription;
use monster_block::classify::{CastingType, FeatureCategory};
use monster_block::sheet::{SheetView, ViewBuilder};
use monster_block::spellbook::SectionKind;
use monster_block::testing::{assert_orders, sample_drow, sample_mage, sample_warlock};
use monster_block::{CharacterRecord, ItemId};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn casting(view: &SheetView) -> &CastingDescription {
    let section = view.section(FeatureCategory::Casting).expect("casting section");
    section.items[0].casting.as_ref().expect("casting description")
}

fn build(record: &CharacterRecord) -> SheetView {
    ViewBuilder::default().build(record)
}

// =============================================================================
// Standard casters
// =============================================================================

#[test]
fn test_mage_strata() {
    setup();
    let view = build(&sample_mage());
    let casting = casting(&view);

    assert_eq!(casting.casting_type, CastingType::Standard);
    assert_orders(&casting.spellbook, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

    let cantrips = &casting.spellbook[0];
    assert_eq!(cantrips.label, "Cantrips");
    assert_eq!(cantrips.slot_label.as_deref(), Some("at will"));
    assert_eq!(cantrips.spells.len(), 3);

    let third = &casting.spellbook[3];
    assert_eq!(third.label, "3rd level");
    assert_eq!(third.slot_label.as_deref(), Some("(3 slots)"));
    assert_eq!(third.slot_key.as_deref(), Some("spells.spell3"));
    let names: Vec<_> = third.spells.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Counterspell", "Fireball"]);
}

#[test]
fn test_mage_casting_text() {
    let view = build(&sample_mage());
    let casting = casting(&view);

    assert_eq!(casting.level, "The Mage is a 9th-level spellcaster.");
    assert_eq!(casting.stats, "(spell save DC 14, +6 to hit with spell attacks).");
    assert_eq!(casting.at_will.len(), 1);
    assert_eq!(casting.at_will[0].id, ItemId::new("detect-magic"));
    assert!(casting.warlock_recharge.is_none());

    // At-will spells stay out of the numbered strata
    assert!(casting
        .spellbook
        .iter()
        .all(|s| s.spells.iter().all(|spell| spell.id != ItemId::new("detect-magic"))));

    assert!(view.info.is_spellcaster);
    assert!(view.info.has_at_will_spells);
    assert!(view.info.has_casting_feature);
    assert!(!view.info.is_warlock);
}

#[test]
fn test_mage_dagger() {
    let view = build(&sample_mage());
    let attacks = view.section(FeatureCategory::Attack).unwrap();
    let dagger = attacks.items[0].attack.as_ref().unwrap();
    assert_eq!(dagger.attack_type, "Melee or Ranged Weapon Attack");
    assert_eq!(dagger.to_hit, "+5 to hit");
    assert_eq!(dagger.range, "reach 5 ft or range 20/60 ft.");
}

#[test]
fn test_full_spellbook_keeps_every_spell() {
    let record = sample_mage();
    let view = build(&record);
    let listed: usize = view.spellbook.iter().map(|s| s.spells.len()).sum();
    assert_eq!(listed, record.spells().count());
    assert_eq!(view.spellbook[0].kind, SectionKind::AtWill);
}

// =============================================================================
// Pact casters
// =============================================================================

#[test]
fn test_warlock_pact_stratum() {
    setup();
    let view = build(&sample_warlock());
    let casting = casting(&view);

    assert_eq!(casting.casting_type, CastingType::Pact);
    assert_orders(&casting.spellbook, &[0.0, 0.5]);

    let pact = &casting.spellbook[1];
    assert_eq!(pact.kind, SectionKind::Pact);
    assert_eq!(pact.max_spell_level, 5);
    assert_eq!(pact.label, "1st-5th level");
    assert_eq!(pact.slot_label.as_deref(), Some("(4 5th-level slots)"));
    assert_eq!(pact.slot_key.as_deref(), Some("spells.pact"));
    assert_eq!(pact.spells.len(), 4);

    assert_eq!(casting.attack_bonus, 7);
    assert!(casting.warlock_recharge.is_some());
    assert!(view.info.is_warlock);
}

// =============================================================================
// Innate casters
// =============================================================================

#[test]
fn test_drow_innate_strata() {
    setup();
    let view = build(&sample_drow());
    let casting = casting(&view);

    assert_eq!(casting.casting_type, CastingType::Innate);
    assert!(casting.level.is_empty());
    assert_eq!(casting.stats, "(spell save DC 11, +3 to hit with spell attacks).");

    let labels: Vec<_> = casting.spellbook.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["At will", "1/day each"]);
    assert_eq!(casting.spellbook[1].spells.len(), 2);
    assert_eq!(casting.spellbook[1].max_spell_level, 2);

    assert_eq!(view.innate_spellbook, casting.spellbook);
    assert!(view.info.is_innate_spellcaster);
    assert!(!view.info.is_spellcaster);
}
