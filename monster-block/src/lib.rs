//! Stat-block view builder for D&D 5e monster sheets.
//!
//! This crate provides:
//! - Typed monster records read from the document store's JSON
//! - Classification of items into stat-block sections
//! - Attack, spellcasting and resource descriptions
//! - Spellbooks stratified for standard, pact and innate casters
//! - Conversion of sheet edits back into a flat update map
//!
//! # Quick Start
//!
//! ```ignore
//! use monster_block::{CharacterRecord, SheetContext, ViewBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let record = CharacterRecord::from_json(&std::fs::read_to_string("dragon.json")?)?;
//!
//!     let view = ViewBuilder::new(SheetContext::default()).build(&record);
//!     println!("{}", view.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod attack;
pub mod casting;
pub mod classify;
pub mod dice;
pub mod format;
pub mod i18n;
pub mod notify;
pub mod record;
pub mod resources;
pub mod sheet;
pub mod spellbook;
pub mod submit;
pub mod testing;

// Primary public API
pub use classify::{classify_items, CastingType, FeatureCategory};
pub use dice::{average_roll, DiceError, DiceEvaluator, EvaluationMode, RollData, StandardEvaluator};
pub use i18n::{LocaleTable, Localization};
pub use notify::{Notifier, TracingNotifier};
pub use record::{CharacterRecord, Item, ItemId, ItemKind, RecordError};
pub use resources::{resource_summary, ResourceSummary};
pub use sheet::{SheetContext, SheetFlags, SheetOptions, SheetView, ViewBuilder};
pub use spellbook::{build_spellbook, innate_spellbook, stratify_spellbook, Stratum};
pub use submit::{collect_updates, SheetEdit, SubmitError, Updates};
