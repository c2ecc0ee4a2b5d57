//! Sheet edits to a flat update map.
//!
//! The renderer reports each edited field with its dotted data path and
//! declared type. [`collect_updates`] coerces the values and flattens them
//! into [`Updates`], which the host hands to its own persistence API.

use crate::format::parse_challenge_rating;
use crate::record::{CharacterRecord, ItemId, ProficiencyLevel, RecordError, Skill};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from turning sheet edits into updates.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Edit has an empty field key")]
    EmptyKey,
    #[error("Field {key} expects a number, got {value:?}")]
    NotANumber { key: String, value: String },
    #[error("Field {key} expects true or false, got {value:?}")]
    NotABoolean { key: String, value: String },
    #[error("Updated record is invalid: {0}")]
    Record(#[from] RecordError),
}

/// Declared type of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
}

/// One edit reported by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SheetEdit {
    /// Free text typed into an editable field.
    Field {
        key: String,
        value: String,
        #[serde(default)]
        dtype: FieldType,
    },
    /// A choice picked from a dropdown.
    Select { key: String, value: String },
    Toggle { key: String, value: bool },
    /// A skill's new proficiency level.
    Skill { skill: Skill, level: ProficiencyLevel },
    /// A field on one of the actor's items.
    ItemField {
        item: ItemId,
        key: String,
        value: String,
        #[serde(default)]
        dtype: FieldType,
    },
}

impl SheetEdit {
    pub fn field(key: impl Into<String>, value: impl Into<String>, dtype: FieldType) -> Self {
        SheetEdit::Field {
            key: key.into(),
            value: value.into(),
            dtype,
        }
    }

    /// Advance a skill to its next proficiency level.
    pub fn cycle_skill(record: &CharacterRecord, skill: Skill) -> Self {
        let current = record
            .skills
            .get(&skill)
            .map(|entry| entry.value)
            .unwrap_or_default();
        SheetEdit::Skill {
            skill,
            level: current.cycle(),
        }
    }
}

/// Flattened updates: dotted path to new value, for the actor and per item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Updates {
    pub actor: BTreeMap<String, Value>,
    pub items: BTreeMap<ItemId, BTreeMap<String, Value>>,
}

impl Updates {
    pub fn is_empty(&self) -> bool {
        self.actor.is_empty() && self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.actor.get(key)
    }

    pub fn item(&self, id: &ItemId, key: &str) -> Option<&Value> {
        self.items.get(id).and_then(|fields| fields.get(key))
    }

    /// Apply the updates to a copy of `record`.
    ///
    /// A null value clears the field so it falls back to its default.
    pub fn apply(&self, record: &CharacterRecord) -> Result<CharacterRecord, SubmitError> {
        let mut root = serde_json::to_value(record).map_err(RecordError::from)?;
        for (key, value) in &self.actor {
            set_path(&mut root, key, value.clone());
        }

        if let Some(Value::Array(items)) = root.get_mut("items") {
            for item in items.iter_mut() {
                let id = item.get("id").and_then(Value::as_str).map(ItemId::new);
                if let Some(fields) = id.and_then(|id| self.items.get(&id)) {
                    for (key, value) in fields {
                        set_path(item, key, value.clone());
                    }
                }
            }
        }
        for id in self.items.keys() {
            if record.item(id).is_none() {
                tracing::warn!(item = %id, "update for an item the actor does not own");
            }
        }

        Ok(CharacterRecord::from_value(root)?)
    }
}

/// Coerce and flatten a batch of edits. Later edits to the same key win.
pub fn collect_updates(edits: &[SheetEdit]) -> Result<Updates, SubmitError> {
    let mut updates = Updates::default();
    for edit in edits {
        match edit {
            SheetEdit::Field { key, value, dtype } => {
                let value = coerce(key, value, *dtype)?;
                updates.actor.insert(key.clone(), value);
            }
            SheetEdit::Select { key, value } => {
                check_key(key)?;
                updates.actor.insert(key.clone(), Value::String(value.clone()));
            }
            SheetEdit::Toggle { key, value } => {
                check_key(key)?;
                updates.actor.insert(key.clone(), Value::Bool(*value));
            }
            SheetEdit::Skill { skill, level } => {
                updates
                    .actor
                    .insert(format!("skills.{}.value", skill.id()), number(level.multiplier()));
            }
            SheetEdit::ItemField {
                item,
                key,
                value,
                dtype,
            } => {
                let value = coerce(key, value, *dtype)?;
                updates
                    .items
                    .entry(item.clone())
                    .or_default()
                    .insert(key.clone(), value);
            }
        }
    }
    tracing::debug!(
        actor_fields = updates.actor.len(),
        items = updates.items.len(),
        "collected sheet updates"
    );
    Ok(updates)
}

fn check_key(key: &str) -> Result<(), SubmitError> {
    if key.trim().is_empty() {
        Err(SubmitError::EmptyKey)
    } else {
        Ok(())
    }
}

fn coerce(key: &str, value: &str, dtype: FieldType) -> Result<Value, SubmitError> {
    check_key(key)?;
    if let Some(special) = special_value(key, value) {
        return Ok(special);
    }

    let text = value.trim();
    match dtype {
        FieldType::String => Ok(Value::String(value.to_string())),
        FieldType::Number if text.is_empty() => Ok(Value::Null),
        FieldType::Number => text
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(number)
            .ok_or_else(|| SubmitError::NotANumber {
                key: key.to_string(),
                value: value.to_string(),
            }),
        FieldType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" | "" => Ok(Value::Bool(false)),
            _ => Err(SubmitError::NotABoolean {
                key: key.to_string(),
                value: value.to_string(),
            }),
        },
    }
}

/// Fields whose text needs translating before the declared type applies.
fn special_value(key: &str, value: &str) -> Option<Value> {
    match key {
        "details.cr" if value.contains('/') => parse_challenge_rating(value).map(number),
        _ => None,
    }
}

/// Whole numbers stay integers in the update map.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let Some(map) = as_object(root) else {
        return;
    };
    match path.split_once('.') {
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        }
        None if value.is_null() => {
            map.remove(path);
        }
        None => {
            map.insert(path.to_string(), value);
        }
    }
}

/// The value as an object, replacing anything else with an empty one.
fn as_object(value: &mut Value) -> Option<&mut Map<String, Value>> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Item, ItemKind, SkillEntry, Uses};
    use serde_json::json;

    #[test]
    fn test_field_types() {
        let updates = collect_updates(&[
            SheetEdit::field("name", "Ancient Red Dragon", FieldType::String),
            SheetEdit::field("attributes.hp.value", " 256 ", FieldType::Number),
            SheetEdit::field("details.xp", "18,000", FieldType::Number),
            SheetEdit::field("attributes.movement.hover", "True", FieldType::Boolean),
        ])
        .unwrap();
        assert_eq!(updates.get("name"), Some(&json!("Ancient Red Dragon")));
        assert_eq!(updates.get("attributes.hp.value"), Some(&json!(256)));
        assert_eq!(updates.get("details.xp"), Some(&json!(18000)));
        assert_eq!(updates.get("attributes.movement.hover"), Some(&json!(true)));
    }

    #[test]
    fn test_empty_number_is_null() {
        let updates =
            collect_updates(&[SheetEdit::field("attributes.spelldc", "", FieldType::Number)]).unwrap();
        assert_eq!(updates.get("attributes.spelldc"), Some(&Value::Null));
    }

    #[test]
    fn test_bad_values_are_errors() {
        let err = collect_updates(&[SheetEdit::field("attributes.prof", "lots", FieldType::Number)]).unwrap_err();
        assert!(matches!(err, SubmitError::NotANumber { .. }));
        let err = collect_updates(&[SheetEdit::field("flag", "maybe", FieldType::Boolean)]).unwrap_err();
        assert!(matches!(err, SubmitError::NotABoolean { .. }));
        let err = collect_updates(&[SheetEdit::Toggle {
            key: " ".to_string(),
            value: true,
        }])
        .unwrap_err();
        assert!(matches!(err, SubmitError::EmptyKey));
    }

    #[test]
    fn test_challenge_rating_fractions() {
        for (text, cr) in [("1/8", 0.125), ("1/4", 0.25), ("1/2", 0.5)] {
            let updates = collect_updates(&[SheetEdit::field("details.cr", text, FieldType::Number)]).unwrap();
            assert_eq!(updates.get("details.cr"), Some(&json!(cr)));
        }
        let updates = collect_updates(&[SheetEdit::field("details.cr", "17", FieldType::Number)]).unwrap();
        assert_eq!(updates.get("details.cr"), Some(&json!(17)));
        // Other fractions are not challenge ratings
        assert!(collect_updates(&[SheetEdit::field("details.cr", "3/4", FieldType::Number)]).is_err());
    }

    #[test]
    fn test_select_toggle_and_skill_edits() {
        let mut record = CharacterRecord::new("Scout");
        record.skills.insert(
            Skill::Stealth,
            SkillEntry {
                value: ProficiencyLevel::Expertise,
                ability: None,
            },
        );
        let updates = collect_updates(&[
            SheetEdit::Select {
                key: "attributes.spellcasting".to_string(),
                value: "wis".to_string(),
            },
            SheetEdit::Toggle {
                key: "abilities.dex.proficient".to_string(),
                value: true,
            },
            SheetEdit::cycle_skill(&record, Skill::Perception),
            SheetEdit::cycle_skill(&record, Skill::Stealth),
        ])
        .unwrap();
        assert_eq!(updates.get("attributes.spellcasting"), Some(&json!("wis")));
        assert_eq!(updates.get("abilities.dex.proficient"), Some(&json!(true)));
        assert_eq!(updates.get("skills.prc.value"), Some(&json!(1)));
        assert_eq!(updates.get("skills.ste.value"), Some(&json!(0.5)));
    }

    #[test]
    fn test_item_fields_are_grouped_by_item() {
        let updates = collect_updates(&[
            SheetEdit::ItemField {
                item: ItemId::new("breath"),
                key: "uses.value".to_string(),
                value: "0".to_string(),
                dtype: FieldType::Number,
            },
            SheetEdit::ItemField {
                item: ItemId::new("arrows"),
                key: "quantity".to_string(),
                value: "19".to_string(),
                dtype: FieldType::Number,
            },
        ])
        .unwrap();
        assert_eq!(updates.item(&ItemId::new("breath"), "uses.value"), Some(&json!(0)));
        assert_eq!(updates.item(&ItemId::new("arrows"), "quantity"), Some(&json!(19)));
        assert!(updates.actor.is_empty());
    }

    #[test]
    fn test_apply_updates_to_record() {
        let mut record = CharacterRecord::new("Dragon");
        record.items = vec![Item::new("breath", "Fire Breath", ItemKind::Feat).with_uses(Uses::per_day(1))];
        let updates = collect_updates(&[
            SheetEdit::field("attributes.hp.value", "100", FieldType::Number),
            SheetEdit::field("details.cr", "1/4", FieldType::Number),
            SheetEdit::Skill {
                skill: Skill::Perception,
                level: ProficiencyLevel::Expertise,
            },
            SheetEdit::ItemField {
                item: ItemId::new("breath"),
                key: "uses.value".to_string(),
                value: "0".to_string(),
                dtype: FieldType::Number,
            },
        ])
        .unwrap();
        let updated = updates.apply(&record).unwrap();
        assert_eq!(updated.attributes.hp.value, 100);
        assert_eq!(updated.details.cr, 0.25);
        assert_eq!(updated.skills[&Skill::Perception].value, ProficiencyLevel::Expertise);
        assert_eq!(updated.items[0].uses.as_ref().unwrap().value, Some(0));
        // The input record is untouched
        assert_eq!(record.attributes.hp.value, 0);
    }

    #[test]
    fn test_edits_deserialize_from_renderer_json() {
        let edits: Vec<SheetEdit> = serde_json::from_str(
            r#"[
                {"kind": "field", "key": "details.cr", "value": "1/2", "dtype": "Number"},
                {"kind": "toggle", "key": "abilities.str.proficient", "value": false},
                {"kind": "skill", "skill": "ath", "level": 1}
            ]"#,
        )
        .unwrap();
        let updates = collect_updates(&edits).unwrap();
        assert_eq!(updates.get("details.cr"), Some(&json!(0.5)));
        assert_eq!(updates.get("skills.ath.value"), Some(&json!(1)));
    }
}
