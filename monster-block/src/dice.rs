//! Dice formulas for stat-block averages.
//!
//! Supports XdY terms (with keep highest/lowest), flat modifiers and
//! `@path` references into roll data, e.g. `2d6 + @mod`. Formulas can be
//! evaluated at their maximum, their minimum, or rolled.

use crate::notify::Notifier;
use crate::record::{Ability, CharacterRecord};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Cannot keep {keep} dice when only rolling {count} (in {notation})")]
    InvalidKeepCount {
        keep: u32,
        count: u32,
        notation: String,
    },
    #[error("Dice total out of range: {0}")]
    Overflow(String),
    #[error("Too many dice to roll: {0}")]
    TooManyDice(u32),
}

/// Most dice a single term may roll in random mode.
pub const MAX_ROLLED_DICE: u32 = 10_000;

/// How a formula is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Every die shows its highest face.
    Maximize,
    /// Every die shows a one.
    Minimize,
    Random,
}

/// Values that `@path` terms resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollData(BTreeMap<String, i64>);

impl RollData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll data for a monster: proficiency, spell DC, caster level and
    /// each ability's score and modifier.
    pub fn from_record(record: &CharacterRecord) -> Self {
        let mut data = Self::new()
            .with("prof", record.attributes.prof)
            .with("attributes.prof", record.attributes.prof)
            .with("attributes.spelldc", record.attributes.spelldc)
            .with("details.spell_level", record.details.spell_level as i64);
        for ability in Ability::all() {
            let score = record.ability(ability);
            data.insert(format!("abilities.{}.value", ability.id()), score.value);
            data.insert(format!("abilities.{}.mod", ability.id()), score.modifier());
        }
        data
    }

    pub fn with(mut self, key: impl Into<String>, value: i64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.get(key).copied()
    }
}

/// A single die component of a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceComponent {
    pub sign: i32,
    pub count: u32,
    pub faces: u32,
    pub keep_highest: Option<u32>,
    pub keep_lowest: Option<u32>,
}

impl DiceComponent {
    /// Number of dice that count towards the total.
    fn kept(&self) -> u32 {
        self.keep_highest.or(self.keep_lowest).unwrap_or(self.count)
    }

    fn notation(&self) -> String {
        let mut s = format!("{}d{}", self.count, self.faces);
        if let Some(keep) = self.keep_highest {
            s.push_str(&format!("kh{keep}"));
        } else if let Some(keep) = self.keep_lowest {
            s.push_str(&format!("kl{keep}"));
        }
        s
    }
}

/// A signed `@path` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataReference {
    pub sign: i32,
    pub path: String,
}

/// A complete dice expression (e.g., 2d6+3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub components: Vec<DiceComponent>,
    pub references: Vec<DataReference>,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut expr = DiceExpression {
            components: Vec::new(),
            references: Vec::new(),
            modifier: 0,
            original: notation.clone(),
        };
        let mut current = String::new();
        let mut sign: i32 = 1;
        let mut pending_operator = false;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        expr.parse_term(&current, sign)?;
                        current.clear();
                    } else if pending_operator {
                        return Err(DiceError::InvalidNotation(notation.clone()));
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                    pending_operator = true;
                }
                ' ' => continue,
                _ => {
                    current.push(ch);
                    pending_operator = false;
                }
            }
        }

        if pending_operator {
            return Err(DiceError::InvalidNotation(notation));
        }
        if !current.is_empty() {
            expr.parse_term(&current, sign)?;
        }

        if expr.components.is_empty() && expr.references.is_empty() && expr.modifier == 0 {
            // A literal zero is a valid (if dull) formula
            if !notation.chars().any(|c| c.is_ascii_digit()) {
                return Err(DiceError::NoDice);
            }
        }

        Ok(expr)
    }

    fn parse_term(&mut self, s: &str, sign: i32) -> Result<(), DiceError> {
        if let Some(path) = s.strip_prefix('@') {
            let valid = !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
            if !valid {
                return Err(DiceError::InvalidNotation(s.to_string()));
            }
            self.references.push(DataReference {
                sign,
                path: path.to_string(),
            });
            return Ok(());
        }

        if let Some(d_pos) = s.find('d') {
            let count_str = &s[..d_pos];
            let rest = &s[d_pos + 1..];

            let count: u32 = if count_str.is_empty() {
                1
            } else {
                count_str
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
            };

            let (faces_str, keep_highest, keep_lowest) = if let Some(kh_pos) = rest.find("kh") {
                let faces = &rest[..kh_pos];
                let keep: u32 = rest[kh_pos + 2..]
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
                (faces, Some(keep), None)
            } else if let Some(kl_pos) = rest.find("kl") {
                let faces = &rest[..kl_pos];
                let keep: u32 = rest[kl_pos + 2..]
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
                (faces, None, Some(keep))
            } else {
                (rest, None, None)
            };

            let faces: u32 = faces_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            if faces == 0 {
                return Err(DiceError::InvalidDieSize(faces));
            }

            // Validate keep count doesn't exceed dice count
            if let Some(keep) = keep_highest.or(keep_lowest) {
                if keep > count {
                    return Err(DiceError::InvalidKeepCount {
                        keep,
                        count,
                        notation: s.to_string(),
                    });
                }
            }

            self.components.push(DiceComponent {
                sign,
                count,
                faces,
                keep_highest,
                keep_lowest,
            });
        } else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            self.modifier = sign
                .checked_mul(value)
                .and_then(|signed| self.modifier.checked_add(signed))
                .ok_or_else(|| DiceError::Overflow(s.to_string()))?;
        }

        Ok(())
    }

    /// Sum of all flat modifiers once references are resolved.
    ///
    /// Unknown references count as zero.
    pub fn flat_total(&self, data: &RollData) -> Result<i64, DiceError> {
        self.references
            .iter()
            .try_fold(self.modifier as i64, |total, r| {
                let value = data.get(&r.path).unwrap_or_else(|| {
                    tracing::debug!(path = %r.path, formula = %self.original, "unresolved roll data reference");
                    0
                });
                (r.sign as i64)
                    .checked_mul(value)
                    .and_then(|signed| total.checked_add(signed))
            })
            .ok_or_else(|| self.overflow())
    }

    /// Evaluate at the bounds, or roll with thread-local randomness.
    pub fn evaluate(&self, data: &RollData, mode: EvaluationMode) -> Result<i64, DiceError> {
        self.evaluate_with_rng(data, mode, &mut rand::thread_rng())
    }

    /// Evaluate with a specific RNG (useful for testing).
    pub fn evaluate_with_rng<R: Rng>(
        &self,
        data: &RollData,
        mode: EvaluationMode,
        rng: &mut R,
    ) -> Result<i64, DiceError> {
        let mut total = self.flat_total(data)?;
        for component in &self.components {
            let subtotal = match mode {
                EvaluationMode::Maximize => (component.kept() as i64).checked_mul(component.faces as i64),
                EvaluationMode::Minimize => Some(component.kept() as i64),
                EvaluationMode::Random => {
                    if component.count > MAX_ROLLED_DICE {
                        return Err(DiceError::TooManyDice(component.count));
                    }
                    Some(roll_component(component, rng))
                }
            };
            total = subtotal
                .and_then(|subtotal| subtotal.checked_mul(component.sign as i64))
                .and_then(|signed| total.checked_add(signed))
                .ok_or_else(|| self.overflow())?;
        }
        Ok(total)
    }

    fn overflow(&self) -> DiceError {
        DiceError::Overflow(self.original.clone())
    }

    /// Formula text with references resolved and constants combined.
    ///
    /// Falls back to the original text when the constants overflow.
    pub fn simplified(&self, data: &RollData) -> String {
        let mut out = String::new();
        for component in &self.components {
            push_term(&mut out, component.sign, &component.notation());
        }
        let Ok(flat) = self.flat_total(data) else {
            return self.original.clone();
        };
        if flat != 0 || out.is_empty() {
            let sign = if flat < 0 { -1 } else { 1 };
            push_term(&mut out, sign, &flat.abs().to_string());
        }
        out
    }
}

fn roll_component<R: Rng>(component: &DiceComponent, rng: &mut R) -> i64 {
    let mut rolls: Vec<u32> = (0..component.count)
        .map(|_| rng.gen_range(1..=component.faces))
        .collect();
    if component.keep_highest.is_some() {
        rolls.sort_by(|a, b| b.cmp(a));
    } else if component.keep_lowest.is_some() {
        rolls.sort();
    }
    rolls.truncate(component.kept() as usize);
    rolls.iter().map(|r| *r as i64).sum()
}

fn push_term(out: &mut String, sign: i32, term: &str) {
    match (out.is_empty(), sign < 0) {
        (true, false) => out.push_str(term),
        (true, true) => {
            out.push('-');
            out.push_str(term);
        }
        (false, false) => {
            out.push_str(" + ");
            out.push_str(term);
        }
        (false, true) => {
            out.push_str(" - ");
            out.push_str(term);
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

// ============================================================================
// Evaluator seam
// ============================================================================

/// Evaluates dice formulas for the view builder.
pub trait DiceEvaluator {
    fn evaluate(&self, formula: &str, data: &RollData, mode: EvaluationMode) -> Result<i64, DiceError>;
}

/// Evaluator backed by [`DiceExpression`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEvaluator;

impl DiceEvaluator for StandardEvaluator {
    fn evaluate(&self, formula: &str, data: &RollData, mode: EvaluationMode) -> Result<i64, DiceError> {
        DiceExpression::parse(formula)?.evaluate(data, mode)
    }
}

/// Average result of a formula: the floor of (max + min) / 2.
///
/// An empty or absent formula averages to zero. A formula the evaluator
/// rejects also gives zero, and the failure goes to `notifier` once.
pub fn average_roll(
    formula: Option<&str>,
    data: &RollData,
    evaluator: &dyn DiceEvaluator,
    notifier: &dyn Notifier,
) -> i64 {
    let formula = match formula {
        Some(f) if !f.is_empty() => f,
        _ => return 0,
    };

    let sum = evaluator
        .evaluate(formula, data, EvaluationMode::Maximize)
        .and_then(|max| {
            let min = evaluator.evaluate(formula, data, EvaluationMode::Minimize)?;
            max.checked_add(min)
                .ok_or_else(|| DiceError::Overflow(formula.to_string()))
        });

    match sum {
        Ok(sum) => sum.div_euclid(2),
        Err(err) => {
            tracing::warn!(formula, error = %err, "could not average roll formula");
            notifier.error(&err.to_string());
            0
        }
    }
}

/// Display form of a formula; falls back to the raw text if it will not parse.
pub fn simplify_formula(formula: &str, data: &RollData) -> String {
    match DiceExpression::parse(formula) {
        Ok(expr) => expr.simplified(data),
        Err(_) => formula.to_string(),
    }
}
