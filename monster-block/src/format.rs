//! Number and text formatting for stat blocks.

use crate::i18n::Localization;

/// Insert thousands separators into the integer part of a number.
///
/// `18000` becomes `18,000`; the fractional part of `1234.5678` is left alone.
pub fn format_number_commas(number: impl ToString) -> String {
    let text = number.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.find('.') {
        Some(pos) => unsigned.split_at(pos),
        None => (unsigned, ""),
    };
    if !integer.chars().all(|c| c.is_ascii_digit()) {
        return text;
    }

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}{grouped}{fraction}")
}

/// Ordinal suffix from a locale-supplied table.
///
/// The table lists suffixes for 1, 2, 3, ... in order. Numbers past the end
/// take the last suffix; numbers below one, or an empty table, take none.
pub fn ordinal_suffix(number: i64, suffixes: &[String]) -> String {
    if number < 1 {
        return String::new();
    }
    let index = (number as usize).min(suffixes.len());
    match index.checked_sub(1).and_then(|i| suffixes.get(i)) {
        Some(suffix) => suffix.clone(),
        None => String::new(),
    }
}

/// A number followed by its ordinal suffix, e.g. `3rd`.
pub fn format_ordinal(number: i64, locale: &dyn Localization) -> String {
    let suffixes = locale.resolve_list("ordinal-suffixes");
    format!("{number}{}", ordinal_suffix(number, &suffixes))
}

/// Small counts as words ("two targets"); anything else as digits.
pub fn number_word(number: i64, locale: &dyn Localization) -> String {
    if (0..=9).contains(&number) {
        if let Some(word) = locale.resolve_list("number-words").get(number as usize) {
            return word.clone();
        }
    }
    number.to_string()
}

/// A signed modifier: `+3`, `-1`, `+0`.
pub fn signed(value: i64) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// Challenge rating as printed: fractions below one, integers above.
pub fn format_challenge_rating(cr: f64) -> String {
    match cr {
        c if c == 0.125 => "1/8".to_string(),
        c if c == 0.25 => "1/4".to_string(),
        c if c == 0.5 => "1/2".to_string(),
        c if c.fract() == 0.0 => format!("{}", c as i64),
        c => c.to_string(),
    }
}

/// Parse challenge rating text, accepting the printed fractions.
pub fn parse_challenge_rating(text: &str) -> Option<f64> {
    match text.trim() {
        "1/8" => Some(0.125),
        "1/4" => Some(0.25),
        "1/2" => Some(0.5),
        other => other.parse().ok().filter(|cr: &f64| *cr >= 0.0),
    }
}

const CR_EXP_LEVELS: [u64; 31] = [
    10, 200, 450, 700, 1100, 1800, 2300, 2900, 3900, 5000, 5900, 7200, 8400, 10000, 11500, 13000,
    15000, 18000, 20000, 22000, 25000, 33000, 41000, 50000, 62000, 75000, 90000, 105000, 120000,
    135000, 155000,
];

/// Experience awarded for a challenge rating.
pub fn xp_for_challenge_rating(cr: f64) -> u64 {
    if cr < 1.0 {
        return ((200.0 * cr) as u64).max(10);
    }
    let index = (cr as usize).min(CR_EXP_LEVELS.len() - 1);
    CR_EXP_LEVELS[index]
}

/// Lower-case and strip all whitespace, for locator matching.
pub fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

lazy_static::lazy_static! {
    static ref CONTINUOUS_DESCRIPTION: regex::Regex =
        regex::Regex::new(r"(?:^|^[^>]*>)(?:\s|&nbsp;|,|;|:|\.)")
            .expect("continuous description pattern is valid");
}

/// Whether a description reads as a continuation of the item's name
/// (starts with punctuation or a space, possibly inside an opening tag).
pub fn is_continuous_description(description: &str) -> bool {
    CONTINUOUS_DESCRIPTION.is_match(description)
}
