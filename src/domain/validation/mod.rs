//! Coercion of untyped form and query input into typed payloads.
//!
//! Every mutation and filter has exactly one payload type in [`schemas`]
//! with a `parse` function returning either the payload or a map of
//! field name to first error message. Raw maps never travel further.

pub mod schemas;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::domain::models::action::FieldErrors;

const AMOUNT_SCALE: i64 = 2;
const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Flat, possibly multi-valued field map as submitted by a form or query
/// string. Order of repeated keys is preserved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl From<Vec<(String, String)>> for FormData {
    fn from(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }
}

impl FormData {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads fields out of a [`FormData`], recording coercion failures as it
/// goes so that all problems are reported at once.
pub struct FieldReader<'a> {
    form: &'a FormData,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(form: &'a FormData) -> Self {
        Self { form, errors: FieldErrors::new() }
    }

    /// Trimmed value, or an empty string when absent.
    pub fn text(&self, name: &str) -> String {
        self.form.get(name).map(str::trim).unwrap_or_default().to_string()
    }

    /// Trimmed value; absent and blank both read as `None`.
    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.form
            .get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Untrimmed value, for secrets.
    pub fn raw(&self, name: &str) -> String {
        self.form.get(name).unwrap_or_default().to_string()
    }

    pub fn optional_id(&mut self, name: &str) -> Option<i64> {
        let raw = self.optional_text(name)?;
        match raw.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.reject(name, "Expected a number");
                None
            }
        }
    }

    pub fn optional_datetime(&mut self, name: &str) -> Option<DateTime<Utc>> {
        let raw = self.optional_text(name)?;
        match parse_datetime(&raw) {
            Some(value) => Some(value),
            None => {
                self.reject(name, "Invalid date");
                None
            }
        }
    }

    /// Decimal amount, normalized to its plain string form.
    /// Amount with at most two decimals and below 10^12, the range both
    /// engines store exactly.
    pub fn optional_decimal(&mut self, name: &str) -> Option<String> {
        let raw = self.optional_text(name)?;
        let Ok(value) = BigDecimal::from_str(&raw.replace(',', "")) else {
            self.reject(name, "Invalid amount");
            return None;
        };
        let (_, scale) = value.normalized().as_bigint_and_exponent();
        if scale > AMOUNT_SCALE {
            self.reject(name, "Use at most two decimals");
            return None;
        }
        if value.abs() >= BigDecimal::from(AMOUNT_LIMIT) {
            self.reject(name, "Amount is too large");
            return None;
        }
        Some(value.to_plain_string())
    }

    /// Enum field that falls back to its default when absent or unknown.
    pub fn enum_or_default<T: FromStr + Default>(&self, name: &str) -> T {
        self.optional_text(name)
            .and_then(|raw| raw.to_uppercase().parse().ok())
            .unwrap_or_default()
    }

    pub fn reject(&mut self, name: &str, message: &str) {
        self.errors
            .entry(name.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Runs the payload's declarative constraints and merges their errors
    /// with the coercion errors collected so far.
    pub fn finish<T: Validate>(self, payload: T) -> Result<T, FieldErrors> {
        let mut errors = self.errors;
        if let Err(validation) = payload.validate() {
            for (field, message) in first_messages(&validation) {
                errors.entry(field).or_insert(message);
            }
        }
        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(errors)
        }
    }
}

/// Accepts RFC 3339, `datetime-local` (`YYYY-MM-DDTHH:MM[:SS]`, read as UTC)
/// and plain dates (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| value.and_utc())
}

/// Positive integer identifier used by delete forms.
pub fn parse_identifier(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|id| *id > 0)
}

/// Positive page number; anything else reads as the first page.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

fn first_messages(errors: &ValidationErrors) -> Vec<(String, String)> {
    errors
        .field_errors()
        .iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string());
                (to_camel_case(field), message)
            })
        })
        .collect()
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
