//! Turns raw database errors from failed inserts into actionable messages
//!
//! Matching is purely textual and covers both MySQL and SQLite phrasings.
//! Nothing here retries; the output is advisory.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static FK_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"FOREIGN KEY \(`([^`]+)`\) REFERENCES `([^`]+)` \(`([^`]+)`\)").unwrap()
});

static NO_DEFAULT_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"Field '([^']+)'").unwrap());

static CANNOT_BE_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Column '([^']+)' cannot be null").unwrap());

static SQLITE_NOT_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"NOT NULL constraint failed: (?:[^.\s]+\.)?(\S+)").unwrap());

static INCORRECT_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Incorrect (\w+) value").unwrap());

static FOR_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"for column '([^']+)'").unwrap());

static DUPLICATE_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Duplicate entry '([^']*)'").unwrap());

static SQLITE_UNIQUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UNIQUE constraint failed: ([^\s,]+)").unwrap());

static UNKNOWN_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Unknown column '([^']+)'").unwrap());

static SQLITE_NO_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"has no column named (\S+)").unwrap());

/// Categories in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ForeignKey,
    MissingRequiredField,
    TypeMismatch,
    DuplicateKey,
    UnknownColumn,
    Other,
}

/// A translated insert failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: ErrorCategory,
    pub message: String,
}

impl Diagnostic {
    fn new(category: ErrorCategory, message: String) -> Self {
        Diagnostic { category, message }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Translate the raw error `message` raised while inserting into `table`
pub fn translate_error(message: &str, table: &str) -> Diagnostic {
    let lower = message.to_lowercase();

    if lower.contains("foreign key constraint fail") {
        let text = match FK_REFERENCE.captures(message) {
            Some(caps) => format!(
                "Data mapping incorrect: {}.{} references {}.{}, but parent record doesn't exist. \
                 Check your table relationships and ensure parent tables are populated first.",
                table, &caps[1], &caps[2], &caps[3]
            ),
            None => format!(
                "Data mapping incorrect: Foreign key constraint failed for {}. Check your table relationships.",
                table
            ),
        };
        return Diagnostic::new(ErrorCategory::ForeignKey, text);
    }

    let missing_field = if lower.contains("doesn't have a default value") {
        Some(NO_DEFAULT_FIELD.captures(message).map(|c| c[1].to_string()))
    } else if lower.contains("cannot be null") {
        Some(CANNOT_BE_NULL.captures(message).map(|c| c[1].to_string()))
    } else if lower.contains("not null constraint failed") {
        Some(SQLITE_NOT_NULL.captures(message).map(|c| c[1].to_string()))
    } else {
        None
    };
    if let Some(field) = missing_field {
        let text = match field {
            Some(field) => format!(
                "Data mapping incorrect: Required field '{}' in {} is missing. \
                 Map a source field to this column or make it nullable.",
                field, table
            ),
            None => format!("Data mapping incorrect: Required field missing in {}", table),
        };
        return Diagnostic::new(ErrorCategory::MissingRequiredField, text);
    }

    if (message.contains("Incorrect") && message.contains("value")) || lower.contains("datatype mismatch") {
        let text = match (INCORRECT_TYPE.captures(message), FOR_COLUMN.captures(message)) {
            (Some(ty), Some(col)) => format!(
                "Data type mismatch: Column '{}' in {} expects {} but received incompatible data. \
                 Check your source data format.",
                &col[1], table, &ty[1]
            ),
            _ => format!(
                "Data type mismatch in {}. Check your field mappings and data formats.",
                table
            ),
        };
        return Diagnostic::new(ErrorCategory::TypeMismatch, text);
    }

    if message.contains("Duplicate entry") || lower.contains("unique constraint failed") {
        let duplicate = DUPLICATE_ENTRY
            .captures(message)
            .or_else(|| SQLITE_UNIQUE.captures(message))
            .map(|c| c[1].to_string());
        let text = match duplicate {
            Some(value) => format!(
                "Duplicate value: '{}' already exists in {}. \
                 This may indicate the same data is being processed twice.",
                value, table
            ),
            None => format!("Duplicate entry in {}", table),
        };
        return Diagnostic::new(ErrorCategory::DuplicateKey, text);
    }

    if message.contains("Unknown column") || lower.contains("has no column named") {
        let column = UNKNOWN_COLUMN
            .captures(message)
            .or_else(|| SQLITE_NO_COLUMN.captures(message))
            .map(|c| c[1].to_string());
        let text = match column {
            Some(column) => format!(
                "Configuration error: Column '{}' doesn't exist in {}. \
                 The mapping may reference an old schema - try recreating the table.",
                column, table
            ),
            None => format!("Column mismatch in {}", table),
        };
        return Diagnostic::new(ErrorCategory::UnknownColumn, text);
    }

    Diagnostic::new(
        ErrorCategory::Other,
        format!("Error inserting into {}: {}", table, message),
    )
}
