//! SQL rendering for the statements the engine builds by hand
//!
//! Table and column names cannot be bound as parameters, so they are quoted
//! here, and so are the literal values of generated INSERT/IN lists.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    /// Quote a table or column name
    pub fn quote_ident(self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Render a JSON value as an SQL literal
    pub fn literal(self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self {
                Dialect::MySql => if *b { "true" } else { "false" }.to_string(),
                Dialect::Sqlite => if *b { "1" } else { "0" }.to_string(),
            },
            Value::Number(n) => n.to_string(),
            Value::String(s) => self.quote_string(s),
            Value::Array(_) | Value::Object(_) => self.quote_string(&value.to_string()),
        }
    }

    fn quote_string(self, s: &str) -> String {
        match self {
            Dialect::MySql => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\0' => out.push_str("\\0"),
                        '\u{8}' => out.push_str("\\b"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\u{1a}' => out.push_str("\\Z"),
                        '"' => out.push_str("\\\""),
                        '\'' => out.push_str("\\'"),
                        '\\' => out.push_str("\\\\"),
                        _ => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            Dialect::Sqlite => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Comma-separated literal list for an `IN (...)` clause
    pub fn literal_list(self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.literal(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Statement prefix that silently skips rows whose key already exists
    pub fn insert_ignore(self) -> &'static str {
        match self {
            Dialect::MySql => "INSERT IGNORE INTO",
            Dialect::Sqlite => "INSERT OR IGNORE INTO",
        }
    }

    /// Column clause for a primary key. Integer keys auto-increment; any
    /// other declared type is kept as is and must be supplied by a mapping.
    pub fn primary_key_column(self, name: &str, sql_type: &str) -> String {
        let ident = self.quote_ident(name);
        if !is_integer_type(sql_type) {
            return format!("{} {} PRIMARY KEY", ident, sql_type);
        }
        match self {
            Dialect::MySql => format!("{} {} PRIMARY KEY AUTO_INCREMENT", ident, sql_type),
            // only INTEGER PRIMARY KEY aliases the rowid
            Dialect::Sqlite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", ident),
        }
    }

    /// Text of a JSON path inside the `content` column, compared as text
    /// the way MySQL's `JSON_UNQUOTE` renders it (`true`, `42`, `abc`). The
    /// path is bound [`json_text_binds`](Self::json_text_binds) times.
    pub fn json_text(self) -> &'static str {
        match self {
            Dialect::MySql => "JSON_UNQUOTE(JSON_EXTRACT(content, ?))",
            // json_extract yields 1/0 for booleans
            Dialect::Sqlite => {
                "CAST(CASE json_type(content, ?) WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
                 ELSE json_extract(content, ?) END AS TEXT)"
            }
        }
    }

    /// Number of `?` placeholders in [`json_text`](Self::json_text), all
    /// bound to the same path
    pub fn json_text_binds(self) -> usize {
        match self {
            Dialect::MySql => 1,
            Dialect::Sqlite => 2,
        }
    }

    /// Raw JSON at a path inside the `content` column, for NULL checks
    pub fn json_raw(self) -> &'static str {
        match self {
            Dialect::MySql => "JSON_EXTRACT(content, ?)",
            Dialect::Sqlite => "json_extract(content, ?)",
        }
    }
}

fn is_integer_type(sql_type: &str) -> bool {
    sql_type.to_ascii_uppercase().contains("INT")
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(format!("unknown SQL dialect: {}", other)),
        }
    }
}
