//! Delimited (CSV-like) batch files.
//!
//! Each line of a delimited file is one record whose values are separated by a
//! comma or a tab, as selected by the `fieldDelimiterType` parameter of the
//! read configuration. Values are matched to the configured fields by
//! position. Lines are split one at a time, so a quoted value never runs
//! past the end of its line.
//!
//! # Quoting
//!
//! | Raw value             | Decoded value     |
//! |-----------------------|-------------------|
//! | `abc`                 | `abc`             |
//! | `"a,b"`               | `a,b`             |
//! | `"a\"b"`              | `a"b`             |
//! | `"C:\temp"`           | `C:\temp`         |
//! | `""`                  | empty             |
//! | `a"b`                 | `a"b`             |
//! | `"ab"cd`              | record format error |
//! | `"abc` (no closing)   | record format error |
//!
//! Quote detection looks at the first character of a value only; a delimiter
//! inside an unquoted value always ends it. Only `\"` is an escape: any other
//! backslash is kept as is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the read configuration parameter selecting the delimiter.
pub const FIELD_DELIMITER_PARAM: &str = "fieldDelimiterType";

/// Delimiters supported by the delimited reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldDelimiterType {
    Comma,
    Tab,
}

impl FieldDelimiterType {
    pub fn delimiter(&self) -> char {
        match self {
            FieldDelimiterType::Comma => ',',
            FieldDelimiterType::Tab => '\t',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldDelimiterType::Comma => "COMMA",
            FieldDelimiterType::Tab => "TAB",
        }
    }
}

impl From<FieldDelimiterType> for Value {
    fn from(delimiter_type: FieldDelimiterType) -> Self {
        Value::String(delimiter_type.name().to_string())
    }
}

/// A module providing facilities for reading delimited records.
pub mod delimited_reader;
