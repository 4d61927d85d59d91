use serde::{Deserialize, Serialize};

/// Side of a fixed-width value that carries the pad characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PadDirection {
    /// Pad characters precede the value (right aligned, e.g. zero filled amounts).
    Left,
    /// Pad characters follow the value (left aligned, e.g. names).
    #[default]
    Right,
}

fn default_pad_char() -> char {
    ' '
}

fn default_update_on_conflict() -> bool {
    true
}

/// Immutable description of one target field of a batch record.
///
/// The position of a `FieldConfig` in its owning configuration drives positional
/// decoding for fixed-width and delimited files; XML files match fields by
/// [`source_name`](FieldConfig::source_name) instead.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::field::{FieldConfig, PadDirection};
///
/// let amount = FieldConfig::new("amount", 13)
///     .with_pad(PadDirection::Left, '0')
///     .with_formatter("cent");
///
/// assert_eq!(amount.pad_value("52043"), "0000000052043");
/// assert_eq!(amount.strip_padding("0000000052043"), "52043");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    field_name: String,
    #[serde(default)]
    source_field_name: Option<String>,
    #[serde(default)]
    formatter_id: Option<String>,
    #[serde(default)]
    pad_direction: PadDirection,
    #[serde(default = "default_pad_char")]
    pad_char: char,
    #[serde(default)]
    length: usize,
    #[serde(default)]
    trim: bool,
    #[serde(default)]
    pad: bool,
    #[serde(default = "default_update_on_conflict")]
    update_on_conflict: bool,
}

impl FieldConfig {
    /// Creates a field with the given target name and fixed width.
    ///
    /// Trimming and padding are off, no formatter is attached, the pad character
    /// is a space and the field takes part in conflict updates.
    pub fn new<S: Into<String>>(field_name: S, length: usize) -> Self {
        Self {
            field_name: field_name.into(),
            source_field_name: None,
            formatter_id: None,
            pad_direction: PadDirection::default(),
            pad_char: default_pad_char(),
            length,
            trim: false,
            pad: false,
            update_on_conflict: true,
        }
    }

    pub fn with_source_name<S: Into<String>>(mut self, source_field_name: S) -> Self {
        self.source_field_name = Some(source_field_name.into());
        self
    }

    pub fn with_formatter<S: Into<String>>(mut self, formatter_id: S) -> Self {
        self.formatter_id = Some(formatter_id.into());
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Turns padding on with the given direction and pad character.
    pub fn with_pad(self, pad_direction: PadDirection, pad_char: char) -> Self {
        self.with_padding(true, pad_direction, pad_char)
    }

    pub fn with_padding(mut self, pad: bool, pad_direction: PadDirection, pad_char: char) -> Self {
        self.pad = pad;
        self.pad_direction = pad_direction;
        self.pad_char = pad_char;
        self
    }

    pub fn with_update_on_conflict(mut self, update_on_conflict: bool) -> Self {
        self.update_on_conflict = update_on_conflict;
        self
    }

    /// Target (record) field name.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Optional name of the field in the file.
    pub fn source_field_name(&self) -> Option<&str> {
        self.source_field_name.as_deref()
    }

    /// Name under which the field appears in tag keyed formats: the source
    /// field name when set, the target field name otherwise.
    pub fn source_name(&self) -> &str {
        self.source_field_name
            .as_deref()
            .unwrap_or(&self.field_name)
    }

    pub fn formatter_id(&self) -> Option<&str> {
        self.formatter_id.as_deref()
    }

    pub fn pad_direction(&self) -> PadDirection {
        self.pad_direction
    }

    pub fn pad_char(&self) -> char {
        self.pad_char
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_trim(&self) -> bool {
        self.trim
    }

    pub fn is_pad(&self) -> bool {
        self.pad
    }

    pub fn is_update_on_conflict(&self) -> bool {
        self.update_on_conflict
    }

    /// Applies the read-side transformation to a raw slice of the record:
    /// trim when configured, then strip padding when configured.
    pub fn clean<'a>(&self, raw: &'a str) -> &'a str {
        let value = if self.trim { raw.trim() } else { raw };
        if self.pad {
            self.strip_padding(value)
        } else {
            value
        }
    }

    /// Removes the pad character run from the padded side of `value`.
    ///
    /// At least one character is kept so that a fully padded numeric value such as
    /// `"0000"` reads as `"0"`.
    pub fn strip_padding<'a>(&self, value: &'a str) -> &'a str {
        let stripped = match self.pad_direction {
            PadDirection::Left => value.trim_start_matches(self.pad_char),
            PadDirection::Right => value.trim_end_matches(self.pad_char),
        };

        if stripped.is_empty() && !value.is_empty() {
            let keep = self.pad_char.len_utf8();
            match self.pad_direction {
                PadDirection::Left => &value[value.len() - keep..],
                PadDirection::Right => &value[..keep],
            }
        } else {
            stripped
        }
    }

    /// Renders `value` at exactly [`length`](FieldConfig::length) characters,
    /// padding on the configured side or truncating overlong values.
    pub fn pad_value(&self, value: &str) -> String {
        let width = value.chars().count();
        if width >= self.length {
            return value.chars().take(self.length).collect();
        }

        let filler: String = std::iter::repeat_n(self.pad_char, self.length - width).collect();
        match self.pad_direction {
            PadDirection::Left => format!("{}{}", filler, value),
            PadDirection::Right => format!("{}{}", value, filler),
        }
    }
}
