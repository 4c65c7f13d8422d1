//! Grammar configuration: the concrete syntax of a KML document.
//!
//! `RawGrammarConfig` is what a `kimmel.json` document deserializes into; every
//! field is optional so that a missing one can be reported by name. A
//! `GrammarConfig` is only obtainable through validation (or `Default`), and is
//! read-only afterwards, so one instance can be shared by any number of parses.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::model::PropertyKind;

// ============================================================================
// Parse mode
// ============================================================================

/// Cross-document consistency policy applied by the assembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Duplicate ids and dangling references are errors.
    #[default]
    Strict,
    /// Duplicate ids are cloned and dangling references get placeholder types.
    Loose,
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseMode::Strict => f.write_str("strict"),
            ParseMode::Loose => f.write_str("loose"),
        }
    }
}

// ============================================================================
// Identifier table
// ============================================================================

/// One row of the identifier table.
///
/// Entries without an identifier exist so that fallback kinds (`type`,
/// `linked_items`, `snippet`) are declared even though no source identifier
/// selects them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    #[serde(default)]
    pub identifier: Option<String>,
    pub kind: String,
}

impl PropertyEntry {
    pub fn new(identifier: Option<&str>, kind: &str) -> Self {
        Self {
            identifier: identifier.map(str::to_string),
            kind: kind.to_string(),
        }
    }
}

fn default_properties() -> Vec<PropertyEntry> {
    vec![
        PropertyEntry::new(None, PropertyKind::Type.name()),
        PropertyEntry::new(None, PropertyKind::Snippet.name()),
        PropertyEntry::new(None, PropertyKind::LinkedItems.name()),
        PropertyEntry::new(Some("Asset"), PropertyKind::Asset.name()),
        PropertyEntry::new(Some("Text"), PropertyKind::Text.name()),
        PropertyEntry::new(Some("MultipleChoice"), PropertyKind::MultipleChoice.name()),
        PropertyEntry::new(Some("SingleChoice"), PropertyKind::SingleChoice.name()),
        PropertyEntry::new(Some("Date"), PropertyKind::Date.name()),
        PropertyEntry::new(Some("Number"), PropertyKind::Number.name()),
        PropertyEntry::new(Some("RichText"), PropertyKind::RichText.name()),
        PropertyEntry::new(Some("Custom"), PropertyKind::Custom.name()),
    ]
}

// ============================================================================
// Raw (unvalidated) document
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGrammarConfig {
    pub comments: Option<String>,
    pub space: Option<char>,
    pub array_delimiter: Option<char>,
    pub options_start: Option<char>,
    pub options_end: Option<char>,
    pub option_detail_start: Option<char>,
    pub option_detail_end: Option<char>,
    pub more_or_less: Option<char>,
    pub range: Option<char>,
    pub required: Option<char>,
    pub property_delimiter: Option<String>,
    pub snippet_start: Option<String>,
    pub properties: Option<Vec<PropertyEntry>>,
    pub no_property_fallback: Option<String>,
    pub no_options_fallback: Option<String>,
    pub snippet_type: Option<String>,
    pub type_start: Option<String>,
    pub skip: Option<String>,
}

impl From<&GrammarConfig> for RawGrammarConfig {
    fn from(config: &GrammarConfig) -> Self {
        Self {
            comments: Some(config.comment.iter().collect()),
            space: Some(config.space),
            array_delimiter: Some(config.array_delimiter),
            options_start: Some(config.options_start),
            options_end: Some(config.options_end),
            option_detail_start: Some(config.detail_start),
            option_detail_end: Some(config.detail_end),
            more_or_less: Some(config.more_or_less),
            range: Some(config.range),
            required: Some(config.required),
            property_delimiter: Some(config.property_delimiter.iter().collect()),
            snippet_start: Some(config.snippet_start.iter().collect()),
            properties: Some(config.properties.clone()),
            no_property_fallback: Some(config.no_property_fallback.clone()),
            no_options_fallback: Some(config.no_options_fallback.clone()),
            snippet_type: Some(config.snippet_type.clone()),
            type_start: Some(config.type_start.clone()),
            skip: Some(config.skip.iter().collect()),
        }
    }
}

// ============================================================================
// Validated grammar
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    pub(crate) comment: Vec<char>,
    pub(crate) space: char,
    pub(crate) array_delimiter: char,
    pub(crate) options_start: char,
    pub(crate) options_end: char,
    pub(crate) detail_start: char,
    pub(crate) detail_end: char,
    pub(crate) more_or_less: char,
    pub(crate) range: char,
    pub(crate) required: char,
    pub(crate) property_delimiter: Vec<char>,
    pub(crate) snippet_start: Vec<char>,
    pub(crate) skip: Vec<char>,
    pub(crate) properties: Vec<PropertyEntry>,
    /// Kind used when brackets are present but the identifier is unknown.
    pub(crate) no_property_fallback: String,
    /// Kind used when no brackets are present and the identifier is unknown.
    pub(crate) no_options_fallback: String,
    pub(crate) snippet_type: String,
    pub(crate) type_start: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            comment: vec!['/', '/'],
            space: ' ',
            array_delimiter: ',',
            options_start: '[',
            options_end: ']',
            detail_start: '(',
            detail_end: ')',
            more_or_less: '+',
            range: '-',
            required: '*',
            property_delimiter: vec!['\n'],
            snippet_start: vec!['.', '.', '.'],
            skip: vec!['\r'],
            properties: default_properties(),
            no_property_fallback: PropertyKind::LinkedItems.name().to_string(),
            no_options_fallback: PropertyKind::Type.name().to_string(),
            snippet_type: PropertyKind::Snippet.name().to_string(),
            type_start: PropertyKind::Type.name().to_string(),
        }
    }
}

impl GrammarConfig {
    /// Kind name mapped to `identifier`, if the table has a row for it.
    pub fn kind_for_identifier(&self, identifier: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|entry| entry.identifier.as_deref() == Some(identifier))
            .map(|entry| entry.kind.as_str())
    }

    /// First identifier whose row maps to `kind`; the reverse of
    /// `kind_for_identifier`, used when writing KML back out.
    pub fn identifier_for_kind(&self, kind: PropertyKind) -> Option<&str> {
        self.properties
            .iter()
            .filter(|entry| entry.kind == kind.name())
            .find_map(|entry| entry.identifier.as_deref())
    }

    fn is_declared_kind(&self, kind: &str) -> bool {
        self.properties.iter().any(|entry| entry.kind == kind)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let structural = [
            ("space", Some(self.space)),
            ("array_delimiter", Some(self.array_delimiter)),
            ("options_start", Some(self.options_start)),
            ("options_end", Some(self.options_end)),
            ("option_detail_start", Some(self.detail_start)),
            ("option_detail_end", Some(self.detail_end)),
            ("comments", self.comment.first().copied()),
            ("snippet_start", self.snippet_start.first().copied()),
            ("property_delimiter", self.property_delimiter.first().copied()),
        ];

        for (name, marker) in &structural {
            if marker.is_none() {
                return Err(ConfigError::EmptyMarker(*name));
            }
        }
        let structural: Vec<(&'static str, char)> = structural
            .into_iter()
            .filter_map(|(name, marker)| marker.map(|c| (name, c)))
            .collect();

        for (i, (first, a)) in structural.iter().enumerate() {
            for (second, b) in &structural[i + 1..] {
                if a == b {
                    return Err(ConfigError::AmbiguousMarker {
                        first: *first,
                        second: *second,
                        character: *a,
                    });
                }
            }
        }
        if self.more_or_less == self.range {
            return Err(ConfigError::AmbiguousMarker {
                first: "more_or_less",
                second: "range",
                character: self.range,
            });
        }

        for skipped in &self.skip {
            if let Some((marker, _)) = structural.iter().find(|(_, c)| c == skipped) {
                return Err(ConfigError::SkippedMarker {
                    marker: *marker,
                    character: *skipped,
                });
            }
        }

        for (field, kind) in [
            ("no_property_fallback", &self.no_property_fallback),
            ("no_options_fallback", &self.no_options_fallback),
            ("snippet_type", &self.snippet_type),
            ("type_start", &self.type_start),
        ] {
            if !self.is_declared_kind(kind) {
                return Err(ConfigError::MissingKind {
                    field,
                    kind: kind.clone(),
                });
            }
        }

        Ok(self)
    }
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingField(field))
}

impl TryFrom<RawGrammarConfig> for GrammarConfig {
    type Error = ConfigError;

    fn try_from(raw: RawGrammarConfig) -> Result<Self, Self::Error> {
        let config = GrammarConfig {
            comment: require(raw.comments, "comments")?.chars().collect(),
            space: require(raw.space, "space")?,
            array_delimiter: require(raw.array_delimiter, "array_delimiter")?,
            options_start: require(raw.options_start, "options_start")?,
            options_end: require(raw.options_end, "options_end")?,
            detail_start: require(raw.option_detail_start, "option_detail_start")?,
            detail_end: require(raw.option_detail_end, "option_detail_end")?,
            more_or_less: require(raw.more_or_less, "more_or_less")?,
            range: require(raw.range, "range")?,
            required: require(raw.required, "required")?,
            property_delimiter: require(raw.property_delimiter, "property_delimiter")?
                .chars()
                .collect(),
            snippet_start: require(raw.snippet_start, "snippet_start")?.chars().collect(),
            properties: require(raw.properties, "properties")?,
            no_property_fallback: require(raw.no_property_fallback, "no_property_fallback")?,
            no_options_fallback: require(raw.no_options_fallback, "no_options_fallback")?,
            snippet_type: require(raw.snippet_type, "snippet_type")?,
            type_start: require(raw.type_start, "type_start")?,
            skip: require(raw.skip, "skip")?.chars().collect(),
        };
        config.validate()
    }
}

// ============================================================================
// Config document (mode + grammar)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawKimmelConfig {
    mode: Option<ParseMode>,
    #[serde(flatten)]
    grammar: RawGrammarConfig,
}

/// Contents of a `kimmel.json` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KimmelConfig {
    pub mode: ParseMode,
    pub grammar: GrammarConfig,
}

impl Default for KimmelConfig {
    fn default() -> Self {
        Self {
            mode: ParseMode::Strict,
            grammar: GrammarConfig::default(),
        }
    }
}

impl KimmelConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawKimmelConfig = serde_json::from_str(text)?;
        Ok(Self {
            mode: require(raw.mode, "mode")?,
            grammar: GrammarConfig::try_from(raw.grammar)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
