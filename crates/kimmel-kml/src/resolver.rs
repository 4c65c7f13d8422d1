//! Property resolver: raw scanner records to typed property descriptions.
//!
//! Kind selection:
//! 1. snippet marker present: the configured snippet kind;
//! 2. identifier found in the identifier table: its kind;
//! 3. no brackets at all: the no-options fallback (a type header or reference);
//! 4. brackets present: the no-property fallback (linked items).
//!
//! Each kind then reads its option tokens: exact-match flags, `name(...)`
//! details, count ranges, and (for choice kinds) literal choice values.

use std::collections::HashSet;

use tracing::debug;

use crate::assembler::PropertyRecord;
use crate::config::GrammarConfig;
use crate::error::ParseError;
use crate::model::{
    AssetMode, CountRange, PropertyDescription, PropertyDetail, PropertyKind, RichTextDetail,
    RichTextFormat,
};
use crate::option_grammar::{parse_detail, parse_range, Detail};
use crate::scanner::RawProperty;

const IMAGES: &str = "images";
const TABLES: &str = "tables";
const WORDS: &str = "words";
const CHARACTERS: &str = "characters";
const RANGE_KEY: &str = "range";

pub struct PropertyResolver<'c> {
    config: &'c GrammarConfig,
}

/// Per-property bookkeeping of which flags/details were already supplied.
#[derive(Default)]
struct Claims {
    seen: HashSet<String>,
    required: bool,
}

impl Claims {
    fn claim(&mut self, key: &str, option: &str) -> Result<(), ParseError> {
        if !self.seen.insert(key.to_string()) {
            return Err(ParseError::DuplicateOption {
                option: option.to_string(),
            });
        }
        Ok(())
    }
}

impl<'c> PropertyResolver<'c> {
    pub fn new(config: &'c GrammarConfig) -> Self {
        Self { config }
    }

    /// Kind name the record resolves to, before checking it has a parsing rule.
    pub fn kind_name(&self, record: &RawProperty) -> &'c str {
        let config = self.config;
        if record.snippet {
            return &config.snippet_type;
        }
        if let Some(kind) = config.kind_for_identifier(&record.identifier) {
            return kind;
        }
        match record.options {
            None => &config.no_options_fallback,
            Some(_) => &config.no_property_fallback,
        }
    }

    /// Describes `record` and keeps its source position for the assembler.
    pub fn resolve(&self, record: &RawProperty) -> Result<PropertyRecord, ParseError> {
        Ok(PropertyRecord {
            property: self.describe(record)?,
            line: record.line,
            after_blank_line: record.after_blank_line,
        })
    }

    pub fn describe(&self, record: &RawProperty) -> Result<PropertyDescription, ParseError> {
        let kind_name = self.kind_name(record);
        let kind = PropertyKind::from_name(kind_name).ok_or_else(|| ParseError::UnresolvableKind {
            kind: kind_name.to_string(),
        })?;

        let options = record.options.as_deref().unwrap_or_default();
        let mut claims = Claims::default();

        let detail = match kind {
            PropertyKind::Type => {
                self.ignore_all(kind, options);
                PropertyDetail::Type {
                    id: record.identifier.clone(),
                }
            }
            PropertyKind::Snippet => {
                self.ignore_all(kind, options);
                PropertyDetail::Snippet {
                    id: record.identifier.clone(),
                }
            }
            PropertyKind::LinkedItems => {
                let range = self.linked_items(options, &mut claims)?;
                PropertyDetail::LinkedItems {
                    linked_type_ids: self.split_ids(&record.identifier),
                    range,
                }
            }
            PropertyKind::Asset => self.asset(options, &mut claims)?,
            PropertyKind::Text => self.text(options, &mut claims)?,
            PropertyKind::Date | PropertyKind::Number | PropertyKind::Custom => {
                for token in options {
                    if !self.required(token, &mut claims)? {
                        self.ignore(kind, token);
                    }
                }
                match kind {
                    PropertyKind::Date => PropertyDetail::Date,
                    PropertyKind::Number => PropertyDetail::Number,
                    _ => PropertyDetail::Custom,
                }
            }
            PropertyKind::SingleChoice => PropertyDetail::SingleChoice {
                options: self.choices(options, &mut claims)?,
            },
            PropertyKind::MultipleChoice => PropertyDetail::MultipleChoice {
                options: self.choices(options, &mut claims)?,
            },
            PropertyKind::RichText => PropertyDetail::RichText(self.rich_text(options, &mut claims)?),
        };

        Ok(PropertyDescription {
            label: record.label.clone().unwrap_or_default(),
            required: claims.required,
            detail,
        })
    }

    fn split_ids(&self, identifier: &str) -> Vec<String> {
        identifier
            .split(self.config.array_delimiter)
            .map(|id| id.trim_matches(self.config.space))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn ignore(&self, kind: PropertyKind, token: &str) {
        debug!(option = %token, kind = %kind, "ignoring unrecognized option");
    }

    fn ignore_all(&self, kind: PropertyKind, options: &[String]) {
        for token in options {
            self.ignore(kind, token);
        }
    }

    fn is_required(&self, token: &str) -> bool {
        let mut chars = token.chars();
        chars.next() == Some(self.config.required) && chars.next().is_none()
    }

    /// Claims the required marker if `token` is one.
    fn required(&self, token: &str, claims: &mut Claims) -> Result<bool, ParseError> {
        if !self.is_required(token) {
            return Ok(false);
        }
        claims.claim(token, token)?;
        claims.required = true;
        Ok(true)
    }

    /// Claims a count range if `token` is one.
    fn range(
        &self,
        token: &str,
        claims: &mut Claims,
        range: &mut CountRange,
    ) -> Result<bool, ParseError> {
        match parse_range(token, self.config)? {
            Some(parsed) => {
                claims.claim(RANGE_KEY, token)?;
                *range = parsed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Single numeric value of a `words(N)` / `characters(N)` detail.
    fn count(&self, token: &str, detail: &Detail<'_>, claims: &mut Claims) -> Result<Option<u32>, ParseError> {
        claims.claim(detail.name, token)?;
        match detail.values.as_slice() {
            [] => Ok(None),
            [value] => Ok(value.parse().ok()),
            _ => Err(ParseError::DuplicateOption {
                option: token.to_string(),
            }),
        }
    }

    fn linked_items(&self, options: &[String], claims: &mut Claims) -> Result<CountRange, ParseError> {
        let mut range = CountRange::default();
        for token in options {
            if self.required(token, claims)? || self.range(token, claims, &mut range)? {
                continue;
            }
            self.ignore(PropertyKind::LinkedItems, token);
        }
        Ok(range)
    }

    fn asset(&self, options: &[String], claims: &mut Claims) -> Result<PropertyDetail, ParseError> {
        let mut mode = AssetMode::None;
        let mut range = CountRange::default();
        for token in options {
            if self.required(token, claims)? {
                continue;
            }
            if token == IMAGES {
                claims.claim(token, token)?;
                mode = AssetMode::Images;
                continue;
            }
            if !self.range(token, claims, &mut range)? {
                self.ignore(PropertyKind::Asset, token);
            }
        }
        Ok(PropertyDetail::Asset { mode, range })
    }

    fn text(&self, options: &[String], claims: &mut Claims) -> Result<PropertyDetail, ParseError> {
        let mut words = None;
        let mut characters = None;
        for token in options {
            if self.required(token, claims)? {
                continue;
            }
            match parse_detail(token, self.config)? {
                Some(detail) if detail.name == WORDS => words = self.count(token, &detail, claims)?,
                Some(detail) if detail.name == CHARACTERS => {
                    characters = self.count(token, &detail, claims)?
                }
                _ => self.ignore(PropertyKind::Text, token),
            }
        }
        Ok(PropertyDetail::Text { words, characters })
    }

    fn choices(&self, options: &[String], claims: &mut Claims) -> Result<Vec<String>, ParseError> {
        let mut choices = Vec::new();
        for token in options {
            if !self.required(token, claims)? {
                choices.push(token.clone());
            }
        }
        Ok(choices)
    }

    fn rich_text(&self, options: &[String], claims: &mut Claims) -> Result<RichTextDetail, ParseError> {
        let mut rich_text = RichTextDetail::default();
        for token in options {
            if self.required(token, claims)? {
                continue;
            }
            if let Some(format) = RichTextFormat::from_token(token) {
                claims.claim(token, token)?;
                rich_text.formatting.enable(format);
                continue;
            }
            match parse_detail(token, self.config)? {
                Some(detail) if detail.name == TABLES => {
                    claims.claim(TABLES, token)?;
                    rich_text.tables = true;
                    let mut cell_claims = Claims::default();
                    for value in &detail.values {
                        match RichTextFormat::from_token(value) {
                            Some(format) => {
                                cell_claims.claim(value, value)?;
                                rich_text.table_formatting.enable(format);
                            }
                            None => self.ignore(PropertyKind::RichText, value),
                        }
                    }
                }
                Some(detail) if detail.name == WORDS => {
                    rich_text.words = self.count(token, &detail, claims)?
                }
                Some(detail) if detail.name == CHARACTERS => {
                    rich_text.characters = self.count(token, &detail, claims)?
                }
                _ => self.ignore(PropertyKind::RichText, token),
            }
        }
        Ok(rich_text)
    }
}
