//! KML: a small language for describing content schemas.
//!
//! A KML document lists types, each followed by its typed properties (text,
//! numbers, dates, choices, assets, rich text, links to other types, snippet
//! references). This crate turns such a document into a [`Kml`] model:
//!
//! - [`scanner`]: characters to raw property records;
//! - [`resolver`]: records to typed [`PropertyDescription`]s;
//! - [`assembler`]: properties to types, with strict or loose reconciliation;
//! - [`stats`]: link-chain statistics over the final types.
//!
//! The concrete syntax is data ([`GrammarConfig`]), loaded from a
//! `kimmel.json` document or taken from the defaults.

pub mod assembler;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
mod option_grammar;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stats;

pub use config::{GrammarConfig, KimmelConfig, ParseMode, PropertyEntry, RawGrammarConfig};
pub use error::{ConfigError, ParseError};
pub use format::format_kml;
pub use model::{
    AssetMode, CountRange, GraphStats, Kml, PropertyDescription, PropertyDetail, PropertyKind,
    RichTextDetail, RichTextFormat, RichTextFormatting, TypeDescription,
};
pub use parser::{parse_kml, KmlParser};
