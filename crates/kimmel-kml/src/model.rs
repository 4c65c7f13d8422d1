//! Parsed KML model: types, their properties, and link statistics.
//!
//! This is the shape handed to downstream consumers (activation against a CMS,
//! export). Everything derives `Serialize`/`Deserialize` so it can be written
//! out as JSON without a separate DTO layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Property kinds
// ============================================================================

/// Discriminant of a property description.
///
/// The grammar config refers to kinds by `name()`; an identifier table entry
/// whose name does not map back through `from_name` has no parsing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Type,
    Snippet,
    LinkedItems,
    Asset,
    Text,
    Date,
    Number,
    SingleChoice,
    MultipleChoice,
    RichText,
    Custom,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 11] = [
        PropertyKind::Type,
        PropertyKind::Snippet,
        PropertyKind::LinkedItems,
        PropertyKind::Asset,
        PropertyKind::Text,
        PropertyKind::Date,
        PropertyKind::Number,
        PropertyKind::SingleChoice,
        PropertyKind::MultipleChoice,
        PropertyKind::RichText,
        PropertyKind::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::Type => "type",
            PropertyKind::Snippet => "snippet",
            PropertyKind::LinkedItems => "linked_items",
            PropertyKind::Asset => "asset",
            PropertyKind::Text => "text",
            PropertyKind::Date => "date",
            PropertyKind::Number => "number",
            PropertyKind::SingleChoice => "single_choice",
            PropertyKind::MultipleChoice => "multiple_choice",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Property descriptions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescription {
    /// Trailing label text of the line; empty when the line had none.
    pub label: String,
    pub required: bool,
    #[serde(flatten)]
    pub detail: PropertyDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyDetail {
    Type {
        id: String,
    },
    Snippet {
        id: String,
    },
    LinkedItems {
        linked_type_ids: Vec<String>,
        range: CountRange,
    },
    Asset {
        mode: AssetMode,
        range: CountRange,
    },
    Text {
        words: Option<u32>,
        characters: Option<u32>,
    },
    Date,
    Number,
    SingleChoice {
        options: Vec<String>,
    },
    MultipleChoice {
        options: Vec<String>,
    },
    RichText(RichTextDetail),
    Custom,
}

impl PropertyDescription {
    pub fn new(label: impl Into<String>, detail: PropertyDetail) -> Self {
        Self {
            label: label.into(),
            required: false,
            detail,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match &self.detail {
            PropertyDetail::Type { .. } => PropertyKind::Type,
            PropertyDetail::Snippet { .. } => PropertyKind::Snippet,
            PropertyDetail::LinkedItems { .. } => PropertyKind::LinkedItems,
            PropertyDetail::Asset { .. } => PropertyKind::Asset,
            PropertyDetail::Text { .. } => PropertyKind::Text,
            PropertyDetail::Date => PropertyKind::Date,
            PropertyDetail::Number => PropertyKind::Number,
            PropertyDetail::SingleChoice { .. } => PropertyKind::SingleChoice,
            PropertyDetail::MultipleChoice { .. } => PropertyKind::MultipleChoice,
            PropertyDetail::RichText(_) => PropertyKind::RichText,
            PropertyDetail::Custom => PropertyKind::Custom,
        }
    }

    /// Type ids this property links to: linked items targets and rich-text
    /// component ids. Snippet references are not links.
    pub fn link_ids(&self) -> &[String] {
        match &self.detail {
            PropertyDetail::LinkedItems {
                linked_type_ids, ..
            } => linked_type_ids,
            PropertyDetail::RichText(rich_text) => &rich_text.component_type_ids,
            _ => &[],
        }
    }

    pub(crate) fn link_ids_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.detail {
            PropertyDetail::LinkedItems {
                linked_type_ids, ..
            } => Some(linked_type_ids),
            PropertyDetail::RichText(rich_text) => Some(&mut rich_text.component_type_ids),
            _ => None,
        }
    }
}

/// Inclusive item-count bounds for list-like properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl CountRange {
    pub fn exact(count: u32) -> Self {
        Self {
            min: Some(count),
            max: Some(count),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetMode {
    #[default]
    None,
    Images,
}

// ============================================================================
// Rich text
// ============================================================================

/// One inline format or block kind a rich-text property may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RichTextFormat {
    Paragraph,
    Bold,
    Italic,
    Link,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    UnorderedList,
    OrderedList,
    Subscript,
    Superscript,
    Images,
}

impl RichTextFormat {
    pub const ALL: [RichTextFormat; 13] = [
        RichTextFormat::Paragraph,
        RichTextFormat::Bold,
        RichTextFormat::Italic,
        RichTextFormat::Link,
        RichTextFormat::Heading1,
        RichTextFormat::Heading2,
        RichTextFormat::Heading3,
        RichTextFormat::Heading4,
        RichTextFormat::UnorderedList,
        RichTextFormat::OrderedList,
        RichTextFormat::Subscript,
        RichTextFormat::Superscript,
        RichTextFormat::Images,
    ];

    /// Option token that enables this format.
    pub fn token(self) -> &'static str {
        match self {
            RichTextFormat::Paragraph => "p",
            RichTextFormat::Bold => "b",
            RichTextFormat::Italic => "i",
            RichTextFormat::Link => "a",
            RichTextFormat::Heading1 => "h1",
            RichTextFormat::Heading2 => "h2",
            RichTextFormat::Heading3 => "h3",
            RichTextFormat::Heading4 => "h4",
            RichTextFormat::UnorderedList => "ul",
            RichTextFormat::OrderedList => "ol",
            RichTextFormat::Subscript => "sub",
            RichTextFormat::Superscript => "sup",
            RichTextFormat::Images => "images",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.token() == token)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextFormatting {
    pub paragraph: bool,
    pub bold: bool,
    pub italic: bool,
    pub link: bool,
    pub heading1: bool,
    pub heading2: bool,
    pub heading3: bool,
    pub heading4: bool,
    pub unordered_list: bool,
    pub ordered_list: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub images: bool,
}

impl RichTextFormatting {
    fn flag_mut(&mut self, format: RichTextFormat) -> &mut bool {
        match format {
            RichTextFormat::Paragraph => &mut self.paragraph,
            RichTextFormat::Bold => &mut self.bold,
            RichTextFormat::Italic => &mut self.italic,
            RichTextFormat::Link => &mut self.link,
            RichTextFormat::Heading1 => &mut self.heading1,
            RichTextFormat::Heading2 => &mut self.heading2,
            RichTextFormat::Heading3 => &mut self.heading3,
            RichTextFormat::Heading4 => &mut self.heading4,
            RichTextFormat::UnorderedList => &mut self.unordered_list,
            RichTextFormat::OrderedList => &mut self.ordered_list,
            RichTextFormat::Subscript => &mut self.subscript,
            RichTextFormat::Superscript => &mut self.superscript,
            RichTextFormat::Images => &mut self.images,
        }
    }

    pub fn enable(&mut self, format: RichTextFormat) {
        *self.flag_mut(format) = true;
    }

    pub fn allows(&self, format: RichTextFormat) -> bool {
        let mut copy = *self;
        *copy.flag_mut(format)
    }

    pub fn enabled(&self) -> impl Iterator<Item = RichTextFormat> + '_ {
        RichTextFormat::ALL
            .into_iter()
            .filter(move |format| self.allows(*format))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextDetail {
    pub words: Option<u32>,
    pub characters: Option<u32>,
    pub formatting: RichTextFormatting,
    pub tables: bool,
    /// Formats allowed inside table cells (`tables(p,ul,...)`).
    pub table_formatting: RichTextFormatting,
    pub component_type_ids: Vec<String>,
    /// Set once component ids have been attached from bare continuation lines.
    pub is_component_parent: bool,
}

// ============================================================================
// Types and the parse result
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescription {
    pub id: String,
    pub label: String,
    /// Ordered properties, excluding the type's own header record.
    pub properties: Vec<PropertyDescription>,
    pub linked_type_ids: BTreeSet<String>,
    pub snippet_type_ids: BTreeSet<String>,
}

impl TypeDescription {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Vec::new(),
            linked_type_ids: BTreeSet::new(),
            snippet_type_ids: BTreeSet::new(),
        }
    }

    /// Placeholder for an id that is referenced but never declared.
    pub fn empty(id: &str) -> Self {
        Self::new(id, id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_types: usize,
    /// Every discovered chain, `>`-joined, including single-type chains.
    pub chains: Vec<String>,
    /// Chains whose last id already appeared earlier in the chain.
    pub closed_chains: Vec<String>,
    pub max_chain_depth: Option<usize>,
}

/// Result of parsing one KML document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kml {
    pub types: Vec<TypeDescription>,
    pub snippet_types: Vec<TypeDescription>,
    pub stats: GraphStats,
}

impl Kml {
    pub fn find_type(&self, id: &str) -> Option<&TypeDescription> {
        self.types
            .iter()
            .chain(self.snippet_types.iter())
            .find(|ty| ty.id == id)
    }
}
