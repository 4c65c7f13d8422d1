//! Type assembler: groups the flat property stream into type descriptions and
//! reconciles cross-type references.
//!
//! Two passes over the resolved properties:
//!
//! 1. **Components.** While a rich-text property is the open parent, each
//!    following unlabelled type record is a component id of that property, not
//!    a type boundary. Any other record closes the parent, and so does a blank
//!    line once at least one component was gathered.
//! 2. **Grouping.** Every remaining type record closes the open type and starts
//!    the next one; other records become properties of the open type.
//!
//! Reconciliation then depends on the parse mode. Strict rejects duplicate ids
//! and dangling references; loose clones and synthesizes types so that every
//! reference resolves. The nested-snippet rule is enforced in both modes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;
use uuid::Uuid;

use crate::config::ParseMode;
use crate::error::ParseError;
use crate::model::{PropertyDescription, PropertyDetail, TypeDescription};

/// A resolved property with the source facts grouping depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub property: PropertyDescription,
    /// 1-based source line.
    pub line: usize,
    pub after_blank_line: bool,
}

/// Grouped and reconciled types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub types: Vec<TypeDescription>,
    pub snippet_types: Vec<TypeDescription>,
}

/// Every id referenced anywhere in the document.
#[derive(Debug, Default)]
struct References {
    links: BTreeSet<String>,
    snippets: BTreeSet<String>,
}

/// Groups `records` into types and reconciles references under `mode`.
///
/// `type_start` is the configured type-start kind name, used to report
/// properties that appear before any type.
pub fn assemble(
    mut records: Vec<PropertyRecord>,
    mode: ParseMode,
    type_start: &str,
) -> Result<Assembly, ParseError> {
    let consumed = attach_components(&mut records);
    let references = collect_references(&records);

    let mut registry = TypeRegistry::new(mode);
    for ty in group_types(records, &consumed, type_start)? {
        registry.insert(ty)?;
    }

    let renames = match mode {
        ParseMode::Strict => {
            check_references(&registry, &references)?;
            BTreeMap::new()
        }
        ParseMode::Loose => repair_references(&mut registry, &references)?,
    };

    let mut assembly = Assembly::default();
    for mut ty in registry.types {
        resolve_links(&mut ty, &renames);
        if references.snippets.contains(&ty.id) {
            if let Some(nested) = ty.snippet_type_ids.iter().next() {
                return Err(ParseError::NestedSnippet {
                    snippet: nested.clone(),
                    type_id: ty.id,
                });
            }
            assembly.snippet_types.push(ty);
        } else {
            assembly.types.push(ty);
        }
    }
    Ok(assembly)
}

// ============================================================================
// Pass 1: rich-text components
// ============================================================================

/// Attaches component ids to rich-text parents and returns a mask of the
/// records consumed as components.
fn attach_components(records: &mut [PropertyRecord]) -> Vec<bool> {
    let mut consumed = vec![false; records.len()];
    let mut attachments: Vec<(usize, Vec<String>)> = Vec::new();
    let mut parent: Option<(usize, Vec<String>)> = None;

    for (index, record) in records.iter().enumerate() {
        let property = &record.property;
        if record.after_blank_line && parent.as_ref().is_some_and(|(_, ids)| !ids.is_empty()) {
            attachments.extend(parent.take());
        }
        if let (PropertyDetail::Type { id }, Some((_, ids))) = (&property.detail, parent.as_mut()) {
            if property.label.is_empty() {
                ids.push(id.clone());
                consumed[index] = true;
                continue;
            }
        }

        if let Some(closed) = parent.take() {
            attachments.push(closed);
        }
        if let PropertyDetail::RichText(_) = property.detail {
            parent = Some((index, Vec::new()));
        }
    }
    attachments.extend(parent);

    for (index, ids) in attachments {
        if ids.is_empty() {
            continue;
        }
        if let PropertyDetail::RichText(rich_text) = &mut records[index].property.detail {
            rich_text.component_type_ids = ids;
            rich_text.is_component_parent = true;
        }
    }
    consumed
}

fn collect_references(records: &[PropertyRecord]) -> References {
    let mut references = References::default();
    for PropertyRecord { property, .. } in records {
        references
            .links
            .extend(property.link_ids().iter().cloned());
        if let PropertyDetail::Snippet { id } = &property.detail {
            references.snippets.insert(id.clone());
        }
    }
    references
}

// ============================================================================
// Pass 2: type boundaries
// ============================================================================

fn group_types(
    records: Vec<PropertyRecord>,
    consumed: &[bool],
    type_start: &str,
) -> Result<Vec<TypeDescription>, ParseError> {
    let mut types = Vec::new();
    let mut open: Option<TypeDescription> = None;

    for (record, consumed) in records.into_iter().zip(consumed) {
        if *consumed {
            continue;
        }
        let property = record.property;
        if let PropertyDetail::Type { id } = &property.detail {
            types.extend(open.take());
            let label = if property.label.is_empty() {
                id.clone()
            } else {
                property.label
            };
            open = Some(TypeDescription::new(id.clone(), label));
            continue;
        }

        let Some(current) = open.as_mut() else {
            return Err(ParseError::PropertyOutsideType {
                kind: property.kind().name().to_string(),
                type_start: type_start.to_string(),
                line: record.line,
            });
        };
        if let PropertyDetail::Snippet { id } = &property.detail {
            current.snippet_type_ids.insert(id.clone());
        }
        current.properties.push(property);
    }
    types.extend(open);
    Ok(types)
}

// ============================================================================
// Registry and reconciliation
// ============================================================================

struct TypeRegistry {
    mode: ParseMode,
    types: Vec<TypeDescription>,
    ids: HashMap<String, usize>,
}

impl TypeRegistry {
    fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            types: Vec::new(),
            ids: HashMap::new(),
        }
    }

    fn get(&self, id: &str) -> Option<&TypeDescription> {
        self.ids.get(id).map(|&index| &self.types[index])
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    fn insert(&mut self, ty: TypeDescription) -> Result<(), ParseError> {
        let ty = if self.contains(&ty.id) {
            match self.mode {
                ParseMode::Strict => return Err(ParseError::DuplicateType { id: ty.id }),
                ParseMode::Loose => {
                    let clone = clone_type(&ty);
                    warn!(id = %ty.id, clone = %clone.id, "duplicate type id, inserting a clone");
                    clone
                }
            }
        } else {
            ty
        };
        self.ids.insert(ty.id.clone(), self.types.len());
        self.types.push(ty);
        Ok(())
    }
}

/// Copy of `ty` under a fresh id derived from the original one.
fn clone_type(ty: &TypeDescription) -> TypeDescription {
    TypeDescription {
        id: format!("{}-{}", ty.id, Uuid::new_v4()),
        label: ty.label.clone(),
        properties: ty.properties.clone(),
        linked_type_ids: BTreeSet::new(),
        snippet_type_ids: ty.snippet_type_ids.clone(),
    }
}

fn check_references(registry: &TypeRegistry, references: &References) -> Result<(), ParseError> {
    for link in &references.links {
        if references.snippets.contains(link) {
            return Err(ParseError::LinkIsSnippet { id: link.clone() });
        }
        if !registry.contains(link) {
            return Err(ParseError::UndescribedLink { id: link.clone() });
        }
    }
    for snippet in &references.snippets {
        if !registry.contains(snippet) {
            return Err(ParseError::UndescribedSnippet {
                id: snippet.clone(),
            });
        }
    }
    Ok(())
}

/// Makes every reference resolvable and returns the link rename map.
///
/// An id used both as a link and as a snippet keeps its original type for the
/// snippet role; links are redirected to a clone.
fn repair_references(
    registry: &mut TypeRegistry,
    references: &References,
) -> Result<BTreeMap<String, String>, ParseError> {
    let mut renames = BTreeMap::new();

    for link in &references.links {
        let as_snippet = references.snippets.contains(link);
        let declared = registry.get(link).cloned();

        match (declared, as_snippet) {
            (Some(ty), true) => {
                let clone = clone_type(&ty);
                warn!(id = %link, clone = %clone.id, "link targets a snippet, linking to a clone");
                renames.insert(link.clone(), clone.id.clone());
                registry.insert(clone)?;
            }
            (Some(_), false) => {}
            (None, as_snippet) => {
                warn!(id = %link, "link is undescribed, inserting an empty type");
                let placeholder = TypeDescription::empty(link);
                if as_snippet {
                    let clone = clone_type(&placeholder);
                    renames.insert(link.clone(), clone.id.clone());
                    registry.insert(clone)?;
                }
                registry.insert(placeholder)?;
            }
        }
    }

    for snippet in &references.snippets {
        if !registry.contains(snippet) {
            warn!(id = %snippet, "snippet is undescribed, inserting an empty type");
            registry.insert(TypeDescription::empty(snippet))?;
        }
    }
    Ok(renames)
}

/// Rewrites link references through `renames` and recomputes the link set.
fn resolve_links(ty: &mut TypeDescription, renames: &BTreeMap<String, String>) {
    let mut linked = BTreeSet::new();
    for property in &mut ty.properties {
        if let Some(ids) = property.link_ids_mut() {
            for id in ids.iter_mut() {
                if let Some(renamed) = renames.get(id) {
                    *id = renamed.clone();
                }
                linked.insert(id.clone());
            }
        }
    }
    ty.linked_type_ids = linked;
}
