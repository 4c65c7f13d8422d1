//! Errors raised while loading a grammar config or parsing a KML document.
//!
//! Every `ParseError` is fatal: the pipeline stops at the first one and no
//! partial result is returned. Loose mode does not suppress these errors, it
//! applies a different reconciliation policy (see `assembler`).

use thiserror::Error;

use crate::scanner::ScanState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("[{character}, {index}] found '{character}' during {state}")]
    UnexpectedCharacter {
        character: char,
        index: usize,
        state: ScanState,
    },

    #[error("reached end during {state} (index {index})")]
    UnterminatedConstruct { state: ScanState, index: usize },

    /// A structural character misused inside a single option token.
    ///
    /// `index` is relative to the start of `option`, not to the source.
    #[error("[{character}, {index}] malformed option '{option}'")]
    MalformedOption {
        option: String,
        character: char,
        index: usize,
    },

    #[error("option '{option}' already has a value")]
    DuplicateOption { option: String },

    #[error("description '{kind}' has no parsing rule")]
    UnresolvableKind { kind: String },

    #[error("'{id}' is already described")]
    DuplicateType { id: String },

    #[error("link '{id}' is undescribed")]
    UndescribedLink { id: String },

    #[error("link '{id}' is already described as a snippet")]
    LinkIsSnippet { id: String },

    #[error("snippet '{id}' is undescribed")]
    UndescribedSnippet { id: String },

    #[error("snippet with id '{snippet}' cannot be in snippet type '{type_id}'")]
    NestedSnippet { snippet: String, type_id: String },

    #[error("[line {line}] '{kind}' property is not the type start '{type_start}'")]
    PropertyOutsideType {
        kind: String,
        type_start: String,
        line: usize,
    },
}

impl ParseError {
    /// Offending character and its index, for errors raised by the scanner or
    /// the option grammar.
    pub fn position(&self) -> Option<(char, usize)> {
        match self {
            ParseError::UnexpectedCharacter {
                character, index, ..
            }
            | ParseError::MalformedOption {
                character, index, ..
            } => Some((*character, *index)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{0}' does not have a value")]
    MissingField(&'static str),

    #[error("'{0}' must not be empty")]
    EmptyMarker(&'static str),

    #[error("'{first}' and '{second}' share the character '{character}'")]
    AmbiguousMarker {
        first: &'static str,
        second: &'static str,
        character: char,
    },

    #[error("skip character '{character}' is also used by '{marker}'")]
    SkippedMarker {
        marker: &'static str,
        character: char,
    },

    #[error("'{field}' names kind '{kind}', which is not in the property table")]
    MissingKind { field: &'static str, kind: String },

    #[error("invalid config document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_errors_expose_their_position() {
        let err = ParseError::UnexpectedCharacter {
            character: ']',
            index: 4,
            state: ScanState::Identifier,
        };
        assert_eq!(err.position(), Some((']', 4)));
        assert_eq!(err.to_string(), "[], 4] found ']' during Identifier");

        let err = ParseError::DuplicateType {
            id: "Article".to_string(),
        };
        assert_eq!(err.position(), None);
        assert_eq!(err.to_string(), "'Article' is already described");
    }
}
