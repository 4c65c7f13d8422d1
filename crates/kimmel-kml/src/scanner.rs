//! Character-level scanner for KML source text.
//!
//! A single left-to-right pass driven by an explicit state enum. Each source
//! character is dispatched to the handler for the current state; a handler
//! either consumes the character or switches state and asks for the same
//! character to be dispatched again. Check order inside each handler matters:
//! comment marker first, then the line delimiter, then structural markers.

use tracing::debug;

use crate::config::GrammarConfig;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    LeadingWhitespace,
    Comment,
    SnippetStart,
    Identifier,
    Options,
    TrailingWhitespace,
    Label,
    Property,
    PropertyDelimiter,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// One scanned property line, before kind resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProperty {
    pub snippet: bool,
    pub identifier: String,
    /// `None` when the line had no brackets; `Some(vec![])` for `[]`.
    pub options: Option<Vec<String>>,
    pub label: Option<String>,
    /// 1-based source line the record started on.
    pub line: usize,
    /// At least one blank line separates this record from the previous one.
    pub after_blank_line: bool,
}

/// Scan `source` into raw property records.
pub fn scan(config: &GrammarConfig, source: &str) -> Result<Vec<RawProperty>, ParseError> {
    let mut scanner = Scanner::new(config);
    let mut length = 0;
    for (index, current) in source.chars().enumerate() {
        length = index + 1;
        if config.skip.contains(&current) {
            continue;
        }
        scanner.feed(index, current)?;
    }
    let records = scanner.finish(length)?;
    debug!(records = records.len(), "scanned kml source");
    Ok(records)
}

enum Step {
    Consumed,
    Redispatch,
}

struct Scanner<'c> {
    config: &'c GrammarConfig,
    state: ScanState,
    /// Characters of the current multi-character marker matched so far.
    marker: usize,
    /// State a comment marker was started from.
    comment_from: ScanState,
    blank_line: bool,
    line: usize,
    record_line: usize,
    snippet: bool,
    identifier: String,
    token: String,
    tokens: Vec<String>,
    options: Option<Vec<String>>,
    in_detail: bool,
    label: String,
    records: Vec<RawProperty>,
}

impl<'c> Scanner<'c> {
    fn new(config: &'c GrammarConfig) -> Self {
        Self {
            config,
            state: ScanState::LeadingWhitespace,
            marker: 0,
            comment_from: ScanState::LeadingWhitespace,
            blank_line: false,
            line: 1,
            record_line: 1,
            snippet: false,
            identifier: String::new(),
            token: String::new(),
            tokens: Vec::new(),
            options: None,
            in_detail: false,
            label: String::new(),
            records: Vec::new(),
        }
    }

    fn feed(&mut self, index: usize, current: char) -> Result<(), ParseError> {
        loop {
            let step = match self.state {
                ScanState::LeadingWhitespace => self.leading_whitespace(index, current)?,
                ScanState::Comment => self.comment(index, current)?,
                ScanState::SnippetStart => self.snippet_start(index, current)?,
                ScanState::Identifier => self.identifier(index, current)?,
                ScanState::Options => self.options(index, current)?,
                ScanState::TrailingWhitespace => self.trailing_whitespace(index, current)?,
                ScanState::Label => self.label(index, current)?,
                ScanState::Property => self.property(),
                ScanState::PropertyDelimiter => self.property_delimiter(index, current)?,
            };
            if let Step::Consumed = step {
                return Ok(());
            }
        }
    }

    fn unexpected(&self, index: usize, character: char) -> ParseError {
        ParseError::UnexpectedCharacter {
            character,
            index,
            state: self.state,
        }
    }

    fn enter(&mut self, state: ScanState) -> Step {
        self.state = state;
        self.marker = 0;
        Step::Redispatch
    }

    fn enter_comment(&mut self) -> Step {
        self.comment_from = self.state;
        self.enter(ScanState::Comment)
    }

    /// Turns a partially matched comment marker back into label text. Only
    /// possible where a label may appear, i.e. after the identifier of a
    /// non-snippet record.
    fn recover_label(&mut self) -> bool {
        let labelled = matches!(
            self.comment_from,
            ScanState::Label | ScanState::TrailingWhitespace
        ) && !self.snippet;
        if labelled {
            let config = self.config;
            self.label.extend(&config.comment[..self.marker]);
            self.state = ScanState::Label;
            self.marker = 0;
        }
        labelled
    }

    fn is_structural(&self, c: char) -> bool {
        let config = self.config;
        c == config.array_delimiter
            || c == config.options_start
            || c == config.options_end
            || c == config.detail_start
            || c == config.detail_end
    }

    fn starts_comment(&self, c: char) -> bool {
        self.config.comment.first() == Some(&c)
    }

    fn starts_delimiter(&self, c: char) -> bool {
        self.config.property_delimiter.first() == Some(&c)
    }

    fn starts_snippet(&self, c: char) -> bool {
        self.config.snippet_start.first() == Some(&c)
    }

    // ------------------------------------------------------------------------
    // State handlers
    // ------------------------------------------------------------------------

    fn leading_whitespace(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        if self.starts_comment(c) {
            return Ok(self.enter_comment());
        }
        if c == self.config.space {
            return Ok(Step::Consumed);
        }
        if self.starts_delimiter(c) {
            self.blank_line = true;
            return Ok(self.enter(ScanState::PropertyDelimiter));
        }
        if self.is_structural(c) {
            return Err(self.unexpected(index, c));
        }
        self.record_line = self.line;
        if self.starts_snippet(c) {
            return Ok(self.enter(ScanState::SnippetStart));
        }
        Ok(self.enter(ScanState::Identifier))
    }

    fn comment(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        let config = self.config;
        let marker = &config.comment;
        if self.marker < marker.len() {
            if marker[self.marker] != c {
                if self.recover_label() {
                    return Ok(Step::Redispatch);
                }
                return Err(self.unexpected(index, c));
            }
            self.marker += 1;
            return Ok(Step::Consumed);
        }
        if self.starts_delimiter(c) {
            return Ok(self.enter(ScanState::PropertyDelimiter));
        }
        Ok(Step::Consumed)
    }

    fn snippet_start(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        let config = self.config;
        let marker = &config.snippet_start;
        if marker.get(self.marker) != Some(&c) {
            return Err(self.unexpected(index, c));
        }
        self.marker += 1;
        if self.marker == marker.len() {
            self.snippet = true;
            self.state = ScanState::Identifier;
            self.marker = 0;
        }
        Ok(Step::Consumed)
    }

    fn identifier(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        let config = self.config;
        let empty = self.identifier.is_empty();

        if self.starts_comment(c) {
            if empty {
                return Err(self.unexpected(index, c));
            }
            return Ok(self.enter_comment());
        }
        if self.starts_delimiter(c) {
            if empty {
                return Err(self.unexpected(index, c));
            }
            return Ok(self.enter(ScanState::PropertyDelimiter));
        }
        if c == config.space {
            if empty {
                return Err(self.unexpected(index, c));
            }
            self.state = ScanState::TrailingWhitespace;
            return Ok(Step::Consumed);
        }
        if c == config.options_start {
            if empty {
                return Err(self.unexpected(index, c));
            }
            self.state = ScanState::Options;
            self.tokens.clear();
            self.token.clear();
            self.in_detail = false;
            return Ok(Step::Consumed);
        }
        if c == config.array_delimiter {
            // Comma-joined identifiers name several linked types.
            if empty {
                return Err(self.unexpected(index, c));
            }
            self.identifier.push(c);
            return Ok(Step::Consumed);
        }
        if self.is_structural(c) || self.starts_snippet(c) {
            return Err(self.unexpected(index, c));
        }
        self.identifier.push(c);
        Ok(Step::Consumed)
    }

    fn options(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        let config = self.config;

        if self.starts_comment(c) || self.starts_delimiter(c) || self.starts_snippet(c) {
            return Err(self.unexpected(index, c));
        }
        if c == config.space {
            if !self.token.is_empty() {
                self.token.push(c);
            }
            return Ok(Step::Consumed);
        }
        if c == config.array_delimiter {
            if self.in_detail {
                self.token.push(c);
                return Ok(Step::Consumed);
            }
            if !self.finish_token() {
                return Err(self.unexpected(index, c));
            }
            return Ok(Step::Consumed);
        }
        if c == config.options_end {
            if self.in_detail {
                return Err(self.unexpected(index, c));
            }
            if !self.finish_token() && !self.tokens.is_empty() {
                return Err(self.unexpected(index, c));
            }
            self.options = Some(std::mem::take(&mut self.tokens));
            self.state = ScanState::TrailingWhitespace;
            return Ok(Step::Consumed);
        }
        if c == config.detail_start {
            if self.in_detail || self.token.is_empty() {
                return Err(self.unexpected(index, c));
            }
            self.in_detail = true;
            self.token.push(c);
            return Ok(Step::Consumed);
        }
        if c == config.detail_end {
            if !self.in_detail {
                return Err(self.unexpected(index, c));
            }
            self.in_detail = false;
            self.token.push(c);
            return Ok(Step::Consumed);
        }
        if c == config.options_start {
            return Err(self.unexpected(index, c));
        }
        self.token.push(c);
        Ok(Step::Consumed)
    }

    /// Moves the pending option token into the token list. Returns `false`
    /// when there was nothing to move.
    fn finish_token(&mut self) -> bool {
        let token = self.token.trim_end_matches(self.config.space);
        if token.is_empty() {
            self.token.clear();
            return false;
        }
        self.tokens.push(token.to_string());
        self.token.clear();
        true
    }

    fn trailing_whitespace(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        if self.starts_comment(c) {
            return Ok(self.enter_comment());
        }
        if c == self.config.space {
            return Ok(Step::Consumed);
        }
        if self.starts_delimiter(c) {
            return Ok(self.enter(ScanState::PropertyDelimiter));
        }
        if self.is_structural(c) || self.starts_snippet(c) || self.snippet {
            // Snippet references carry no label.
            return Err(self.unexpected(index, c));
        }
        Ok(self.enter(ScanState::Label))
    }

    fn label(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        if self.starts_comment(c) {
            return Ok(self.enter_comment());
        }
        if self.starts_delimiter(c) {
            return Ok(self.enter(ScanState::PropertyDelimiter));
        }
        if self.is_structural(c) {
            return Err(self.unexpected(index, c));
        }
        self.label.push(c);
        Ok(Step::Consumed)
    }

    fn property_delimiter(&mut self, index: usize, c: char) -> Result<Step, ParseError> {
        let config = self.config;
        let marker = &config.property_delimiter;
        if marker.get(self.marker) != Some(&c) {
            return Err(self.unexpected(index, c));
        }
        self.marker += 1;
        if self.marker == marker.len() {
            self.marker = 0;
            self.line += 1;
            self.state = ScanState::Property;
        }
        Ok(Step::Consumed)
    }

    fn property(&mut self) -> Step {
        self.emit();
        self.enter(ScanState::LeadingWhitespace)
    }

    fn emit(&mut self) {
        if !self.identifier.is_empty() {
            let label = self.label.trim_end_matches(self.config.space);
            let label = (!label.is_empty()).then(|| label.to_string());
            self.records.push(RawProperty {
                snippet: self.snippet,
                identifier: std::mem::take(&mut self.identifier),
                options: self.options.take(),
                label,
                line: self.record_line,
                after_blank_line: std::mem::take(&mut self.blank_line),
            });
        }
        self.snippet = false;
        self.identifier.clear();
        self.options = None;
        self.label.clear();
        self.token.clear();
        self.tokens.clear();
        self.in_detail = false;
    }

    fn finish(mut self, length: usize) -> Result<Vec<RawProperty>, ParseError> {
        if self.state == ScanState::Comment
            && self.marker > 0
            && self.marker < self.config.comment.len()
        {
            self.recover_label();
        }
        let unterminated = match self.state {
            ScanState::SnippetStart | ScanState::Options => true,
            ScanState::Identifier => self.identifier.is_empty(),
            ScanState::Comment => self.marker > 0 && self.marker < self.config.comment.len(),
            _ => false,
        };
        if unterminated {
            return Err(ParseError::UnterminatedConstruct {
                state: self.state,
                index: length,
            });
        }
        self.emit();
        Ok(self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_default(source: &str) -> Result<Vec<RawProperty>, ParseError> {
        scan(&GrammarConfig::default(), source)
    }

    type Shape = (String, Option<Vec<String>>, Option<String>);

    fn record(identifier: &str, options: Option<&[&str]>, label: Option<&str>) -> Shape {
        (
            identifier.to_string(),
            options.map(|o| o.iter().map(|s| s.to_string()).collect()),
            label.map(str::to_string),
        )
    }

    fn shapes(records: &[RawProperty]) -> Vec<Shape> {
        records
            .iter()
            .map(|r| (r.identifier.clone(), r.options.clone(), r.label.clone()))
            .collect()
    }

    #[test]
    fn scans_type_and_properties() {
        let records = scan_default("Article Blog post\n  Text[*, words(3)] Title\n  Date\n").expect("scan");
        assert_eq!(
            shapes(&records),
            vec![
                record("Article", None, Some("Blog post")),
                record("Text", Some(&["*", "words(3)"]), Some("Title")),
                record("Date", None, None),
            ]
        );
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].line, 3);
    }

    #[test]
    fn empty_brackets_differ_from_no_brackets() {
        let records = scan_default("Author[] Writer\nAuthor").expect("scan");
        assert_eq!(records[0].options, Some(vec![]));
        assert_eq!(records[1].options, None);
    }

    #[test]
    fn commas_inside_details_do_not_split_tokens() {
        let records = scan_default("RichText[p,tables(p, ul),*]").expect("scan");
        assert_eq!(
            records[0].options,
            Some(vec!["p".to_string(), "tables(p, ul)".to_string(), "*".to_string()])
        );
    }

    #[test]
    fn comments_blank_lines_and_carriage_returns_are_skipped() {
        let source = "// header\r\n\r\nArticle // trailing\r\n   \r\n  Number[*] Count\r\n";
        let records = scan_default(source).expect("scan");
        assert_eq!(
            shapes(&records),
            vec![
                record("Article", None, None),
                record("Number", Some(&["*"]), Some("Count")),
            ]
        );
    }

    #[test]
    fn snippet_marker_sets_flag() {
        let records = scan_default("Page\n  ...Seo\n").expect("scan");
        assert!(!records[0].snippet);
        assert!(records[1].snippet);
        assert_eq!(records[1].identifier, "Seo");
    }

    #[test]
    fn comma_joined_identifiers_are_kept_whole() {
        let records = scan_default("Author,Editor[1+] People").expect("scan");
        assert_eq!(records[0].identifier, "Author,Editor");
    }

    #[test]
    fn end_of_input_finalizes_the_last_record() {
        let records = scan_default("Article\n  Text[*]").expect("scan");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].options, Some(vec!["*".to_string()]));

        let records = scan_default("Article Label at end").expect("scan");
        assert_eq!(records[0].label.as_deref(), Some("Label at end"));
    }

    #[test]
    fn unterminated_options_is_an_error() {
        let err = scan_default("Text[*, words(3)").expect_err("unterminated");
        assert_eq!(
            err,
            ParseError::UnterminatedConstruct {
                state: ScanState::Options,
                index: 16,
            }
        );
        assert_eq!(err.to_string(), "reached end during Options (index 16)");
    }

    #[test]
    fn structural_character_in_identifier_reports_position() {
        let err = scan_default("Type\nTe]xt").expect_err("bad identifier");
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                character: ']',
                index: 7,
                state: ScanState::Identifier,
            }
        );
    }

    #[test]
    fn dangling_array_delimiter_is_rejected() {
        for source in ["Text[*,]", "Text[,*]", "Asset[*,,1]"] {
            let err = scan_default(source).expect_err(source);
            assert!(
                matches!(
                    err,
                    ParseError::UnexpectedCharacter {
                        state: ScanState::Options,
                        ..
                    }
                ),
                "source={source} err={err}"
            );
        }
    }

    #[test]
    fn snippet_reference_cannot_have_a_label() {
        let err = scan_default("...Seo Label").expect_err("label on snippet");
        assert!(
            matches!(
                err,
                ParseError::UnexpectedCharacter {
                    character: 'L',
                    state: ScanState::TrailingWhitespace,
                    ..
                }
            ),
            "err={err}"
        );
    }

    #[test]
    fn partial_markers_outside_labels_are_errors() {
        let err = scan_default("Type\n/ not a comment").expect_err("half comment");
        assert!(matches!(err, ParseError::UnexpectedCharacter { character: ' ', .. }), "err={err}");

        let err = scan_default("Ty/pe").expect_err("half comment in identifier");
        assert!(
            matches!(
                err,
                ParseError::UnexpectedCharacter {
                    character: 'p',
                    state: ScanState::Comment,
                    ..
                }
            ),
            "err={err}"
        );

        let err = scan_default("...Seo /x").expect_err("snippet has no label");
        assert!(matches!(err, ParseError::UnexpectedCharacter { character: 'x', .. }), "err={err}");

        let err = scan_default("..Seo").expect_err("half snippet");
        assert!(matches!(err, ParseError::UnexpectedCharacter { character: 'S', index: 2, .. }), "err={err}");

        let err = scan_default("...").expect_err("snippet without identifier");
        assert!(matches!(err, ParseError::UnterminatedConstruct { .. }), "err={err}");
    }

    #[test]
    fn half_comment_marker_inside_a_label_is_label_text() {
        let records = scan_default("Text Width/Height\nText and/ or // note\nText /x\nText a/").expect("scan");
        let labels: Vec<_> = records.iter().map(|r| r.label.as_deref()).collect();
        assert_eq!(
            labels,
            vec![Some("Width/Height"), Some("and/ or"), Some("/x"), Some("a/")]
        );
    }

    #[test]
    fn blank_lines_are_flagged_on_the_next_record() {
        let source = "Article\n  Text Title\n\n   \n  Date\n  // note\n  Number\n";
        let records = scan_default(source).expect("scan");
        let flags: Vec<_> = records.iter().map(|r| r.after_blank_line).collect();
        assert_eq!(flags, vec![false, false, true, false]);
        assert_eq!(records[2].line, 5);
    }

    #[test]
    fn bracket_inside_label_is_rejected() {
        let err = scan_default("Text Title [draft]").expect_err("bracket in label");
        assert!(
            matches!(
                err,
                ParseError::UnexpectedCharacter {
                    character: '[',
                    index: 11,
                    state: ScanState::Label,
                }
            ),
            "err={err}"
        );
    }
}
