//! Canonical KML output for a parse result.
//!
//! Every type header carries its label (which defaults to the id) so a header
//! can never be read back as a bare rich-text component line. Option tokens are
//! written in a fixed order: flags, details, range, required marker.

use crate::config::GrammarConfig;
use crate::model::{
    AssetMode, CountRange, Kml, PropertyDescription, PropertyDetail, RichTextDetail,
    RichTextFormatting, TypeDescription,
};

const INDENT: usize = 2;

pub fn format_kml(kml: &Kml, config: &GrammarConfig) -> String {
    let mut writer = KmlWriter::new(config);
    for ty in kml.types.iter().chain(&kml.snippet_types) {
        writer.write_type(ty);
    }
    writer.out
}

struct KmlWriter<'c> {
    config: &'c GrammarConfig,
    delimiter: String,
    out: String,
}

impl<'c> KmlWriter<'c> {
    fn new(config: &'c GrammarConfig) -> Self {
        Self {
            config,
            delimiter: config.property_delimiter.iter().collect(),
            out: String::new(),
        }
    }

    fn end_line(&mut self) {
        self.out.push_str(&self.delimiter);
    }

    fn indent(&mut self) {
        for _ in 0..INDENT {
            self.out.push(self.config.space);
        }
    }

    fn write_type(&mut self, ty: &TypeDescription) {
        self.out.push_str(&ty.id);
        self.out.push(self.config.space);
        self.out.push_str(if ty.label.is_empty() { &ty.id } else { &ty.label });
        self.end_line();

        for property in &ty.properties {
            self.indent();
            let line = self.property_line(property);
            self.out.push_str(&line);
            self.end_line();

            if let PropertyDetail::RichText(rich_text) = &property.detail {
                for component in &rich_text.component_type_ids {
                    self.indent();
                    self.out.push_str(component);
                    self.end_line();
                }
            }
        }
    }

    fn property_line(&self, property: &PropertyDescription) -> String {
        let config = self.config;
        let kind = property.kind();
        let identifier = config
            .identifier_for_kind(kind)
            .unwrap_or(kind.name())
            .to_string();

        let mut tokens = Vec::new();
        let (head, always_bracket) = match &property.detail {
            PropertyDetail::Type { id } => (id.clone(), false),
            PropertyDetail::Snippet { id } => {
                let marker: String = config.snippet_start.iter().collect();
                return format!("{marker}{id}");
            }
            PropertyDetail::LinkedItems {
                linked_type_ids,
                range,
            } => {
                tokens.extend(self.range_token(range));
                let mut ids = linked_type_ids.join(&config.array_delimiter.to_string());
                // A lone id that names a table row would reparse as that kind.
                if config.kind_for_identifier(&ids).is_some() {
                    ids.push(config.array_delimiter);
                }
                (ids, true)
            }
            PropertyDetail::Asset { mode, range } => {
                if *mode == AssetMode::Images {
                    tokens.push("images".to_string());
                }
                tokens.extend(self.range_token(range));
                (identifier, false)
            }
            PropertyDetail::Text { words, characters } => {
                tokens.extend(self.limit_tokens(*words, *characters));
                (identifier, false)
            }
            PropertyDetail::Date | PropertyDetail::Number | PropertyDetail::Custom => {
                (identifier, false)
            }
            PropertyDetail::SingleChoice { options } | PropertyDetail::MultipleChoice { options } => {
                tokens.extend(options.iter().cloned());
                (identifier, false)
            }
            PropertyDetail::RichText(rich_text) => {
                tokens.extend(self.rich_text_tokens(rich_text));
                (identifier, false)
            }
        };
        if property.required {
            tokens.push(config.required.to_string());
        }

        let mut line = head;
        if always_bracket || !tokens.is_empty() {
            line.push(config.options_start);
            line.push_str(&tokens.join(&config.array_delimiter.to_string()));
            line.push(config.options_end);
        }
        if !property.label.is_empty() {
            line.push(config.space);
            line.push_str(&property.label);
        }
        line
    }

    fn detail_token(&self, name: &str, values: &[String]) -> String {
        format!(
            "{name}{}{}{}",
            self.config.detail_start,
            values.join(&self.config.array_delimiter.to_string()),
            self.config.detail_end
        )
    }

    fn range_token(&self, range: &CountRange) -> Option<String> {
        let more_or_less = self.config.more_or_less;
        match (range.min, range.max) {
            (None, None) => None,
            (Some(min), Some(max)) if min == max => Some(min.to_string()),
            (Some(min), Some(max)) => Some(format!("{min}{}{max}", self.config.range)),
            (Some(min), None) => Some(format!("{min}{more_or_less}")),
            (None, Some(max)) => Some(format!("{more_or_less}{max}")),
        }
    }

    fn limit_tokens(&self, words: Option<u32>, characters: Option<u32>) -> Vec<String> {
        let mut tokens = Vec::new();
        if let Some(words) = words {
            tokens.push(self.detail_token("words", &[words.to_string()]));
        }
        if let Some(characters) = characters {
            tokens.push(self.detail_token("characters", &[characters.to_string()]));
        }
        tokens
    }

    fn rich_text_tokens(&self, rich_text: &RichTextDetail) -> Vec<String> {
        let mut tokens = flag_tokens(&rich_text.formatting);
        if rich_text.tables {
            tokens.push(self.detail_token("tables", &flag_tokens(&rich_text.table_formatting)));
        }
        tokens.extend(self.limit_tokens(rich_text.words, rich_text.characters));
        tokens
    }
}

fn flag_tokens(formatting: &RichTextFormatting) -> Vec<String> {
    formatting
        .enabled()
        .map(|format| format.token().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseMode;
    use crate::parser::parse_kml;

    #[test]
    fn writes_canonical_form() {
        let source = "\
// blog
Article
  Text[words(3),*] Title
  RichText[*,tables(ul),b,p] Body
  Quote
  Asset[1-3,images] Gallery
  Author,Editor[1+] People
  ...Seo
Quote Quote
  SingleChoice[Left,Right] Side
Author
Editor
Seo
  Date
";
        let kml = parse_kml(source, ParseMode::Strict).expect("parse");
        let formatted = format_kml(&kml, &GrammarConfig::default());
        assert_eq!(
            formatted,
            "\
Article Article
  Text[words(3),*] Title
  RichText[p,b,tables(ul),*] Body
  Quote
  Asset[images,1-3] Gallery
  Author,Editor[1+] People
  ...Seo
Quote Quote
  SingleChoice[Left,Right] Side
Author Author
Editor Editor
Seo Seo
  Date
"
        );
    }

    #[test]
    fn formatted_output_parses_to_the_same_model() {
        let source = "A\n  B[] Link\n  Number[*]\nB\n  A,B[+2] Back\n";
        let kml = parse_kml(source, ParseMode::Strict).expect("parse");
        let formatted = format_kml(&kml, &GrammarConfig::default());
        let reparsed = parse_kml(&formatted, ParseMode::Strict).expect("reparse");
        assert_eq!(reparsed, kml);
    }

    #[test]
    fn lone_link_named_like_an_identifier_keeps_its_delimiter() {
        let config = GrammarConfig::default();
        let property = PropertyDescription {
            label: "Files".to_string(),
            required: false,
            detail: PropertyDetail::LinkedItems {
                linked_type_ids: vec!["Asset".to_string()],
                range: Default::default(),
            },
        };
        let line = KmlWriter::new(&config).property_line(&property);
        assert_eq!(line, "Asset,[] Files");

        let records = crate::scanner::scan(&config, &format!("{line}\n")).expect("scan");
        let reparsed = crate::resolver::PropertyResolver::new(&config)
            .describe(&records[0])
            .expect("describe");
        assert_eq!(reparsed, property);
    }
}
