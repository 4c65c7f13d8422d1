//! Integration tests for the complete KML pipeline
//!
//! These tests run the fixture documents under `tests/fixtures/` through the
//! public API in both parse modes:
//! - valid documents parse, format and re-parse to the same model
//! - invalid documents fail in strict mode
//! - repairable documents fail in strict mode and succeed in loose mode
//!
//! Run with: cargo test --test integration_tests

use std::path::Path;

use kimmel_kml::{format_kml, parse_kml, GrammarConfig, KimmelConfig, KmlParser, ParseMode};

/// Fixture files hold several documents separated by a line of dashes.
const DOCUMENT_SEPARATOR: &str = "------------------------------------";

fn fixture_documents(name: &str) -> Vec<String> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let text = std::fs::read_to_string(&path).expect("read fixture");
    text.split(DOCUMENT_SEPARATOR)
        .filter(|document| !document.trim().is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Strict mode
// ============================================================================

#[test]
fn test_strict_valid_documents_parse_in_both_modes() {
    let documents = fixture_documents("strict_valid.kml");
    assert_eq!(documents.len(), 5);

    for document in &documents {
        let strict = parse_kml(document, ParseMode::Strict)
            .unwrap_or_else(|err| panic!("strict: {err}\n{document}"));
        let loose = parse_kml(document, ParseMode::Loose)
            .unwrap_or_else(|err| panic!("loose: {err}\n{document}"));
        assert_eq!(strict, loose, "document={document}");
        assert!(!strict.types.is_empty(), "document={document}");
    }
}

#[test]
fn test_strict_invalid_documents_fail() {
    let documents = fixture_documents("strict_invalid.kml");
    assert_eq!(documents.len(), 12);

    for document in &documents {
        let result = parse_kml(document, ParseMode::Strict);
        assert!(result.is_err(), "expected an error for:\n{document}");
    }
}

#[test]
fn test_formatting_valid_documents_is_idempotent() {
    let config = GrammarConfig::default();
    for document in fixture_documents("strict_valid.kml") {
        let kml = parse_kml(&document, ParseMode::Strict).expect("parse");
        let formatted = format_kml(&kml, &config);
        let reparsed = parse_kml(&formatted, ParseMode::Strict).expect("reparse formatted");
        assert_eq!(reparsed, kml, "formatted:\n{formatted}");
        assert_eq!(format_kml(&reparsed, &config), formatted);
    }
}

// ============================================================================
// Loose mode
// ============================================================================

#[test]
fn test_loose_repairs_what_strict_rejects() {
    let documents = fixture_documents("loose_repairs.kml");
    assert_eq!(documents.len(), 4);

    for document in &documents {
        assert!(
            parse_kml(document, ParseMode::Strict).is_err(),
            "strict should reject:\n{document}"
        );
        let kml = parse_kml(document, ParseMode::Loose)
            .unwrap_or_else(|err| panic!("loose: {err}\n{document}"));

        // Every link resolves to a type in the result.
        for ty in &kml.types {
            for link in &ty.linked_type_ids {
                assert!(kml.find_type(link).is_some(), "dangling link {link}");
            }
            for snippet in &ty.snippet_type_ids {
                assert!(
                    kml.snippet_types.iter().any(|s| &s.id == snippet),
                    "dangling snippet {snippet}"
                );
            }
        }
    }
}

#[test]
fn test_loose_output_formats_and_reparses_strictly() {
    let config = GrammarConfig::default();
    for document in fixture_documents("loose_repairs.kml") {
        let kml = parse_kml(&document, ParseMode::Loose).expect("loose");
        let formatted = format_kml(&kml, &config);
        let reparsed = parse_kml(&formatted, ParseMode::Strict)
            .unwrap_or_else(|err| panic!("{err}\n{formatted}"));
        assert_eq!(reparsed.types.len(), kml.types.len());
        assert_eq!(reparsed.snippet_types.len(), kml.snippet_types.len());
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_custom_grammar_from_config_file() {
    let document = r##"{
        "mode": "strict",
        "comments": "#",
        "space": " ",
        "array_delimiter": ";",
        "options_start": "{",
        "options_end": "}",
        "option_detail_start": "<",
        "option_detail_end": ">",
        "more_or_less": "+",
        "range": "~",
        "required": "!",
        "property_delimiter": "\n",
        "snippet_start": "@",
        "skip": "\r",
        "properties": [
            { "kind": "type" },
            { "kind": "snippet" },
            { "kind": "linked_items" },
            { "identifier": "Texto", "kind": "text" },
            { "identifier": "Archivo", "kind": "asset" },
            { "identifier": "Rico", "kind": "rich_text" }
        ],
        "no_property_fallback": "linked_items",
        "no_options_fallback": "type",
        "snippet_type": "snippet",
        "type_start": "type"
    }"##;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("kimmel.json");
    std::fs::write(&path, document).expect("write config");
    let config = KimmelConfig::load(&path).expect("load config");
    let parser = KmlParser::from(config);

    let source = "# custom syntax\nArticulo Article\n  Texto{!;words<3>} Title\n  Archivo{images;1~4} Photos\n  Autor;Editor{} People\n  @Seo\nAutor\nEditor\nSeo\n";
    let kml = parser.parse(source).expect("parse custom grammar");

    assert_eq!(kml.types.len(), 3);
    assert_eq!(kml.snippet_types.len(), 1);
    let article = &kml.types[0];
    assert_eq!(article.label, "Article");
    assert!(article.properties[0].required);
    assert_eq!(
        article.linked_type_ids.iter().collect::<Vec<_>>(),
        vec!["Autor", "Editor"]
    );

    let formatted = format_kml(&kml, parser.config());
    assert!(formatted.contains("  Texto{words<3>;!} Title\n"), "formatted:\n{formatted}");
    assert!(formatted.contains("  Archivo{images;1~4} Photos\n"), "formatted:\n{formatted}");
    assert!(formatted.contains("  @Seo\n"), "formatted:\n{formatted}");
    assert_eq!(parser.parse(&formatted).expect("reparse"), kml);
}
