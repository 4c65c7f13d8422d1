//! Grammar of a single option token: detail groups and numeric ranges.
//!
//! Both are small enough to parse with `nom` combinators over one token. The
//! bracket/paren/range characters come from the grammar config, so the parsers
//! are built per call rather than as free `fn`s.

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char as pchar, digit1};
use nom::combinator::{all_consuming, map, map_res};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::IResult;

use crate::config::GrammarConfig;
use crate::error::ParseError;
use crate::model::CountRange;

/// A `name(v1,v2,...)` option token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Detail<'a> {
    pub name: &'a str,
    pub values: Vec<&'a str>,
}

/// Split a detail token into its name and values.
///
/// Returns `Ok(None)` for tokens without a detail-start character; those are
/// plain flags or choice values. A token that opens a detail group but does
/// not follow `name(v,...)` exactly is a `MalformedOption`.
pub(crate) fn parse_detail<'a>(
    token: &'a str,
    config: &GrammarConfig,
) -> Result<Option<Detail<'a>>, ParseError> {
    let open = config.detail_start;
    let close = config.detail_end;
    let delimiter = config.array_delimiter;

    if !token.contains(open) {
        return Ok(None);
    }

    let name = take_while1(move |c: char| c != open && c != close);
    let value = map(
        take_while1(move |c: char| c != delimiter && c != open && c != close),
        |value: &'a str| value.trim_matches(config.space),
    );
    let values = delimited(
        pchar(open),
        separated_list0(pchar(delimiter), value),
        pchar(close),
    );
    let mut detail = all_consuming(pair(name, values));

    let result: IResult<&'a str, (&'a str, Vec<&'a str>)> = detail(token);
    match result {
        Ok((_, (name, values))) => Ok(Some(Detail {
            name: name.trim_matches(config.space),
            values,
        })),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            Err(malformed(token, err.input))
        }
        Err(nom::Err::Incomplete(_)) => Err(malformed(token, "")),
    }
}

fn malformed(token: &str, remaining: &str) -> ParseError {
    let consumed = &token[..token.len() - remaining.len()];
    let character = remaining
        .chars()
        .next()
        .or_else(|| token.chars().last())
        .unwrap_or_default();
    ParseError::MalformedOption {
        option: token.to_string(),
        character,
        index: consumed.chars().count(),
    }
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>)(input)
}

/// Parse a count range token: `N`, `N+`, `+N` or `N-M`.
///
/// A token that begins with the range character is an error. Any other token
/// that is not a well-formed range yields `Ok(None)`: malformed numerics are
/// dropped rather than reported, so callers treat `None` as "no range".
pub(crate) fn parse_range(token: &str, config: &GrammarConfig) -> Result<Option<CountRange>, ParseError> {
    let more_or_less = config.more_or_less;
    let range = config.range;

    if token.starts_with(range) {
        return Err(ParseError::MalformedOption {
            option: token.to_string(),
            character: range,
            index: 0,
        });
    }

    let at_most = map(preceded(pchar(more_or_less), number), |max| CountRange {
        min: None,
        max: Some(max),
    });
    let at_least = map(terminated(number, pchar(more_or_less)), |min| CountRange {
        min: Some(min),
        max: None,
    });
    let between = map(separated_pair(number, pchar(range), number), |(min, max)| {
        CountRange {
            min: Some(min),
            max: Some(max),
        }
    });
    let exact = map(number, CountRange::exact);

    let mut parser = all_consuming(alt((at_most, at_least, between, exact)));
    let result: IResult<&str, CountRange> = parser(token);
    Ok(result.ok().map(|(_, parsed)| parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(token: &str) -> Result<Option<Detail<'_>>, ParseError> {
        parse_detail(token, &GrammarConfig::default())
    }

    fn range(token: &str) -> Result<Option<CountRange>, ParseError> {
        parse_range(token, &GrammarConfig::default())
    }

    #[test]
    fn plain_tokens_are_not_details() {
        assert_eq!(detail("images").expect("plain"), None);
        assert_eq!(detail("Choice 1").expect("plain"), None);
    }

    #[test]
    fn details_split_into_name_and_values() {
        let parsed = detail("tables(p, ul,h1)").expect("detail").expect("some");
        assert_eq!(parsed.name, "tables");
        assert_eq!(parsed.values, vec!["p", "ul", "h1"]);

        let parsed = detail("words(3)").expect("detail").expect("some");
        assert_eq!(parsed, Detail { name: "words", values: vec!["3"] });

        let parsed = detail("tables()").expect("detail").expect("some");
        assert!(parsed.values.is_empty());
    }

    #[test]
    fn malformed_details_report_the_offending_character() {
        let err = detail("words(3)x").expect_err("trailing text");
        assert_eq!(
            err,
            ParseError::MalformedOption {
                option: "words(3)x".to_string(),
                character: 'x',
                index: 8,
            }
        );

        let err = detail("(3)").expect_err("no name");
        assert_eq!(err.position(), Some(('(', 0)));

        let err = detail("tables(p,)").expect_err("dangling delimiter");
        assert_eq!(err.position(), Some((',', 8)));
    }

    #[test]
    fn range_shapes() {
        assert_eq!(range("3").expect("ok"), Some(CountRange::exact(3)));
        assert_eq!(
            range("2+").expect("ok"),
            Some(CountRange {
                min: Some(2),
                max: None
            })
        );
        assert_eq!(
            range("+4").expect("ok"),
            Some(CountRange {
                min: None,
                max: Some(4)
            })
        );
        assert_eq!(
            range("1-5").expect("ok"),
            Some(CountRange {
                min: Some(1),
                max: Some(5)
            })
        );
    }

    #[test]
    fn malformed_ranges_are_dropped_silently() {
        // Current behaviour: no error, no range.
        for token in ["3-", "2++", "1-5-7", "x", "1.5", "99999999999"] {
            assert_eq!(range(token).expect(token), None, "token={token}");
        }
    }

    #[test]
    fn leading_range_character_is_an_error() {
        let err = range("-3").expect_err("leading range");
        assert_eq!(err.position(), Some(('-', 0)));
    }
}
