//! The parse pipeline: scanner, resolver, assembler, statistics.

use tracing::debug;

use crate::assembler::{self, Assembly};
use crate::config::{GrammarConfig, KimmelConfig, ParseMode};
use crate::error::ParseError;
use crate::model::{GraphStats, Kml, TypeDescription};
use crate::resolver::PropertyResolver;
use crate::scanner;
use crate::stats;

/// A configured KML parser.
///
/// Holds no per-parse state, so one parser can be shared across threads.
#[derive(Debug, Clone)]
pub struct KmlParser {
    config: GrammarConfig,
    mode: ParseMode,
}

impl Default for KmlParser {
    fn default() -> Self {
        Self::new(GrammarConfig::default(), ParseMode::Strict)
    }
}

impl From<KimmelConfig> for KmlParser {
    fn from(config: KimmelConfig) -> Self {
        Self::new(config.grammar, config.mode)
    }
}

impl KmlParser {
    pub fn new(config: GrammarConfig, mode: ParseMode) -> Self {
        Self { config, mode }
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn parse(&self, source: &str) -> Result<Kml, ParseError> {
        let records = scanner::scan(&self.config, source)?;

        let resolver = PropertyResolver::new(&self.config);
        let records = records
            .iter()
            .map(|record| resolver.resolve(record))
            .collect::<Result<Vec<_>, _>>()?;

        let Assembly {
            types,
            snippet_types,
        } = assembler::assemble(records, self.mode, &self.config.type_start)?;
        let stats = Self::statistics(&types);

        debug!(
            mode = %self.mode,
            types = types.len(),
            snippet_types = snippet_types.len(),
            closed_chains = stats.closed_chains.len(),
            "parsed kml document"
        );

        Ok(Kml {
            types,
            snippet_types,
            stats,
        })
    }

    pub fn statistics(types: &[TypeDescription]) -> GraphStats {
        stats::chain_statistics(types)
    }
}

/// Parse with the default grammar.
pub fn parse_kml(source: &str, mode: ParseMode) -> Result<Kml, ParseError> {
    KmlParser::new(GrammarConfig::default(), mode).parse(source)
}
