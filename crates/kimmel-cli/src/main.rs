//! Kimmel CLI
//!
//! Command-line front end for KML content-schema documents:
//! - `check`: parse and summarize a document
//! - `parse`: emit the parsed model as JSON
//! - `fmt`: rewrite a document in canonical form
//! - `stats`: print link-chain statistics

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};

use kimmel_kml::{KimmelConfig, Kml, KmlParser, ParseMode};

mod kml_fmt;

#[derive(Parser)]
#[command(name = "kimmel")]
#[command(author, version, about = "Kimmel: content schemas described in KML")]
struct Cli {
    /// Log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print a summary of its types.
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Parse a document and write the result as JSON.
    Parse {
        #[command(flatten)]
        source: SourceArgs,
        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Rewrite a document in canonical KML.
    Fmt {
        #[command(flatten)]
        source: SourceArgs,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Rewrite the input file in place
        #[arg(long)]
        write: bool,
    },

    /// Print link-chain statistics.
    Stats {
        #[command(flatten)]
        source: SourceArgs,
        /// Print at most this many chains
        #[arg(long)]
        max_chains: Option<usize>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Input KML document
    input: PathBuf,
    /// Parse mode; overrides the mode from `--config`
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Grammar config document (`kimmel.json`)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Strict,
    Loose,
}

impl From<ModeArg> for ParseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => ParseMode::Strict,
            ModeArg::Loose => ParseMode::Loose,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { source } => cmd_check(&source),
        Commands::Parse { source, out } => cmd_parse(&source, out.as_ref()),
        Commands::Fmt { source, out, write } => {
            let parser = load_parser(&source)?;
            kml_fmt::cmd_fmt_kml(&parser, &source.input, out.as_deref(), write)
        }
        Commands::Stats { source, max_chains } => cmd_stats(&source, max_chains),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_parser(source: &SourceArgs) -> Result<KmlParser> {
    let mut config = match &source.config {
        Some(path) => KimmelConfig::load(path)
            .map_err(|err| anyhow!("failed to load config `{}`: {err}", path.display()))?,
        None => KimmelConfig::default(),
    };
    if let Some(mode) = source.mode {
        config.mode = mode.into();
    }
    info!(mode = %config.mode, custom_grammar = source.config.is_some(), "configured parser");
    Ok(KmlParser::from(config))
}

fn parse_input(source: &SourceArgs) -> Result<Kml> {
    let parser = load_parser(source)?;
    let text = fs::read_to_string(&source.input)
        .map_err(|err| anyhow!("failed to read `{}`: {err}", source.input.display()))?;
    parser
        .parse(&text)
        .map_err(|err| anyhow!("{}: {err}", source.input.display()))
}

fn cmd_check(source: &SourceArgs) -> Result<()> {
    println!("{} {}", "Checking".green().bold(), source.input.display());

    let kml = parse_input(source)?;

    println!("  Types: {}", kml.types.len());
    println!("  Snippets: {}", kml.snippet_types.len());
    for ty in &kml.types {
        println!(
            "    Type {} ({}): {} properties, {} links",
            ty.id.yellow(),
            ty.label,
            ty.properties.len(),
            ty.linked_type_ids.len()
        );
    }
    for ty in &kml.snippet_types {
        println!(
            "    Snippet {} ({}): {} properties",
            ty.id.cyan(),
            ty.label,
            ty.properties.len()
        );
    }
    for chain in &kml.stats.closed_chains {
        println!("  {} {}", "Cycle".yellow(), chain);
    }

    println!("{}", "Valid.".green());
    Ok(())
}

fn cmd_parse(source: &SourceArgs, out: Option<&PathBuf>) -> Result<()> {
    let kml = parse_input(source)?;
    let json = serde_json::to_string_pretty(&kml)?;
    match out {
        Some(out) => {
            fs::write(out, json)?;
            println!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_stats(source: &SourceArgs, max_chains: Option<usize>) -> Result<()> {
    let kml = parse_input(source)?;
    let stats = &kml.stats;
    let limit = max_chains.unwrap_or(usize::MAX);

    println!("{} {}", "Statistics".green().bold(), source.input.display());
    println!("  Types: {}", stats.total_types);
    match stats.max_chain_depth {
        Some(depth) => println!("  Max chain depth: {depth}"),
        None => println!("  Max chain depth: -"),
    }

    println!("  Chains: {}", stats.chains.len());
    for chain in stats.chains.iter().take(limit) {
        println!("    {}", chain.cyan());
    }
    if stats.chains.len() > limit {
        println!("    ... {} more", stats.chains.len() - limit);
    }

    println!("  Closed chains: {}", stats.closed_chains.len());
    for chain in stats.closed_chains.iter().take(limit) {
        println!("    {}", chain.yellow());
    }
    if stats.closed_chains.len() > limit {
        println!("    ... {} more", stats.closed_chains.len() - limit);
    }
    Ok(())
}
