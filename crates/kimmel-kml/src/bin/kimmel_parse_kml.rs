use std::{env, fs};

use kimmel_kml::{parse_kml, ParseMode};

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: kimmel_parse_kml <file.kml> [strict|loose]");
        std::process::exit(2);
    };
    let mode = match args.next().as_deref() {
        None | Some("strict") => ParseMode::Strict,
        Some("loose") => ParseMode::Loose,
        Some(other) => {
            eprintln!("unknown mode `{other}` (expected strict or loose)");
            std::process::exit(2);
        }
    };

    let text = match fs::read_to_string(&path) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("failed to read `{path}`: {err}");
            std::process::exit(2);
        }
    };

    match parse_kml(&text, mode) {
        Ok(kml) => {
            println!(
                "ok(kml, {mode}): types={} snippets={} chains={} closed={}",
                kml.types.len(),
                kml.snippet_types.len(),
                kml.stats.chains.len(),
                kml.stats.closed_chains.len()
            );
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
