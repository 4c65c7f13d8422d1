//! `kimmel fmt`: rewrite a KML document in canonical form.
//!
//! Formatting goes through a full parse, so comments and blank lines are not
//! preserved and a document that fails to parse is never rewritten.

use std::path::Path;

use anyhow::{anyhow, Result};
use kimmel_kml::{format_kml, KmlParser};

pub fn render_kml(parser: &KmlParser, text: &str) -> Result<String> {
    let kml = parser.parse(text)?;
    Ok(format_kml(&kml, parser.config()))
}

pub fn cmd_fmt_kml(parser: &KmlParser, input: &Path, out: Option<&Path>, write: bool) -> Result<()> {
    if write && out.is_some() {
        return Err(anyhow!("cannot use --write and --out together"));
    }
    let text = std::fs::read_to_string(input)?;
    let rendered =
        render_kml(parser, &text).map_err(|err| anyhow!("{}: {err}", input.display()))?;
    if write {
        std::fs::write(input, rendered)?;
        println!("formatted {}", input.display());
        return Ok(());
    }
    if let Some(out) = out {
        std::fs::write(out, rendered)?;
        println!("wrote {}", out.display());
        return Ok(());
    }
    print!("{rendered}");
    Ok(())
}
