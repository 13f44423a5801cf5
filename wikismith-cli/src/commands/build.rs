//! Build command implementation.

use super::{compile, SitePaths};
use anyhow::{Context, Result};

/// Compile the site once and print a summary
pub fn build_site(site: &SitePaths, json: bool) -> Result<()> {
    tracing::info!("Building {:?} into {:?}", site.input, site.output);
    let report = compile(site)?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
    } else {
        println!(
            "Compiled {} pages and {} assets into {}",
            report.pages.len(),
            report.assets.len(),
            site.output.display()
        );
        if report.broken_links > 0 {
            println!("{} broken links", report.broken_links);
        }
    }

    Ok(())
}
