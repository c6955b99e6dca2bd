use std::path::PathBuf;

use jgrade_core::{action, style, testing::parser::ParseMode};

use super::{GlobalArgs, SubcmdResult};
use crate::config;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Test document to parse
    pub file: PathBuf,

    /// Parse as a grouped document (`=== Q<n> ===` / `--- TC<n> ---`)
    #[arg(short, long)]
    pub grouped: bool,
}

pub fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let dir = args
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    let cfg = config::load(dir, None)?;

    let mode = if args.grouped {
        ParseMode::Grouped
    } else {
        ParseMode::Flat
    };
    let doc = action::check_document(&args.file, mode)?;
    style::print_parsed_document(&doc, cfg.report.preview_width);
    Ok(())
}
