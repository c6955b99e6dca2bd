use std::io::Write as _;

use clap::Parser;
use colored::Colorize as _;
use jgrade_cli::cmd::GlobalArgs;
use jgrade_core::{style::ColorTheme as _, workspace::LayoutError};

fn init_logger(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("jgrade_core", level)
        .filter_module("jgrade_cli", level)
        .filter_module("fsutil", level)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            let level = record.level();
            writeln!(
                buf,
                "{} {}",
                format!("[{}]", level).color(level.color()).bold(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() {
    let app = GlobalArgs::parse();
    init_logger(app.log_level());

    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("{} {:?}", "Error:".bright_red().bold(), e);
        let code = if e.downcast_ref::<LayoutError>().is_some() {
            2
        } else {
            1
        };
        std::process::exit(code);
    });
}
