use std::path::PathBuf;

use jgrade_core::{
    action::{self, ReportMode},
    workspace::{LayoutError, Workspace},
};

use super::{ArgLayout, GlobalArgs, SubcmdResult};
use crate::config;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Directory to grade
    #[arg(default_value = "./")]
    pub dir: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ArgLayout::Auto)]
    pub layout: ArgLayout,

    /// Time limit per test case, in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Print the result as JSON instead of the report
    #[arg(long)]
    pub json: bool,
}

pub async fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(&args.dir, args.timeout)?;
    let mode = if args.json {
        ReportMode::Silent
    } else {
        ReportMode::Console
    };

    let res = match action::do_grade(&args.dir, args.layout.into(), &cfg, mode).await {
        Ok(res) => res,
        Err(e) => {
            if e.downcast_ref::<LayoutError>().is_some() {
                let ws = Workspace::new(&args.dir, args.layout.into(), &cfg);
                eprintln!("Expected layout ({}):\n{}\n", ws.layout, ws.expected_tree());
            }
            return Err(e);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&res)?);
    }
    Ok(())
}
