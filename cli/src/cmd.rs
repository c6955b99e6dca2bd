pub mod check;
pub mod init;
pub mod run;

use jgrade_core::workspace::Layout;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Show debug logs
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Show warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Grade a directory
    #[command(alias("r"))]
    Run(run::Args),

    /// Parse a test document and show what it contains, without running anything
    Check(check::Args),

    /// Write an example jgrade.toml
    Init(init::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Run(args) => run::exec(args, self).await,
            Check(args) => check::exec(args, self),
            Init(args) => init::exec(args, self),
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match (self.verbose, self.quiet) {
            (true, _) => log::LevelFilter::Debug,
            (_, true) => log::LevelFilter::Warn,
            _ => log::LevelFilter::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ArgLayout {
    Auto,
    Flat,
    Grouped,
}

impl From<ArgLayout> for Option<Layout> {
    fn from(value: ArgLayout) -> Self {
        use ArgLayout::*;
        match value {
            Auto => None,
            Flat => Some(Layout::Flat),
            Grouped => Some(Layout::Grouped),
        }
    }
}
