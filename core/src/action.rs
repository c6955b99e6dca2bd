pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::{Path, PathBuf};

use error::*;

use crate::config::Config;
use crate::style::{self, ConsoleReporter};
use crate::testing::{
    parser::{self, ParseMode, ParsedDocument},
    scoring, SessionResult, TestSuite,
};
use crate::workspace::{Layout, Workspace};

/// How a grading run reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Spinners, per-case previews and a summary on stdout
    Console,
    /// Nothing is printed; the caller renders the result
    Silent,
}

/// Checks the layout of `dir`, reads its test cases and scores every group.
///
/// Fails with [`LayoutError`](crate::workspace::LayoutError) before anything is run
/// if required files or directories are missing.
pub async fn do_grade(
    dir: impl AsRef<Path>,
    layout: Option<Layout>,
    cfg: &Config,
    mode: ReportMode,
) -> Result<SessionResult> {
    let ws = Workspace::new(dir.as_ref(), layout, cfg);
    log::info!(
        "Grading {} ({} layout)",
        ws.root.to_string_lossy(),
        ws.layout
    );

    let suite = ws.load_suite()?;
    report_diagnostics(&suite, mode);
    if suite.num_cases() == 0 {
        log::warn!("No test case found");
    }

    let resolver = ws.resolver();
    let launcher = cfg.run.launcher();

    let res = match mode {
        ReportMode::Console => {
            let mut reporter = ConsoleReporter::new(cfg.report.clone());
            let res = scoring::score(&suite, &resolver, &launcher, &mut reporter).await;
            style::print_session_summary(&res);
            res
        }
        ReportMode::Silent => scoring::score(&suite, &resolver, &launcher, &mut ()).await,
    };
    Ok(res)
}

fn report_diagnostics(suite: &TestSuite, mode: ReportMode) {
    for d in &suite.diagnostics {
        log::warn!("{}", d);
    }
    if mode == ReportMode::Console && !suite.diagnostics.is_empty() {
        style::print_diagnostics(&suite.diagnostics);
    }
}

/// Parses one test document without running anything.
pub fn check_document(path: impl AsRef<Path>, mode: ParseMode) -> Result<ParsedDocument> {
    let path = path.as_ref();
    let text = fsutil::read_to_string(path).context("Failed to read test document")?;
    Ok(parser::parse(&text, mode))
}

/// Writes the example config into `dir`.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    ensure!(!path.exists(), "Already exists: {}", path.to_string_lossy());
    fsutil::write_with_mkdir(&path, Config::example_toml())
        .context("Failed to write config file")?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::JudgeCode;
    use crate::workspace::LayoutError;

    fn touch(root: &Path, rel: &str, contents: &str) {
        fsutil::write_with_mkdir(root.join(rel), contents).unwrap();
    }

    fn sh_config() -> Config {
        let mut cfg = Config::default();
        cfg.flat.compile_before_run = false;
        cfg.run.class_command = vec!["/bin/sh".into(), "#{className}.sh".into()];
        cfg
    }

    #[tokio::test]
    async fn grade_flat_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "given/src/Main.class", "");
        touch(root, "given/src/Main.sh", "read x; echo \"OUTPUT: $((x * 2))\"\n");
        touch(root, "TestCases/tc1.txt", "INPUT:\n2\nOUTPUT:\n4\nMARK:\n3\n");
        touch(root, "TestCases/tc2.txt", "INPUT:\n5\nOUTPUT:\n11\nMARK:\n1\n");

        let res = do_grade(root, None, &sh_config(), ReportMode::Silent)
            .await
            .unwrap();

        let judges: Vec<_> = res.cases().map(|c| (c.name.as_str(), c.judge)).collect();
        assert_eq!(judges, [("tc1", JudgeCode::AC), ("tc2", JudgeCode::WA)]);
        assert_eq!((res.earned, res.total), (3.0, 4.0));
        assert_eq!(res.groups[0].artifact.as_deref(), Some("Main"));
    }

    #[tokio::test]
    async fn missing_layout_aborts_before_running() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "TestCases/tc1.txt", "INPUT:\nOUTPUT:\n");

        let err = do_grade(tmp.path(), None, &sh_config(), ReportMode::Silent)
            .await
            .unwrap_err();
        let Some(LayoutError::Missing(paths)) = err.downcast_ref::<LayoutError>() else {
            panic!("unexpected error: {:#}", err)
        };
        assert_eq!(paths, &[tmp.path().join("given/src")]);
    }

    #[test]
    fn check_document_reports_diagnostics() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tests.txt");
        fsutil::write(&path, "=== Q1 ===\n--- TC1 ---\nINPUT:\nx\nOUTPUT:\nx\n").unwrap();

        let doc = check_document(&path, ParseMode::Grouped).unwrap();
        assert_eq!(doc.cases().count(), 0);
        assert_eq!(doc.diagnostics.len(), 1);

        let doc = check_document(&path, ParseMode::Flat).unwrap();
        assert_eq!(doc.cases().count(), 1);

        assert!(check_document(tmp.path().join("none.txt"), ParseMode::Flat).is_err());
    }

    #[test]
    fn init_writes_example_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = init_config(tmp.path()).unwrap();
        let cfg = Config::from_toml_file(path).unwrap();
        assert_eq!(cfg.report, Config::default().report);
        assert!(init_config(tmp.path()).is_err());
    }
}
