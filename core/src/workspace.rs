//! Directory layouts a grading run works on.
//!
//! Flat:
//! ```text
//! <root>/given/src/*.java      sources and/or compiled classes
//! <root>/TestCases/tc*.txt     one test case per file
//! ```
//!
//! Grouped:
//! ```text
//! <root>/tests.txt             every question and test case
//! <root>/<N>/run/*.jar         packaged program for question N
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{Config, FlatConfig, GroupedConfig};
use crate::testing::{
    java_sources, run_to_completion, GroupId, Invocation, Resolution, ResolutionError, Resolve,
    TestSuite,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Flat,
    Grouped,
}

impl Layout {
    /// Grouped if the grouped document exists in `root`, otherwise flat.
    pub fn detect(root: impl AsRef<Path>, cfg: &GroupedConfig) -> Self {
        if root.as_ref().join(&cfg.document).is_file() {
            Layout::Grouped
        } else {
            Layout::Flat
        }
    }
}

/// Required files or directories are absent. Nothing has been run.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Missing required files or directories:{}", list_paths(.0))]
    Missing(Vec<PathBuf>),
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n  - {}", p.to_string_lossy()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub layout: Layout,
    flat: FlatConfig,
    grouped: GroupedConfig,
    timeout: Duration,
}

impl Workspace {
    /// `layout: None` detects the layout from the directory contents.
    pub fn new(root: impl Into<PathBuf>, layout: Option<Layout>, cfg: &Config) -> Self {
        let root = root.into();
        let layout = layout.unwrap_or_else(|| Layout::detect(&root, &cfg.grouped));
        Self {
            root,
            layout,
            flat: cfg.flat.clone(),
            grouped: cfg.grouped.clone(),
            timeout: cfg.run.timeout,
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.flat.source_dir)
    }

    pub fn testcase_dir(&self) -> PathBuf {
        self.root.join(&self.flat.testcase_dir)
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(&self.grouped.document)
    }

    pub fn group_dir(&self, n: u32) -> PathBuf {
        self.root.join(n.to_string())
    }

    /// Checks the required paths, then reads every test case.
    ///
    /// All missing paths are reported together as a [`LayoutError`].
    pub fn load_suite(&self) -> anyhow::Result<TestSuite> {
        if !self.root.is_dir() {
            return Err(LayoutError::Missing(vec![self.root.clone()]).into());
        }
        match self.layout {
            Layout::Flat => {
                let missing: Vec<_> = [self.source_dir(), self.testcase_dir()]
                    .into_iter()
                    .filter(|dir| !dir.is_dir())
                    .collect();
                if !missing.is_empty() {
                    return Err(LayoutError::Missing(missing).into());
                }
                TestSuite::from_flat_dir(self.testcase_dir(), &self.flat.testcase_pattern)
            }
            Layout::Grouped => {
                let document = self.document_path();
                if !document.is_file() {
                    return Err(LayoutError::Missing(vec![document]).into());
                }
                let suite = TestSuite::from_grouped_document(&document)?;
                let missing: Vec<_> = suite
                    .groups
                    .iter()
                    .filter(|g| !g.cases.is_empty())
                    .filter_map(|g| match g.id {
                        GroupId::Question(n) => Some(self.group_dir(n)),
                        GroupId::Single => None,
                    })
                    .filter(|dir| !dir.is_dir())
                    .collect();
                if !missing.is_empty() {
                    return Err(LayoutError::Missing(missing).into());
                }
                Ok(suite)
            }
        }
    }

    /// The directory tree this layout expects, for error messages.
    pub fn expected_tree(&self) -> String {
        let root = self.root.to_string_lossy();
        match self.layout {
            Layout::Flat => format!(
                "{}/\n├── {}/    (Java sources)\n└── {}/    ({})",
                root,
                self.flat.source_dir.to_string_lossy(),
                self.flat.testcase_dir.to_string_lossy(),
                self.flat.testcase_pattern.as_str(),
            ),
            Layout::Grouped => format!(
                "{}/\n├── {}\n├── 1/{}/{}\n└── <N>/{}/{}",
                root,
                self.grouped.document.to_string_lossy(),
                self.grouped.archive_dir.to_string_lossy(),
                self.grouped.archive_pattern.as_str(),
                self.grouped.archive_dir.to_string_lossy(),
                self.grouped.archive_pattern.as_str(),
            ),
        }
    }

    pub fn resolver(&self) -> WorkspaceResolver {
        WorkspaceResolver {
            workspace: self.clone(),
        }
    }
}

/// Resolves groups of a [`Workspace`]. In the flat layout the sources are compiled first
/// when `compile_before_run` is set.
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    workspace: Workspace,
}

impl WorkspaceResolver {
    async fn compile(&self, src_dir: &Path) -> Result<(), ResolutionError> {
        let sources = java_sources(src_dir)?;
        if sources.is_empty() {
            return Err(ResolutionError::NoSource(src_dir.to_owned()));
        }

        let mut argv = self.workspace.flat.compile_command.clone();
        argv.extend(
            sources
                .iter()
                .filter_map(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned()),
        );
        let Some(inv) = Invocation::from_argv(argv, src_dir) else {
            return Err(ResolutionError::Compile("Empty compile command".to_owned()))
        };

        log::info!("Compiling: {}", inv.command_line());
        run_to_completion(&inv, self.workspace.timeout)
            .await
            .map_err(ResolutionError::Compile)
    }
}

#[async_trait]
impl Resolve for WorkspaceResolver {
    async fn resolve(&self, group: GroupId) -> Result<Resolution, ResolutionError> {
        let ws = &self.workspace;
        match (ws.layout, group) {
            (Layout::Grouped, GroupId::Question(n)) => {
                ws.grouped.archive_resolver().resolve(ws.group_dir(n))
            }
            (Layout::Grouped, GroupId::Single) => Err(ResolutionError::MissingDir(ws.root.clone())),
            (Layout::Flat, _) => {
                let src = ws.source_dir();
                if !src.is_dir() {
                    return Err(ResolutionError::MissingDir(src));
                }
                if ws.flat.compile_before_run {
                    self.compile(&src).await?;
                }
                ws.flat.class_resolver().resolve(&src)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{Executable, ResolutionStrategy};

    fn touch(root: &Path, rel: &str, contents: &str) {
        fsutil::write_with_mkdir(root.join(rel), contents).unwrap();
    }

    fn missing_of(res: anyhow::Result<TestSuite>) -> Vec<PathBuf> {
        match res.unwrap_err().downcast::<LayoutError>() {
            Ok(LayoutError::Missing(paths)) => paths,
            Err(e) => panic!("unexpected error: {:#}", e),
        }
    }

    const TESTS_TXT: &str = "\
=== Q1 ===
--- TC1 ---
INPUT:
x
OUTPUT:
x
REMOVE_SPACES:
NO
CASE_SENSITIVE:
YES
MARK:
1
=== Q2 ===
=== Q3 ===
--- TC1 ---
INPUT:
y
OUTPUT:
y
REMOVE_SPACES:
NO
CASE_SENSITIVE:
YES
MARK:
1
";

    #[test]
    fn detect_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config::default();
        assert_eq!(Layout::detect(tmp.path(), &cfg.grouped), Layout::Flat);
        touch(tmp.path(), "tests.txt", "");
        assert_eq!(Layout::detect(tmp.path(), &cfg.grouped), Layout::Grouped);
        assert_eq!("grouped".parse::<Layout>().unwrap(), Layout::Grouped);
    }

    #[test]
    fn flat_missing_dirs_are_reported_together() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), Some(Layout::Flat), &Config::default());
        assert_eq!(
            missing_of(ws.load_suite()),
            [tmp.path().join("given/src"), tmp.path().join("TestCases")]
        );

        let ws = Workspace::new(tmp.path().join("nope"), None, &Config::default());
        assert_eq!(missing_of(ws.load_suite()), [tmp.path().join("nope")]);
    }

    #[test]
    fn grouped_requires_dirs_of_nonempty_groups() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), Some(Layout::Grouped), &Config::default());
        assert_eq!(missing_of(ws.load_suite()), [tmp.path().join("tests.txt")]);

        touch(tmp.path(), "tests.txt", TESTS_TXT);
        touch(tmp.path(), "1/run/a.jar", "");
        let ws = Workspace::new(tmp.path(), None, &Config::default());
        assert_eq!(ws.layout, Layout::Grouped);
        // Q2 has no cases, so 2/ is not required
        assert_eq!(missing_of(ws.load_suite()), [tmp.path().join("3")]);

        fsutil::mkdir_all(tmp.path().join("3")).unwrap();
        let suite = ws.load_suite().unwrap();
        assert_eq!(suite.groups.len(), 3);
        assert_eq!(suite.num_cases(), 2);
    }

    #[tokio::test]
    async fn grouped_resolution_per_question() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "tests.txt", TESTS_TXT);
        touch(tmp.path(), "1/run/q1-dist.jar", "");
        fsutil::mkdir_all(tmp.path().join("3")).unwrap();

        let resolver = Workspace::new(tmp.path(), None, &Config::default()).resolver();
        let r = resolver.resolve(GroupId::Question(1)).await.unwrap();
        assert_eq!(r.executable.display_name(), "q1-dist.jar");

        let res = resolver.resolve(GroupId::Question(3)).await;
        assert!(matches!(res, Err(ResolutionError::MissingDir(_))));
    }

    fn flat_cfg(compile_command: &[&str]) -> Config {
        let mut cfg = Config::default();
        cfg.flat.compile_command = compile_command.iter().map(|s| s.to_string()).collect();
        cfg
    }

    #[tokio::test]
    async fn flat_compiles_then_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "given/src/Main.java", "public class Main {}");
        touch(tmp.path(), "given/src/Util.java", "class Util {}");
        fsutil::mkdir_all(tmp.path().join("TestCases")).unwrap();

        // stands in for javac: records its arguments and emits a class file
        let cfg = flat_cfg(&["/bin/sh", "-c", "echo \"$@\" > args.txt; touch Main.class", "sh"]);
        let resolver = Workspace::new(tmp.path(), None, &cfg).resolver();
        let r = resolver.resolve(GroupId::Single).await.unwrap();

        assert_eq!(r.strategy, ResolutionStrategy::NamedArtifact);
        assert_eq!(
            r.executable,
            Executable::Class {
                class_name: "Main".into(),
                class_dir: tmp.path().join("given/src"),
            }
        );
        let args = fsutil::read_to_string(tmp.path().join("given/src/args.txt")).unwrap();
        assert_eq!(args.trim(), "Main.java Util.java");
    }

    #[tokio::test]
    async fn flat_compile_failures() {
        let tmp = tempfile::tempdir().unwrap();
        fsutil::mkdir_all(tmp.path().join("given/src")).unwrap();

        let cfg = flat_cfg(&["/bin/sh", "-c", "echo 'Main.java:3: error' >&2; exit 1", "sh"]);
        let resolver = Workspace::new(tmp.path(), Some(Layout::Flat), &cfg).resolver();
        let res = resolver.resolve(GroupId::Single).await;
        assert!(matches!(res, Err(ResolutionError::NoSource(_))));

        touch(tmp.path(), "given/src/Main.java", "public class Main {}");
        match resolver.resolve(GroupId::Single).await {
            Err(ResolutionError::Compile(msg)) => assert_eq!(msg, "Main.java:3: error"),
            res => panic!("unexpected: {:?}", res),
        }

        let mut cfg = cfg;
        cfg.flat.compile_before_run = false;
        let resolver = Workspace::new(tmp.path(), Some(Layout::Flat), &cfg).resolver();
        let r = resolver.resolve(GroupId::Single).await.unwrap();
        assert_eq!(r.strategy, ResolutionStrategy::DefaultName);
    }
}
