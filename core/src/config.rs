use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

use crate::serdable::{duration_secs, GlobPattern};
use crate::testing::{
    ArchiveResolver, ClassResolver, CommandTemplates, JavaLauncher, OutputFilter, ProcessRunner,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub run: RunConfig,
    pub flat: FlatConfig,
    pub grouped: GroupedConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    pub output_marker: String,
    pub build_success_marker: String,
    pub class_command: Vec<String>,
    pub archive_command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlatConfig {
    pub source_dir: PathBuf,
    pub testcase_dir: PathBuf,
    pub testcase_pattern: GlobPattern,
    pub class_names: Vec<String>,
    pub default_class: String,
    pub compile_before_run: bool,
    pub compile_command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupedConfig {
    pub document: PathBuf,
    pub archive_dir: PathBuf,
    pub archive_pattern: GlobPattern,
    pub preferred_marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub preview_width: usize,
    pub show_failure_detail: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let filter = OutputFilter::default();
        let templates = CommandTemplates::default();
        Self {
            timeout: ProcessRunner::DEFAULT_TIMEOUT,
            output_marker: filter.output_marker,
            build_success_marker: filter.build_success_marker,
            class_command: templates.class_command,
            archive_command: templates.archive_command,
        }
    }
}

impl Default for FlatConfig {
    fn default() -> Self {
        let r = ClassResolver::default();
        Self {
            source_dir: "given/src".into(),
            testcase_dir: "TestCases".into(),
            testcase_pattern: GlobPattern::parse("tc*.txt").unwrap(),
            class_names: r.class_names,
            default_class: r.default_class,
            compile_before_run: true,
            compile_command: vec!["javac".to_owned()],
        }
    }
}

impl Default for GroupedConfig {
    fn default() -> Self {
        let r = ArchiveResolver::default();
        Self {
            document: "tests.txt".into(),
            archive_dir: r.archive_dir,
            archive_pattern: r.pattern.into(),
            preferred_marker: r.preferred_marker,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_width: 80,
            show_failure_detail: true,
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "jgrade.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).unwrap();
        std::str::from_utf8(file.data.as_ref()).unwrap().to_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Reads the nearest config file, or returns the built-in defaults if there is none.
    pub fn from_file_finding_in_ancestors_or_default(
        cur_dir: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        match Self::find_file_in_ancestors(cur_dir) {
            Some(path) => {
                log::info!("Using config {}", path.to_string_lossy());
                Self::from_toml_file(path)
            }
            None => {
                log::debug!("No {} found; using defaults", Self::FILENAME);
                Ok(Self::default())
            }
        }
    }
}

impl RunConfig {
    pub fn output_filter(&self) -> OutputFilter {
        OutputFilter {
            output_marker: self.output_marker.clone(),
            build_success_marker: self.build_success_marker.clone(),
        }
    }

    pub fn process_runner(&self) -> ProcessRunner {
        ProcessRunner::new()
            .timeout(self.timeout)
            .output_filter(self.output_filter())
    }

    pub fn launcher(&self) -> JavaLauncher {
        JavaLauncher::new(
            self.process_runner(),
            CommandTemplates {
                class_command: self.class_command.clone(),
                archive_command: self.archive_command.clone(),
            },
        )
    }
}

impl FlatConfig {
    pub fn class_resolver(&self) -> ClassResolver {
        ClassResolver {
            class_names: self.class_names.clone(),
            default_class: self.default_class.clone(),
        }
    }
}

impl GroupedConfig {
    pub fn archive_resolver(&self) -> ArchiveResolver {
        ArchiveResolver {
            archive_dir: self.archive_dir.clone(),
            pattern: (*self.archive_pattern).clone(),
            preferred_marker: self.preferred_marker.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn example_toml_should_be_parsable() {
        let toml = Config::example_toml();
        let cfg = dbg!(Config::from_toml(&toml)).unwrap();
        assert_eq!(cfg, Config::default());

        let Config {
            source_config_file,
            run,
            flat,
            grouped,
            report,
        } = cfg;

        assert_eq!(source_config_file, None);
        assert_eq!(run.timeout, Duration::from_secs(10));
        assert_eq!(run.archive_command, ["java", "-jar", "#{archivePath}"]);
        assert_eq!(flat.source_dir, Path::new("given/src"));
        assert_eq!(flat.testcase_pattern, GlobPattern::parse("tc*.txt").unwrap());
        assert_eq!(flat.class_names, ["main", "Main", "MAIN"]);
        assert_eq!(grouped.document, Path::new("tests.txt"));
        assert_eq!(grouped.archive_dir, Path::new("run"));
        assert_eq!(report.preview_width, 80);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r##"
[run]
timeout_secs = 2.5
class_command = ["java", "-cp", "#{classDir}", "#{className}"]

[grouped]
preferred_marker = "release"
"##,
        )
        .unwrap();
        assert_eq!(cfg.run.timeout, Duration::from_millis(2500));
        assert_eq!(cfg.run.output_marker, "OUTPUT:");
        assert_eq!(cfg.grouped.preferred_marker, "release");
        assert_eq!(cfg.grouped.archive_pattern.as_str(), "*.jar");
        assert_eq!(cfg.flat, FlatConfig::default());

        assert_eq!(cfg.run.process_runner().get_timeout(), cfg.run.timeout);
        assert_eq!(cfg.grouped.archive_resolver().preferred_marker, "release");
    }

    #[test]
    fn unknown_key_ng() {
        assert!(Config::from_toml("[run]\ntimeout = 3\n").is_err());
        assert!(Config::from_toml("[flat]\ntestcase_pattern = \"[\"\n").is_err());
    }

    #[test]
    fn huge_timeout_ng() {
        assert!(Config::from_toml("[run]\ntimeout_secs = 1e30\n").is_err());
        assert!(Config::from_toml("[run]\ntimeout_secs = 86400\n").is_ok());
    }

    #[test]
    fn find_file_in_ancestors() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        fsutil::mkdir_all(&nested).unwrap();
        assert_eq!(Config::find_file_in_ancestors(&nested), None);
        let cfg = Config::from_file_finding_in_ancestors_or_default(&nested).unwrap();
        assert_eq!(cfg.source_config_file, None);

        fsutil::write(tmp.path().join(Config::FILENAME), "[report]\npreview_width = 20\n")
            .unwrap();
        let cfg = Config::from_file_finding_in_ancestors_or_default(&nested).unwrap();
        assert_eq!(cfg.report.preview_width, 20);
        assert_eq!(
            cfg.source_config_file,
            Some(tmp.path().join(Config::FILENAME))
        );
    }
}
