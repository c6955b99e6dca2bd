use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
};

use lazy_regex::{lazy_regex, Lazy, Regex};

static RE_MAIN_METHOD: Lazy<Regex> = lazy_regex!(
    r"\b(?:public\s+static|static\s+public)\s+(?:final\s+)?void\s+main\s*\(\s*(?:final\s+)?String\b"
);

/// Which rule located the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize)]
pub enum ResolutionStrategy {
    /// A compiled class with one of the conventional names
    #[strum(serialize = "named class")]
    NamedArtifact,
    /// A source file declaring `public static void main(String...)`
    #[strum(serialize = "scanned source")]
    ScannedSource,
    /// Nothing found; the default class name is tried and fails at run time if absent
    #[strum(serialize = "default name")]
    DefaultName,
    /// A packaged archive
    #[strum(serialize = "archive")]
    ArchiveDiscovery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executable {
    Class { class_name: String, class_dir: PathBuf },
    Archive { path: PathBuf },
}

impl Executable {
    /// Working directory of the spawned program.
    pub fn workdir(&self) -> &Path {
        match self {
            Executable::Class { class_dir, .. } => class_dir,
            Executable::Archive { path } => path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new(".")),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Executable::Class { class_name, .. } => class_name.clone(),
            Executable::Archive { path } => path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        }
    }

    /// Variables available to command templates.
    pub fn interp_vars(&self) -> HashMap<&'static str, &OsStr> {
        let mut m: HashMap<_, &OsStr> = HashMap::new();
        match self {
            Executable::Class {
                class_name,
                class_dir,
            } => {
                m.insert("className", class_name.as_ref());
                m.insert("classDir", class_dir.as_os_str());
            }
            Executable::Archive { path } => {
                m.insert("archivePath", path.as_os_str());
                m.insert(
                    "archiveName",
                    path.file_name().unwrap_or(OsStr::new("UNDEFINED_ARCHIVE_NAME")),
                );
                m.insert("archiveDir", self.workdir().as_os_str());
            }
        }
        m
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub executable: Executable,
    pub strategy: ResolutionStrategy,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Directory not found: '{0}'")]
    MissingDir(PathBuf),

    #[error("No archive matching '{pattern}' in '{dir}'")]
    NoArchive { dir: PathBuf, pattern: glob::Pattern },

    #[error("No Java source file in '{0}'")]
    NoSource(PathBuf),

    #[error("Compile error:\n{0}")]
    Compile(String),

    #[error(transparent)]
    Fs(#[from] fsutil::Error),
}

/// Locates the class to run in a directory of sources and compiled classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassResolver {
    /// Tried in order as `<name>.class`
    pub class_names: Vec<String>,
    pub default_class: String,
}

impl Default for ClassResolver {
    fn default() -> Self {
        Self {
            class_names: vec!["main".to_owned(), "Main".to_owned(), "MAIN".to_owned()],
            default_class: "main".to_owned(),
        }
    }
}

impl ClassResolver {
    pub fn resolve(&self, dir: impl AsRef<Path>) -> Result<Resolution, ResolutionError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ResolutionError::MissingDir(dir.to_owned()));
        }
        let resolved = |class_name: String, strategy| Resolution {
            executable: Executable::Class {
                class_name,
                class_dir: dir.to_owned(),
            },
            strategy,
        };

        if let Some(name) = self
            .class_names
            .iter()
            .find(|name| dir.join(format!("{}.class", name)).is_file())
        {
            return Ok(resolved(name.clone(), ResolutionStrategy::NamedArtifact));
        }

        if let Some(name) = Self::scan_sources_for_main(dir)? {
            return Ok(resolved(name, ResolutionStrategy::ScannedSource));
        }

        log::warn!(
            "No entry point found in {}; falling back to class '{}'",
            dir.to_string_lossy(),
            self.default_class
        );
        Ok(resolved(
            self.default_class.clone(),
            ResolutionStrategy::DefaultName,
        ))
    }

    /// Returns the stem of the first `*.java` file (in name order) declaring a main method.
    fn scan_sources_for_main(dir: &Path) -> Result<Option<String>, ResolutionError> {
        for file in java_sources(dir)? {
            let Ok(src) = fsutil::read_to_string(&file) else {
                continue
            };
            if RE_MAIN_METHOD.is_match(&src) {
                return Ok(file.file_stem().map(|s| s.to_string_lossy().into_owned()));
            }
        }
        Ok(None)
    }
}

pub fn java_sources(dir: impl AsRef<Path>) -> fsutil::Result<Vec<PathBuf>> {
    static PATTERN: Lazy<glob::Pattern> = Lazy::new(|| glob::Pattern::new("*.java").unwrap());
    fsutil::list_files_matching(dir, &PATTERN)
}

/// Locates a packaged archive in `<group dir>/<archive_dir>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResolver {
    pub archive_dir: PathBuf,
    pub pattern: glob::Pattern,
    /// Archives whose lowercased name contains this are preferred.
    pub preferred_marker: String,
}

impl Default for ArchiveResolver {
    fn default() -> Self {
        Self {
            archive_dir: "run".into(),
            pattern: glob::Pattern::new("*.jar").unwrap(),
            preferred_marker: "dist".to_owned(),
        }
    }
}

impl ArchiveResolver {
    pub fn resolve(&self, group_dir: impl AsRef<Path>) -> Result<Resolution, ResolutionError> {
        let dir = group_dir.as_ref().join(&self.archive_dir);
        if !dir.is_dir() {
            return Err(ResolutionError::MissingDir(dir));
        }
        let archives = fsutil::list_files_matching(&dir, &self.pattern)?;

        let marker = self.preferred_marker.to_lowercase();
        let preferred = archives.iter().find(|path| {
            !marker.is_empty()
                && path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_lowercase().contains(&marker))
                    .unwrap_or(false)
        });

        let Some(path) = preferred.or_else(|| archives.first()) else {
            return Err(ResolutionError::NoArchive {
                dir,
                pattern: self.pattern.clone(),
            })
        };
        Ok(Resolution {
            executable: Executable::Archive {
                path: path.to_owned(),
            },
            strategy: ResolutionStrategy::ArchiveDiscovery,
        })
    }
}
