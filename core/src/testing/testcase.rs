use std::{fmt, path::Path};

use anyhow::Context as _;
use serde::Serialize;

use super::normalize::CompareRule;
use super::parser::{self, ParseDiagnostic, ParseMode};

/// One grading unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub name: String,
    /// `n` of a `--- TC<n> ---` marker. `None` for flat documents.
    pub case_id: Option<u32>,
    pub input: String,
    pub expected_output: String,
    pub remove_spaces: bool,
    pub case_sensitive: bool,
    pub mark: f64,
}

impl Default for TestCase {
    fn default() -> Self {
        Self {
            name: String::new(),
            case_id: None,
            input: String::new(),
            expected_output: String::new(),
            remove_spaces: false,
            case_sensitive: true,
            mark: 0.0,
        }
    }
}

impl TestCase {
    #[inline]
    pub fn compare_rule(&self) -> CompareRule {
        CompareRule {
            remove_spaces: self.remove_spaces,
            case_sensitive: self.case_sensitive,
        }
    }
}

/// Identifies a group (question). Flat suites have exactly one group, [`GroupId::Single`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupId {
    Single,
    Question(u32),
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GroupId::Single => write!(f, "Tests"),
            GroupId::Question(n) => write!(f, "Question {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestGroup {
    pub id: GroupId,
    pub cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            cases: Vec::new(),
        }
    }

    pub fn total_mark(&self) -> f64 {
        self.cases.iter().map(|t| t.mark).sum()
    }
}

/// All groups read from one grading directory, in report order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestSuite {
    pub groups: Vec<TestGroup>,
    #[serde(skip)]
    pub diagnostics: Vec<SourcedDiagnostic>,
}

/// A parse diagnostic plus the document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedDiagnostic {
    pub source: String,
    pub diagnostic: ParseDiagnostic,
}

impl fmt::Display for SourcedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.diagnostic)
    }
}

impl TestSuite {
    pub fn num_cases(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    /// Reads one grouped document (`=== Q<n> ===` / `--- TC<n> ---`).
    pub fn from_grouped_document(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fsutil::read_to_string(path).context("Failed to read test document")?;
        let doc = parser::parse(&text, ParseMode::Grouped);
        let source = path.to_string_lossy().into_owned();
        Ok(Self {
            groups: doc.groups,
            diagnostics: with_source(&source, doc.diagnostics),
        })
    }

    /// Reads a directory of flat documents, one case per file, sorted by file name.
    /// The case name is the file stem.
    pub fn from_flat_dir(
        dir: impl AsRef<Path>,
        filename_pattern: &glob::Pattern,
    ) -> anyhow::Result<Self> {
        let files = fsutil::list_files_matching(&dir, filename_pattern)
            .context("Failed to enumerate test documents")?;

        let mut group = TestGroup::new(GroupId::Single);
        let mut diagnostics = Vec::new();

        for file in files {
            let text = fsutil::read_to_string(&file).context("Failed to read test document")?;
            let doc = parser::parse(&text, ParseMode::Flat);
            let source = file.to_string_lossy().into_owned();
            diagnostics.extend(with_source(&source, doc.diagnostics));

            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(source);
            group.cases.extend(doc.groups.into_iter().flat_map(|g| g.cases).map(|mut t| {
                t.name = name.clone();
                t
            }));
        }

        Ok(Self {
            groups: vec![group],
            diagnostics,
        })
    }
}

fn with_source(source: &str, diagnostics: Vec<ParseDiagnostic>) -> Vec<SourcedDiagnostic> {
    diagnostics
        .into_iter()
        .map(|diagnostic| SourcedDiagnostic {
            source: source.to_owned(),
            diagnostic,
        })
        .collect()
}
