//! Line scanner for test-case documents.
//!
//! A document is a sequence of labelled sections:
//!
//! ```text
//! INPUT:
//! <text>
//! OUTPUT:
//! <text>
//! REMOVE_SPACES:
//! YES|NO
//! CASE_SENSITIVE:
//! YES|NO
//! MARK:
//! <decimal>
//! ```
//!
//! A section body runs until the next label (or block marker / end of text) and is trimmed.
//! In [`ParseMode::Grouped`] the document is split by `=== Q<n> ===` group headers and
//! `--- TC<n> ---` case markers, and every block must carry all five sections.

use std::collections::HashMap;

use lazy_regex::{lazy_regex, Lazy, Regex};
use strum::IntoEnumIterator;

use super::testcase::{GroupId, TestCase, TestGroup};

static RE_GROUP_HEADER: Lazy<Regex> = lazy_regex!(r"^\s*===\s*Q(\d+)\s*===\s*$");
static RE_CASE_MARKER: Lazy<Regex> = lazy_regex!(r"^\s*---\s*TC(\d+)\s*---\s*$");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ParseMode {
    /// The whole text is one test case. Missing sections fall back to defaults.
    #[strum(serialize = "flat")]
    Flat,
    /// Groups of numbered cases. Incomplete blocks are dropped.
    #[strum(serialize = "grouped")]
    Grouped,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::IntoStaticStr,
)]
pub enum Section {
    #[strum(serialize = "INPUT")]
    Input,
    #[strum(serialize = "OUTPUT")]
    Output,
    #[strum(serialize = "REMOVE_SPACES")]
    RemoveSpaces,
    #[strum(serialize = "CASE_SENSITIVE")]
    CaseSensitive,
    #[strum(serialize = "MARK")]
    Mark,
}

impl Section {
    /// Recognizes a label at the start of `line` and returns the rest of the line after the colon.
    fn detect(line: &str) -> Option<(Self, &str)> {
        let line = line.trim_start();
        Section::iter().find_map(|s| {
            let name: &'static str = s.into();
            line.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(|rest| (s, rest))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// 1-based line number
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl std::fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.line, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("Duplicate section {0} (the first one is used)")]
    DuplicateSection(Section),

    #[error("Invalid {0} value '{1}' (expected YES or NO)")]
    InvalidFlag(Section, String),

    #[error("Invalid MARK value '{0}' (expected a non-negative number)")]
    InvalidMark(String),

    #[error("TC{case_id} is skipped: missing {}", join_sections(.missing))]
    IncompleteBlock { case_id: u32, missing: Vec<Section> },

    #[error("TC{case_id} is skipped: {reason}")]
    RejectedBlock { case_id: u32, reason: String },

    #[error("TC{0} appears before any '=== Q<n> ===' header and is skipped")]
    CaseOutsideGroup(u32),

    #[error("Duplicate header for Q{0}: its cases are skipped")]
    DuplicateGroup(u32),

    #[error("{1} in Q{0} appears before any '--- TC<n> ---' marker and is ignored")]
    SectionOutsideCase(u32, Section),
}

fn join_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(Section::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    /// Sorted by group id. Groups without any valid case are kept (empty).
    pub groups: Vec<TestGroup>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedDocument {
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.groups.iter().flat_map(|g| g.cases.iter())
    }
}

/// Parses `text` into test cases. Never fails: anomalies are reported as diagnostics.
pub fn parse(text: &str, mode: ParseMode) -> ParsedDocument {
    let mut scanner = Scanner::new(mode);
    for (i, line) in text.lines().enumerate() {
        scanner.feed(i + 1, line);
    }
    scanner.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Nothing,
    Section(Section),
    Discard,
}

#[derive(Debug)]
struct Block<'a> {
    case_id: Option<u32>,
    start_line: usize,
    open: Open,
    bodies: HashMap<Section, (usize, Vec<&'a str>)>,
}

impl<'a> Block<'a> {
    fn new(case_id: Option<u32>, start_line: usize) -> Self {
        Self {
            case_id,
            start_line,
            open: Open::Nothing,
            bodies: HashMap::new(),
        }
    }

    fn body(&self, s: Section) -> Option<(usize, String)> {
        self.bodies
            .get(&s)
            .map(|(line, lines)| (*line, lines.join("\n").trim().to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupState {
    /// Before the first header (grouped mode only)
    Outside,
    Inside(u32),
    /// Under a duplicated header
    Ignored,
}

struct Scanner<'a> {
    mode: ParseMode,
    group: GroupState,
    block: Option<Block<'a>>,
    groups: Vec<TestGroup>,
    diagnostics: Vec<ParseDiagnostic>,
    /// Stray sections of the current group already reported
    stray_reported: bool,
}

impl<'a> Scanner<'a> {
    fn new(mode: ParseMode) -> Self {
        let (group, block, groups) = match mode {
            ParseMode::Flat => (
                GroupState::Outside,
                Some(Block::new(None, 1)),
                vec![TestGroup::new(GroupId::Single)],
            ),
            ParseMode::Grouped => (GroupState::Outside, None, Vec::new()),
        };
        Self {
            mode,
            group,
            block,
            groups,
            diagnostics: Vec::new(),
            stray_reported: false,
        }
    }

    fn diag(&mut self, line: usize, kind: DiagnosticKind) {
        self.diagnostics.push(ParseDiagnostic { line, kind });
    }

    fn feed(&mut self, lineno: usize, line: &'a str) {
        if self.mode == ParseMode::Grouped {
            if let Some(n) = capture_number(&RE_GROUP_HEADER, line) {
                self.close_block();
                self.open_group(lineno, n);
                return;
            }
            if let Some(n) = capture_number(&RE_CASE_MARKER, line) {
                self.close_block();
                self.open_block(lineno, n);
                return;
            }
        }

        if self.block.is_none() {
            self.report_stray_section(lineno, line);
            return;
        }
        let Some(block) = self.block.as_mut() else {
            return
        };

        if let Some((section, rest)) = Section::detect(line) {
            if block.bodies.contains_key(&section) {
                block.open = Open::Discard;
                self.diag(lineno, DiagnosticKind::DuplicateSection(section));
                return;
            }
            let mut lines = Vec::new();
            if !rest.trim().is_empty() {
                lines.push(rest);
            }
            block.bodies.insert(section, (lineno, lines));
            block.open = Open::Section(section);
            return;
        }

        if let Open::Section(s) = block.open {
            if let Some((_, lines)) = block.bodies.get_mut(&s) {
                lines.push(line);
            }
        }
    }

    fn report_stray_section(&mut self, lineno: usize, line: &str) {
        let GroupState::Inside(n) = self.group else {
            return
        };
        if self.stray_reported {
            return;
        }
        if let Some((section, _)) = Section::detect(line) {
            self.stray_reported = true;
            self.diag(lineno, DiagnosticKind::SectionOutsideCase(n, section));
        }
    }

    fn open_group(&mut self, lineno: usize, n: u32) {
        self.stray_reported = false;
        if self.groups.iter().any(|g| g.id == GroupId::Question(n)) {
            self.diag(lineno, DiagnosticKind::DuplicateGroup(n));
            self.group = GroupState::Ignored;
            return;
        }
        self.groups.push(TestGroup::new(GroupId::Question(n)));
        self.group = GroupState::Inside(n);
    }

    fn open_block(&mut self, lineno: usize, case_id: u32) {
        match self.group {
            GroupState::Inside(_) => self.block = Some(Block::new(Some(case_id), lineno)),
            GroupState::Outside => {
                self.diag(lineno, DiagnosticKind::CaseOutsideGroup(case_id));
                self.block = None;
            }
            GroupState::Ignored => self.block = None,
        }
    }

    fn close_block(&mut self) {
        let Some(block) = self.block.take() else {
            return
        };
        let Some(case) = self.build_case(&block) else {
            return
        };
        let target = match self.group {
            GroupState::Inside(n) => GroupId::Question(n),
            _ => GroupId::Single,
        };
        if let Some(g) = self.groups.iter_mut().find(|g| g.id == target) {
            g.cases.push(case);
        }
    }

    fn build_case(&mut self, block: &Block) -> Option<TestCase> {
        let strict = self.mode == ParseMode::Grouped;

        if strict {
            let missing: Vec<_> = Section::iter()
                .filter(|s| !block.bodies.contains_key(s))
                .collect();
            if !missing.is_empty() {
                self.diag(
                    block.start_line,
                    DiagnosticKind::IncompleteBlock {
                        case_id: block.case_id.unwrap_or_default(),
                        missing,
                    },
                );
                return None;
            }
        }

        let mut case = TestCase {
            name: block
                .case_id
                .map(|n| format!("TC{}", n))
                .unwrap_or_default(),
            case_id: block.case_id,
            ..Default::default()
        };
        let mut rejected = None;

        if let Some((_, body)) = block.body(Section::Input) {
            case.input = body;
        }
        if let Some((_, body)) = block.body(Section::Output) {
            case.expected_output = body;
        }
        for (section, slot) in [
            (Section::RemoveSpaces, &mut case.remove_spaces),
            (Section::CaseSensitive, &mut case.case_sensitive),
        ] {
            let Some((line, body)) = block.body(section) else {
                continue
            };
            match parse_flag(&body) {
                Some(v) => *slot = v,
                None => {
                    let kind = DiagnosticKind::InvalidFlag(section, body);
                    rejected.get_or_insert_with(|| kind.to_string());
                    self.diag(line, kind);
                }
            }
        }
        if let Some((line, body)) = block.body(Section::Mark) {
            match parse_mark(&body) {
                Some(v) => case.mark = v,
                None => {
                    let kind = DiagnosticKind::InvalidMark(body);
                    rejected.get_or_insert_with(|| kind.to_string());
                    self.diag(line, kind);
                }
            }
        }

        match rejected {
            Some(reason) if strict => {
                self.diag(
                    block.start_line,
                    DiagnosticKind::RejectedBlock {
                        case_id: block.case_id.unwrap_or_default(),
                        reason,
                    },
                );
                None
            }
            _ => Some(case),
        }
    }

    fn finish(mut self) -> ParsedDocument {
        self.close_block();
        self.groups.sort_by_key(|g| g.id);
        ParsedDocument {
            groups: self.groups,
            diagnostics: self.diagnostics,
        }
    }
}

fn capture_number(re: &Regex, line: &str) -> Option<u32> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_flag(body: &str) -> Option<bool> {
    let token = body.split_whitespace().next()?;
    if token.eq_ignore_ascii_case("YES") {
        Some(true)
    } else if token.eq_ignore_ascii_case("NO") {
        Some(false)
    } else {
        None
    }
}

fn parse_mark(body: &str) -> Option<f64> {
    let token = body.split_whitespace().next()?;
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
