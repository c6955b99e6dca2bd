use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::testcase::{GroupId, TestCase};

/// Outcome of running the target program once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Effective stdout (after the output-extraction filter)
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(serialize_with = "serialize_millis")]
    pub execution_time: Duration,
}

impl ExecutionResult {
    pub const FAILURE_EXIT_CODE: i32 = -1;
    pub const TIMEOUT_STDERR: &str = "TIMEOUT";

    pub fn timeout(execution_time: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: Self::TIMEOUT_STDERR.to_owned(),
            exit_code: Self::FAILURE_EXIT_CODE,
            execution_time,
        }
    }

    /// Spawn or communication failure. `reason` becomes stderr.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.into(),
            exit_code: Self::FAILURE_EXIT_CODE,
            execution_time: Duration::ZERO,
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.exit_code == Self::FAILURE_EXIT_CODE && self.stderr == Self::TIMEOUT_STDERR
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, Serialize,
)]
pub enum JudgeCode {
    /// Output matched
    AC,
    /// Output did not match
    WA,
    TLE,
    /// Non-zero exit or spawn failure
    RE,
    /// Not run: no runnable artifact for the group
    SKIP,
}

impl JudgeCode {
    pub fn from_execution(res: &ExecutionResult, matched: impl FnOnce() -> bool) -> Self {
        if res.is_timeout() {
            JudgeCode::TLE
        } else if !res.is_success() {
            JudgeCode::RE
        } else if matched() {
            JudgeCode::AC
        } else {
            JudgeCode::WA
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub judge: JudgeCode,
    pub earned: f64,
    pub max_mark: f64,
    /// `None` when the case was never run.
    pub execution: Option<ExecutionResult>,
    #[serde(skip)]
    pub testcase: TestCase,
}

impl CaseResult {
    #[inline]
    pub fn passed(&self) -> bool {
        self.judge == JudgeCode::AC
    }

    /// Short reason for a non-AC verdict.
    pub fn failure_reason(&self) -> Option<String> {
        match self.judge {
            JudgeCode::AC | JudgeCode::WA => None,
            JudgeCode::TLE => Some(ExecutionResult::TIMEOUT_STDERR.to_owned()),
            JudgeCode::RE => self.execution.as_ref().map(|e| {
                let stderr = e.stderr.trim();
                if stderr.is_empty() {
                    format!("exit code {}", e.exit_code)
                } else {
                    stderr.to_owned()
                }
            }),
            JudgeCode::SKIP => Some("not run".to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub id: GroupId,
    /// Display name of the resolved artifact (e.g. `Main` or `app-dist.jar`)
    pub artifact: Option<String>,
    /// Set when no artifact could be resolved; every case is then [`JudgeCode::SKIP`].
    pub resolution_error: Option<String>,
    pub cases: Vec<CaseResult>,
    pub earned: f64,
    pub total: f64,
}

impl GroupResult {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            artifact: None,
            resolution_error: None,
            cases: Vec::new(),
            earned: 0.0,
            total: 0.0,
        }
    }

    pub fn push(&mut self, case: CaseResult) {
        self.earned += case.earned;
        self.total += case.max_mark;
        self.cases.push(case);
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.earned, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub graded_at: DateTime<Local>,
    pub groups: Vec<GroupResult>,
    pub earned: f64,
    pub total: f64,
}

impl SessionResult {
    pub fn new(graded_at: DateTime<Local>) -> Self {
        Self {
            graded_at,
            groups: Vec::new(),
            earned: 0.0,
            total: 0.0,
        }
    }

    pub fn push(&mut self, group: GroupResult) {
        self.earned += group.earned;
        self.total += group.total;
        self.groups.push(group);
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.earned, self.total)
    }

    pub fn band(&self) -> Band {
        Band::from_percentage(self.percentage())
    }

    pub fn cases(&self) -> impl Iterator<Item = &CaseResult> {
        self.groups.iter().flat_map(|g| g.cases.iter())
    }
}

/// `earned / total * 100`, or `0.0` when nothing can be earned.
pub fn percentage(earned: f64, total: f64) -> f64 {
    if total > 0.0 {
        earned / total * 100.0
    } else {
        0.0
    }
}

/// Qualitative grade of an overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize)]
pub enum Band {
    #[strum(serialize = "Excellent")]
    Excellent,
    #[strum(serialize = "Good")]
    Good,
    #[strum(serialize = "Average")]
    Average,
    #[strum(serialize = "Needs improvement")]
    NeedsImprovement,
}

impl Band {
    pub fn from_percentage(p: f64) -> Self {
        if p >= 90.0 {
            Band::Excellent
        } else if p >= 70.0 {
            Band::Good
        } else if p >= 50.0 {
            Band::Average
        } else {
            Band::NeedsImprovement
        }
    }
}
