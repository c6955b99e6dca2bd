use async_trait::async_trait;
use chrono::Local;

use super::{
    resolver::{Executable, Resolution, ResolutionError},
    result::{CaseResult, ExecutionResult, GroupResult, JudgeCode, SessionResult},
    testcase::{GroupId, TestCase, TestGroup, TestSuite},
};

/// Finds the artifact to run for a group.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, group: GroupId) -> Result<Resolution, ResolutionError>;
}

/// Runs an artifact once. Failures are reported inside [`ExecutionResult`], never as errors.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, exe: &Executable, input: &str) -> ExecutionResult;
}

/// Progress callbacks. Every method defaults to a no-op.
pub trait ScoreListener {
    fn group_started(
        &mut self,
        _group: &TestGroup,
        _resolution: Result<&Resolution, &ResolutionError>,
    ) {
    }
    fn case_started(&mut self, _case: &TestCase) {}
    fn case_finished(&mut self, _result: &CaseResult) {}
    fn group_finished(&mut self, _result: &GroupResult) {}
}

impl ScoreListener for () {}

/// Scores every group of `suite` in order, one case at a time.
///
/// The artifact is resolved once per group. If resolution fails, every case of the group
/// is reported as [`JudgeCode::SKIP`] with zero marks; its marks still count toward the totals.
pub async fn score<R, E, L>(
    suite: &TestSuite,
    resolver: &R,
    executor: &E,
    listener: &mut L,
) -> SessionResult
where
    R: Resolve + ?Sized,
    E: Execute + ?Sized,
    L: ScoreListener + ?Sized,
{
    let mut session = SessionResult::new(Local::now());
    for group in &suite.groups {
        let res = score_group(group, resolver, executor, listener).await;
        listener.group_finished(&res);
        session.push(res);
    }
    session
}

async fn score_group<R, E, L>(
    group: &TestGroup,
    resolver: &R,
    executor: &E,
    listener: &mut L,
) -> GroupResult
where
    R: Resolve + ?Sized,
    E: Execute + ?Sized,
    L: ScoreListener + ?Sized,
{
    let mut res = GroupResult::new(group.id);

    let resolution = resolver.resolve(group.id).await;
    listener.group_started(group, resolution.as_ref());

    let resolution = match resolution {
        Ok(r) => {
            log::info!(
                "{}: running '{}' ({})",
                group.id,
                r.executable.display_name(),
                r.strategy
            );
            res.artifact = Some(r.executable.display_name());
            r
        }
        Err(e) => {
            log::warn!("{}: {:#}", group.id, e);
            res.resolution_error = Some(e.to_string());
            for t in &group.cases {
                let skipped = CaseResult {
                    name: t.name.clone(),
                    judge: JudgeCode::SKIP,
                    earned: 0.0,
                    max_mark: t.mark,
                    execution: None,
                    testcase: t.clone(),
                };
                listener.case_finished(&skipped);
                res.push(skipped);
            }
            return res;
        }
    };

    for t in &group.cases {
        listener.case_started(t);
        let execution = executor.execute(&resolution.executable, &t.input).await;
        let case = judge(t, execution);
        listener.case_finished(&case);
        res.push(case);
    }
    res
}

/// All or nothing: the full mark on a match after normalization, otherwise zero.
pub fn judge(t: &TestCase, execution: ExecutionResult) -> CaseResult {
    let judge = JudgeCode::from_execution(&execution, || {
        t.compare_rule().matches(&execution.stdout, &t.expected_output)
    });
    CaseResult {
        name: t.name.clone(),
        judge,
        earned: if judge == JudgeCode::AC { t.mark } else { 0.0 },
        max_mark: t.mark,
        execution: Some(execution),
        testcase: t.clone(),
    }
}
