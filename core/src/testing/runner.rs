use std::{
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::Context as _;
use tokio::{io::AsyncWriteExt as _, process::Command};

use super::result::ExecutionResult;

/// A fully expanded command line plus the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl Invocation {
    /// `argv[0]` is the program. Returns `None` for an empty argv.
    pub fn from_argv(argv: Vec<String>, workdir: impl Into<PathBuf>) -> Option<Self> {
        let mut it = argv.into_iter();
        let program = it.next()?;
        Some(Self {
            program,
            args: it.collect(),
            workdir: workdir.into(),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Markers used to cut the program's real answer out of captured stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFilter {
    pub output_marker: String,
    pub build_success_marker: String,
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self {
            output_marker: "OUTPUT:".to_owned(),
            build_success_marker: "BUILD SUCCESSFUL".to_owned(),
        }
    }
}

impl OutputFilter {
    /// If `stdout` contains the output marker, keeps only the text after its last occurrence,
    /// cut before the first build-success marker, trimmed. Otherwise returns `stdout` unchanged.
    ///
    /// This is lossy: anything the program prints before the marker is dropped.
    pub fn extract<'s>(&self, stdout: &'s str) -> &'s str {
        if self.output_marker.is_empty() {
            return stdout;
        }
        let Some(pos) = stdout.rfind(&self.output_marker) else {
            return stdout
        };
        let mut part = &stdout[pos + self.output_marker.len()..];
        if !self.build_success_marker.is_empty() {
            if let Some(end) = part.find(&self.build_success_marker) {
                part = &part[..end];
            }
        }
        part.trim()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    filter: OutputFilter,
}

impl ProcessRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            filter: OutputFilter::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output_filter(mut self, filter: OutputFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `inv` with `input` on stdin. Never fails: spawn errors, non-zero exits and
    /// timeouts are all reported inside the returned [`ExecutionResult`].
    pub async fn run(&self, inv: &Invocation, input: &str) -> ExecutionResult {
        match self.try_run(inv, input).await {
            Ok(res) => res,
            Err(e) => {
                log::debug!("{:#}", e);
                ExecutionResult::failure(format!("{:#}", e))
            }
        }
    }

    async fn try_run(&self, inv: &Invocation, input: &str) -> anyhow::Result<ExecutionResult> {
        log::debug!(
            "Running '{}' in {}",
            inv.command_line(),
            inv.workdir.to_string_lossy()
        );

        let mut proc = Command::new(&inv.program)
            .args(&inv.args)
            .current_dir(&inv.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", inv.command_line()))?;

        let mut stdin = proc.stdin.take().context("Failed to open stdin")?;
        let mut stdout = proc.stdout.take().context("Failed to open stdout")?;
        let mut stderr = proc.stderr.take().context("Failed to open stderr")?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let (res, execution_time) = {
            let input = input.as_bytes();
            let fut_stdin = async move {
                let res = stdin.write_all(input).await;
                drop(stdin); // closes the pipe so the program sees EOF
                match res {
                    // the program exited without reading all of its input
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    res => res,
                }
            };
            let fut_stdout = tokio::io::copy(&mut stdout, &mut stdout_buf);
            let fut_stderr = tokio::io::copy(&mut stderr, &mut stderr_buf);
            let fut_exit_status = proc.wait();

            let start_at = tokio::time::Instant::now();

            let res = tokio::time::timeout(self.timeout, async {
                tokio::try_join!(fut_stdin, fut_stdout, fut_stderr, fut_exit_status)
                    .context("Failed to communicate with subprocess")
            })
            .await;
            (res, start_at.elapsed())
        };

        match res {
            Err(_) => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill timed out process: {:#}", e));
                Ok(ExecutionResult::timeout(execution_time))
            }

            Ok(Err(e)) => Err(e),

            Ok(Ok((_, _, _, exit_status))) => {
                let stdout = String::from_utf8_lossy(&stdout_buf);
                Ok(ExecutionResult {
                    stdout: self.filter.extract(&stdout).to_owned(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                    exit_code: exit_code_of(exit_status),
                    execution_time,
                })
            }
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt as _;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(ExecutionResult::FAILURE_EXIT_CODE)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(ExecutionResult::FAILURE_EXIT_CODE)
}

/// Runs a one-shot command (e.g. a compiler) and returns its stderr on failure.
pub async fn run_to_completion(inv: &Invocation, timeout: Duration) -> Result<(), String> {
    let res = ProcessRunner::new()
        .timeout(timeout)
        .output_filter(OutputFilter {
            output_marker: String::new(),
            build_success_marker: String::new(),
        })
        .run(inv, "")
        .await;
    if res.is_success() {
        return Ok(());
    }
    let stderr = res.stderr.trim();
    Err(if stderr.is_empty() {
        format!("'{}' exited with code {}", inv.command_line(), res.exit_code)
    } else {
        stderr.to_owned()
    })
}

#[cfg(test)]
pub(crate) fn sh(script: &str, workdir: impl AsRef<std::path::Path>) -> Invocation {
    Invocation {
        program: "/bin/sh".to_owned(),
        args: vec!["-c".to_owned(), script.to_owned()],
        workdir: workdir.as_ref().to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct X {
        input: &'static str,
        script: &'static str,
        want_stdout: &'static str,
        want_stderr: &'static str,
        want_exit_code: i32,
    }

    async fn run_test(x: X) {
        let r = ProcessRunner::new().timeout(Duration::from_millis(1500));
        let res = dbg!(r.run(&sh(x.script, "."), x.input).await);
        assert_eq!(res.stdout, x.want_stdout);
        assert_eq!(res.stderr, x.want_stderr);
        assert_eq!(res.exit_code, x.want_exit_code);
    }

    #[tokio::test]
    async fn should_echo_stdin() {
        run_test(X {
            input: "hello\n",
            script: "cat",
            want_stdout: "hello\n",
            want_stderr: "",
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_succeed_even_if_stdin_is_not_read() {
        run_test(X {
            input: "123\n",
            script: "echo ok",
            want_stdout: "ok\n",
            want_stderr: "",
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_capture_stderr_and_exit_code() {
        run_test(X {
            input: "",
            script: "echo partial; echo boom >&2; exit 42",
            want_stdout: "partial\n",
            want_stderr: "boom\n",
            want_exit_code: 42,
        })
        .await;
    }

    #[tokio::test]
    async fn should_extract_between_marker_and_banner() {
        run_test(X {
            input: "",
            script: "echo 'ant -f build.xml run'; echo 'OUTPUT:'; echo ' 42 '; \
                     echo 'BUILD SUCCESSFUL (total time: 0 seconds)'",
            want_stdout: "42",
            want_stderr: "",
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_timeout() {
        let r = ProcessRunner::new().timeout(Duration::from_millis(300));
        let res = r.run(&sh("sleep 5", "."), "").await;
        assert!(res.is_timeout());
        assert_eq!(res.exit_code, -1);
        assert_eq!(res.stderr, "TIMEOUT");
        assert!(res.execution_time < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_not_raised() {
        let inv = Invocation::from_argv(vec!["/nonexistent/jgrade-java".to_owned()], ".").unwrap();
        let res = ProcessRunner::new().run(&inv, "input").await;
        assert_eq!(res.exit_code, -1);
        assert!(!res.is_timeout());
        assert!(res.stderr.contains("Failed to spawn"), "{}", res.stderr);
    }

    #[tokio::test]
    async fn should_run_in_workdir() {
        let tmp = tempfile::tempdir().unwrap();
        fsutil::write(tmp.path().join("marker.txt"), "here").unwrap();
        let res = ProcessRunner::new().run(&sh("cat marker.txt", tmp.path()), "").await;
        assert_eq!(res.stdout, "here");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn killed_by_signal() {
        let res = ProcessRunner::new().run(&sh("kill -9 $$", "."), "").await;
        assert_eq!(res.exit_code, 128 + 9);
    }

    #[tokio::test]
    async fn run_to_completion_reports_stderr() {
        let limit = Duration::from_secs(2);
        assert_eq!(run_to_completion(&sh("true", "."), limit).await, Ok(()));
        assert_eq!(
            run_to_completion(&sh("echo 'Main.java:3: error' >&2; exit 1", "."), limit).await,
            Err("Main.java:3: error".to_owned())
        );
        assert_eq!(
            run_to_completion(&sh("exit 2", "."), limit).await,
            Err("'/bin/sh -c exit 2' exited with code 2".to_owned())
        );
    }

    #[test]
    fn extract_uses_last_marker() {
        let f = OutputFilter::default();
        assert_eq!(
            f.extract("INPUT: 3\nOUTPUT: stale\nOUTPUT:\n  9 \nBUILD SUCCESSFUL\nOUTPUT"),
            "9"
        );
        assert_eq!(f.extract("banner\nOUTPUT:\nabc\n"), "abc");
        assert_eq!(f.extract("OUTPUT:x BUILD SUCCESSFUL y BUILD SUCCESSFUL"), "x");
    }

    #[test]
    fn extract_without_marker_is_identity() {
        let f = OutputFilter::default();
        assert_eq!(f.extract("  raw\noutput\n"), "  raw\noutput\n");
        assert_eq!(f.extract("BUILD SUCCESSFUL\n"), "BUILD SUCCESSFUL\n");
        assert_eq!(
            OutputFilter {
                output_marker: String::new(),
                build_success_marker: String::new()
            }
            .extract("OUTPUT: x"),
            "OUTPUT: x"
        );
    }

    #[test]
    fn invocation_from_argv() {
        assert_eq!(Invocation::from_argv(vec![], "."), None);
        let inv = Invocation::from_argv(
            vec!["java".into(), "-jar".into(), "a.jar".into()],
            "/tmp",
        )
        .unwrap();
        assert_eq!(inv.program, "java");
        assert_eq!(inv.args, ["-jar", "a.jar"]);
        assert_eq!(inv.command_line(), "java -jar a.jar");
    }
}
