use async_trait::async_trait;

use super::{
    resolver::Executable,
    result::ExecutionResult,
    runner::{Invocation, ProcessRunner},
    scoring::Execute,
};
use crate::str_interp::{self, InterpError};

/// Command-line templates for each kind of artifact, expanded with [`Executable::interp_vars`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplates {
    pub class_command: Vec<String>,
    pub archive_command: Vec<String>,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            class_command: vec!["java".into(), "#{className}".into()],
            archive_command: vec!["java".into(), "-jar".into(), "#{archivePath}".into()],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Invalid command template: {0}")]
    Interp(#[from] InterpError),

    #[error("Empty command template")]
    EmptyCommand,
}

/// Runs resolved Java artifacts through a [`ProcessRunner`].
#[derive(Debug, Clone, Default)]
pub struct JavaLauncher {
    runner: ProcessRunner,
    templates: CommandTemplates,
}

impl JavaLauncher {
    pub fn new(runner: ProcessRunner, templates: CommandTemplates) -> Self {
        Self { runner, templates }
    }

    pub fn invocation(&self, exe: &Executable) -> Result<Invocation, LaunchError> {
        let template = match exe {
            Executable::Class { .. } => &self.templates.class_command,
            Executable::Archive { .. } => &self.templates.archive_command,
        };
        let argv = str_interp::interp_all(template, &exe.interp_vars())?;
        Invocation::from_argv(argv, exe.workdir()).ok_or(LaunchError::EmptyCommand)
    }
}

#[async_trait]
impl Execute for JavaLauncher {
    async fn execute(&self, exe: &Executable, input: &str) -> ExecutionResult {
        match self.invocation(exe) {
            Ok(inv) => self.runner.run(&inv, input).await,
            Err(e) => ExecutionResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn default_invocations() {
        let launcher = JavaLauncher::default();

        let inv = launcher
            .invocation(&Executable::Class {
                class_name: "Main".into(),
                class_dir: PathBuf::from("/w/given/src"),
            })
            .unwrap();
        assert_eq!(inv.command_line(), "java Main");
        assert_eq!(inv.workdir, PathBuf::from("/w/given/src"));

        let inv = launcher
            .invocation(&Executable::Archive {
                path: PathBuf::from("/w/2/run/q2-dist.jar"),
            })
            .unwrap();
        assert_eq!(inv.program, "java");
        assert_eq!(inv.args, ["-jar", "/w/2/run/q2-dist.jar"]);
        assert_eq!(inv.workdir, PathBuf::from("/w/2/run"));
    }

    #[tokio::test]
    async fn bad_template_is_an_execution_failure() {
        let launcher = JavaLauncher::new(
            ProcessRunner::new(),
            CommandTemplates {
                class_command: vec!["java".into(), "#{archivePath}".into()],
                archive_command: vec![],
            },
        );
        let class = Executable::Class {
            class_name: "Main".into(),
            class_dir: ".".into(),
        };
        let res = launcher.execute(&class, "").await;
        assert_eq!(res.exit_code, -1);
        assert!(res.stderr.starts_with("Invalid command template"), "{}", res.stderr);

        let archive = Executable::Archive {
            path: "a.jar".into(),
        };
        let res = launcher.execute(&archive, "").await;
        assert_eq!(res.stderr, "Empty command template");
    }
}
