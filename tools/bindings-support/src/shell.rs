//! Shell command sequences
//!
//! A [`ShellCommands`] is a small script: a list of `cd`, program and `echo`
//! steps run one after the other. Execution goes through a [`CommandRunner`],
//! so the git maintenance scripts can be inspected or recorded without
//! touching a real checkout.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use xshell::Shell;

use crate::error::{BindingsError, BindingsResult};

/// One step of a [`ShellCommands`] script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellStep {
    /// Change the working directory of the following steps
    ChangeDir(PathBuf),
    /// Run a program and wait for it
    Run { program: String, args: Vec<String> },
    /// Print an advisory message; never fails
    Echo(String),
}

impl fmt::Display for ShellStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellStep::ChangeDir(dir) => write!(f, "cd {}", quote(&dir.to_string_lossy())),
            ShellStep::Run { program, args } => {
                write!(f, "{}", quote(program))?;
                for arg in args {
                    write!(f, " {}", quote(arg))?;
                }
                Ok(())
            }
            ShellStep::Echo(message) => write!(f, "echo \"{}\"", escape_double_quoted(message)),
        }
    }
}

/// Characters that keep their meaning inside double quotes
const DOUBLE_QUOTE_SPECIALS: [char; 4] = ['\\', '"', '$', '`'];

fn escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if DOUBLE_QUOTE_SPECIALS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.chars().any(|c| {
            c.is_whitespace() || DOUBLE_QUOTE_SPECIALS.contains(&c) || "'&|;<>()*?!#~".contains(c)
        });
    if needs_quotes {
        format!("\"{}\"", escape_double_quoted(s))
    } else {
        s.to_string()
    }
}

/// A sequence of shell steps plus its failure policy.
///
/// With `abort_on_error` (the default) the first failing command stops the
/// sequence with [`BindingsError::Process`]. Without it every command runs,
/// failures are logged, and the caller gets them back in the [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommands {
    steps: Vec<ShellStep>,
    abort_on_error: bool,
}

impl Default for ShellCommands {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            abort_on_error: true,
        }
    }
}

impl ShellCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep going when a command fails.
    pub fn continue_on_error(mut self) -> Self {
        self.abort_on_error = false;
        self
    }

    pub fn cd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.steps.push(ShellStep::ChangeDir(dir.into()));
        self
    }

    pub fn run<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.push(ShellStep::Run {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn git<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run("git", args)
    }

    pub fn echo(mut self, message: impl Into<String>) -> Self {
        self.steps.push(ShellStep::Echo(message.into()));
        self
    }

    pub fn abort_on_error(&self) -> bool {
        self.abort_on_error
    }

    pub fn steps(&self) -> &[ShellStep] {
        &self.steps
    }

    /// Only the program invocations, rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| matches!(s, ShellStep::Run { .. }))
            .map(ToString::to_string)
            .collect()
    }

    /// The whole sequence as a shell script, one step per line.
    pub fn script(&self) -> String {
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run every step in order through `runner`.
    pub fn execute(&self, runner: &mut dyn CommandRunner) -> BindingsResult<RunReport> {
        let mut cwd: Option<PathBuf> = None;
        let mut report = RunReport::default();

        for step in &self.steps {
            match step {
                ShellStep::ChangeDir(dir) => {
                    let next = match &cwd {
                        Some(current) => current.join(dir),
                        None => dir.clone(),
                    };
                    debug!("cd {}", next.display());
                    cwd = Some(next);
                }
                ShellStep::Echo(message) => runner.echo(message),
                ShellStep::Run { program, args } => {
                    let line = step.to_string();
                    info!("$ {}", line);
                    let status = match runner.run(cwd.as_deref(), program, args) {
                        Ok(status) => status,
                        Err(e) if !self.abort_on_error => {
                            warn!("{}: {}", line, e);
                            CommandStatus::not_started()
                        }
                        Err(e) => return Err(e),
                    };
                    report.outcomes.push(CommandOutcome {
                        command: line.clone(),
                        status,
                    });
                    if !status.is_success() {
                        if self.abort_on_error {
                            return Err(BindingsError::process(line, status.code()));
                        }
                        warn!("ignoring failure of `{}` ({:?})", line, status.code());
                    }
                }
            }
        }
        Ok(report)
    }
}

impl fmt::Display for ShellCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script())
    }
}

/// Exit status of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success() -> Self {
        Self::from_code(0)
    }

    /// The command could not be spawned, or was killed by a signal.
    pub fn not_started() -> Self {
        Self { code: None }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// What happened to one command of a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    pub status: CommandStatus,
}

/// Per-command results of [`ShellCommands::execute`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    outcomes: Vec<CommandOutcome>,
}

impl RunReport {
    pub fn outcomes(&self) -> &[CommandOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &CommandOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Executes single commands on behalf of [`ShellCommands`]
pub trait CommandRunner {
    /// Run `program` with `args` in `cwd` (or the current directory) and wait for it.
    fn run(
        &mut self,
        cwd: Option<&Path>,
        program: &str,
        args: &[String],
    ) -> BindingsResult<CommandStatus>;

    fn echo(&mut self, message: &str) {
        info!("{}", message);
    }
}

/// Runs commands for real, inheriting stdout/stderr.
pub struct XshellRunner {
    shell: Shell,
}

impl XshellRunner {
    pub fn new() -> BindingsResult<Self> {
        Ok(Self {
            shell: Shell::new()?,
        })
    }
}

impl CommandRunner for XshellRunner {
    fn run(
        &mut self,
        cwd: Option<&Path>,
        program: &str,
        args: &[String],
    ) -> BindingsResult<CommandStatus> {
        let program_path = which::which(program).map_err(|source| BindingsError::ToolNotFound {
            tool: program.to_string(),
            source,
        })?;
        let _dir = cwd.map(|dir| self.shell.push_dir(dir));
        let mut command: std::process::Command =
            self.shell.cmd(&program_path).args(args).into();
        let status = command
            .status()
            .map_err(|source| BindingsError::Spawn {
                program: program.to_string(),
                source,
            })?;
        Ok(status.into())
    }

    fn echo(&mut self, message: &str) {
        println!("{}", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every command; commands whose line contains a `fail_on`
    /// pattern exit with status 1, those matching `unstartable` never start.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: Vec<(Option<PathBuf>, String)>,
        pub echoed: Vec<String>,
        pub fail_on: Vec<String>,
        pub unstartable: Vec<String>,
    }

    impl RecordingRunner {
        pub fn failing_on(pattern: &str) -> Self {
            Self {
                fail_on: vec![pattern.to_string()],
                ..Self::default()
            }
        }

        pub fn unable_to_start(pattern: &str) -> Self {
            Self {
                unstartable: vec![pattern.to_string()],
                ..Self::default()
            }
        }

        pub fn lines(&self) -> Vec<&str> {
            self.calls.iter().map(|(_, l)| l.as_str()).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(
            &mut self,
            cwd: Option<&Path>,
            program: &str,
            args: &[String],
        ) -> BindingsResult<CommandStatus> {
            let line = std::iter::once(program.to_string())
                .chain(args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ");
            let failed = self.fail_on.iter().any(|p| line.contains(p.as_str()));
            let unstartable = self.unstartable.iter().any(|p| line.contains(p.as_str()));
            self.calls.push((cwd.map(Path::to_path_buf), line));
            if unstartable {
                return Err(BindingsError::Spawn {
                    program: program.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
                });
            }
            Ok(if failed {
                CommandStatus::from_code(1)
            } else {
                CommandStatus::success()
            })
        }

        fn echo(&mut self, message: &str) {
            self.echoed.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ShellCommands {
        ShellCommands::new()
            .cd("/ext/implot/implot")
            .git(["remote", "rm", "origin"])
            .git(["remote", "rm", "official"])
            .git(["status"])
    }

    #[test]
    fn script_renders_one_line_per_step() {
        let cmds = sample().echo("done");
        assert_eq!(
            cmds.script(),
            "cd /ext/implot/implot\ngit remote rm origin\ngit remote rm official\ngit status\necho \"done\""
        );
    }

    #[test]
    fn quoting_of_whitespace_arguments() {
        let cmds = ShellCommands::new().cd("/my libs/x").run("git", ["commit", "-m", "a b"]);
        assert_eq!(cmds.script(), "cd \"/my libs/x\"\ngit commit -m \"a b\"");
    }

    #[test]
    fn echo_and_arguments_are_escaped() {
        let cmds = ShellCommands::new()
            .run("git", ["commit", "-m", "say \"hi\" to $USER"])
            .echo("use `git push --force` on \"pthom\" ($HOME)");
        assert_eq!(
            cmds.script(),
            "git commit -m \"say \\\"hi\\\" to \\$USER\"\n\
             echo \"use \\`git push --force\\` on \\\"pthom\\\" (\\$HOME)\""
        );
        assert_eq!(quote("a;b"), "\"a;b\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("pthom/imgui_bundle"), "pthom/imgui_bundle");
    }

    #[test]
    fn abort_on_error_is_default() {
        assert!(ShellCommands::new().abort_on_error());
        assert!(!ShellCommands::new().continue_on_error().abort_on_error());
    }

    #[test]
    fn commands_run_in_changed_directory() {
        let mut runner = RecordingRunner::default();
        let report = sample().execute(&mut runner).unwrap();
        assert!(report.all_succeeded());
        assert_eq!(report.outcomes().len(), 3);
        for (cwd, _) in &runner.calls {
            assert_eq!(cwd.as_deref(), Some(Path::new("/ext/implot/implot")));
        }
    }

    #[test]
    fn abort_stops_at_first_failure() {
        let mut runner = RecordingRunner::failing_on("rm origin");
        let err = sample().execute(&mut runner).unwrap_err();
        assert!(err.is_process());
        assert_eq!(runner.lines(), vec!["git remote rm origin"]);
    }

    #[test]
    fn continue_on_error_runs_everything_and_reports_failures() {
        let mut runner = RecordingRunner::failing_on("rm origin");
        let report = sample()
            .continue_on_error()
            .execute(&mut runner)
            .unwrap();
        assert_eq!(runner.calls.len(), 3);
        assert!(!report.all_succeeded());
        let failed: Vec<_> = report.failures().map(|o| o.command.as_str()).collect();
        assert_eq!(failed, vec!["git remote rm origin"]);
        assert_eq!(report.outcomes()[0].status.code(), Some(1));
    }

    #[test]
    fn unstartable_command_is_recorded_and_skipped_when_continuing() {
        let mut runner = RecordingRunner::unable_to_start("rm official");
        let report = sample()
            .continue_on_error()
            .execute(&mut runner)
            .unwrap();
        assert_eq!(
            runner.lines(),
            vec!["git remote rm origin", "git remote rm official", "git status"]
        );
        assert_eq!(report.outcomes().len(), 3);
        assert_eq!(report.outcomes()[1].status, CommandStatus::not_started());
        let failed: Vec<_> = report.failures().map(|o| o.command.as_str()).collect();
        assert_eq!(failed, vec!["git remote rm official"]);
    }

    #[test]
    fn unstartable_command_aborts_the_sequence() {
        let mut runner = RecordingRunner::unable_to_start("rm origin");
        let err = sample().execute(&mut runner).unwrap_err();
        assert!(err.is_process());
        assert!(matches!(err, BindingsError::Spawn { .. }));
        assert_eq!(runner.lines(), vec!["git remote rm origin"]);
    }

    #[test]
    fn echo_goes_to_runner_not_to_processes() {
        let mut runner = RecordingRunner::default();
        let report = ShellCommands::new()
            .echo("please force push")
            .execute(&mut runner)
            .unwrap();
        assert!(report.outcomes().is_empty());
        assert_eq!(runner.echoed, vec!["please force push"]);
    }

    #[test]
    fn relative_cd_stacks() {
        let mut runner = RecordingRunner::default();
        ShellCommands::new()
            .cd("/ext")
            .cd("imgui")
            .git(["status"])
            .execute(&mut runner)
            .unwrap();
        assert_eq!(runner.calls[0].0.as_deref(), Some(Path::new("/ext/imgui")));
    }
}
