use std::{path::Path, process::Command, time::Duration};

use anyhow::{Context, Result};

use crate::{ext::CommandExt, stats::Configuration};

/// Replaced by the configuration label in command arguments.
pub const FEATURES_PLACEHOLDER: &str = "{features}";
/// Replaced by the input path in command arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Builds the interpreter with the default features and runs it on the input.
pub const DEFAULT_COMMAND: &[&str] = &["cargo", "run", "-q", "--features", FEATURES_PLACEHOLDER, "--", INPUT_PLACEHOLDER];

/// Runs the program under test once and returns its stdout.
pub trait Invoker {
  /// # Errors
  ///
  /// This will return an error if the program could not be started, exited
  /// with a non-zero status, or timed out.
  fn invoke(&self, configuration: &Configuration, input: &Path) -> Result<String>;
}

/// Spawns a process from a command template, e.g.
/// `cargo run -q --features {features} -- {input}`.
#[derive(Debug)]
pub struct CommandInvoker {
  program: String,
  args: Vec<String>,
  timeout: Option<Duration>,
}

impl CommandInvoker {
  pub fn new<I, S>(template: I, timeout: Option<Duration>) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut template = template.into_iter().map(Into::<String>::into);
    let program = template.next().context("empty command")?;

    Ok(Self {
      program,
      args: template.collect(),
      timeout,
    })
  }

  /// The command for one invocation, with placeholders substituted.
  fn command(&self, configuration: &Configuration, input: &Path) -> Command {
    let input = input.to_string_lossy();

    let mut command = Command::new(&self.program);
    command.args(self.args.iter().map(|arg| {
      arg
        .replace(FEATURES_PLACEHOLDER, configuration.label())
        .replace(INPUT_PLACEHOLDER, &input)
    }));

    command
  }
}

impl Invoker for CommandInvoker {
  fn invoke(&self, configuration: &Configuration, input: &Path) -> Result<String> {
    let mut command = self.command(configuration, input);
    let description = format!("{command:?}");

    match self.timeout {
      None => command.status_stdout().context(description),
      Some(timeout) => command
        .status_stdout_timeout(timeout)
        .with_context(|| description.clone())?
        .with_context(|| format!("{description} timed out after {timeout:?}")),
    }
  }
}
