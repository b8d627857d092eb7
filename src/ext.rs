#[cfg(unix)]
use std::os::unix::process::CommandExt as UnixCommandExt;
use std::{
  io::Read,
  process::{Child, Command, ExitStatus, Stdio},
  thread,
  time::Duration,
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

#[extend::ext]
pub impl ExitStatus {
  fn check_success(&self) -> Result<()> {
    if !self.success() {
      anyhow::bail!("exited with non-zero status {self}");
    }

    Ok(())
  }
}

/// Kills the child's whole process group. The child must have been spawned as
/// a group leader (`process_group(0)`).
#[cfg(unix)]
fn kill_group(child: &mut Child) -> Result<()> {
  use nix::{
    errno::Errno,
    sys::signal::{killpg, Signal},
    unistd::Pid,
  };

  let pgid = Pid::from_raw(i32::try_from(child.id()).context("pid")?);
  match killpg(pgid, Signal::SIGKILL) {
    Ok(()) | Err(Errno::ESRCH) => Ok(()),
    Err(err) => Err(err).context("killpg"),
  }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> Result<()> {
  child.kill().context("kill")
}

#[extend::ext]
pub impl Child {
  /// Waits for the child to exit. On timeout the child's process group is
  /// killed, the child is reaped, and `Ok(None)` is returned.
  fn wait_or_kill(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
    if let Some(status) = self.wait_timeout(timeout).context("wait")? {
      return Ok(Some(status));
    }

    kill_group(self).context("kill after timeout")?;
    self.wait().context("wait after kill")?;

    Ok(None)
  }
}

#[extend::ext]
pub impl Command {
  /// Runs the command, capturing stdout and passing stderr through, returning
  /// an error on non-zero exit.
  fn status_stdout(&mut self) -> Result<String> {
    let output = self.stderr(Stdio::inherit()).output().context("output")?;
    output.status.check_success()?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  /// Like [`status_stdout`](CommandExt::status_stdout), but returns `Ok(None)`
  /// if the command does not exit within `timeout`. The command runs in its own
  /// process group so that a timeout also kills whatever it spawned.
  fn status_stdout_timeout(&mut self, timeout: Duration) -> Result<Option<String>> {
    #[cfg(unix)]
    self.process_group(0);

    let mut child = self
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
      .context("spawn")?;
    let mut stdout = child.stdout.take().context("stdout")?;

    // Drain the pipe while waiting so a chatty child can't block on a full
    // buffer.
    let reader = thread::spawn(move || {
      let mut output = Vec::new();
      stdout.read_to_end(&mut output).map(|_| output)
    });

    // The reader is left detached on timeout, a process that left the group may
    // still hold the pipe open.
    let Some(status) = child.wait_or_kill(timeout)? else {
      return Ok(None);
    };

    let output = reader
      .join()
      .map_err(|_| anyhow::anyhow!("stdout reader panicked"))?
      .context("read")?;
    status.check_success()?;

    Ok(Some(String::from_utf8_lossy(&output).into_owned()))
  }
}
