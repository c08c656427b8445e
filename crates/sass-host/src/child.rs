//! Launch and supervision of the embedded compiler child process.
//!
//! The compiler is put into embedded mode with the `--embedded` argument
//! and runs with its cwd set to the binary's own directory, so removal of
//! the caller's working directory doesn't kill it mid-compilation. On
//! Windows, batch-file wrappers can't be exec'd directly and go through
//! the shell with a pre-joined command line.

use crate::Result;
use std::path::Path;

#[cfg(unix)]
use std::os::fd::OwnedFd as OwnedStdio;
#[cfg(windows)]
use std::os::windows::io::OwnedHandle as OwnedStdio;

pub(crate) type ChildStdio = tokio::fs::File;

/// The command line that launches `program` in embedded mode.
///
/// Shared with the synchronous host, which spawns it with plain std
/// pipes instead of the async mapping below.
pub(crate) fn embedded_command(program: &Path) -> std::process::Command {
    let mut command = if is_shell_wrapper(program) {
        let mut shell = std::process::Command::new("cmd");
        shell.arg("/d").arg("/s").arg("/c");
        let mut line = program.as_os_str().to_os_string();
        line.push(" --embedded");
        shell.arg(line);
        shell
    } else {
        let mut command = std::process::Command::new(program);
        command.arg("--embedded");
        command
    };
    if let Some(dir) = program.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    command
}

fn is_shell_wrapper(program: &Path) -> bool {
    cfg!(windows)
        && matches!(
            program.extension().and_then(|ext| ext.to_str()),
            Some("bat") | Some("cmd")
        )
}

/// A running embedded compiler with its stdio mapped for async use.
///
/// tokio's `process` feature can deadlock at shutdown when the peer is
/// itself blocked on our stdio (tokio-rs/tokio#3520), so the compiler is
/// spawned with `std::process::Command` and its pipes are remapped into
/// `tokio::fs::File` handles; waiting for exit happens on the blocking
/// pool.
pub(crate) struct CompilerChild {
    /// Present until waited. A child dropped while still here is killed:
    /// the host went away without the dispose handshake.
    inner: Option<std::process::Child>,

    pub stdin: Option<ChildStdio>,
    pub stdout: Option<ChildStdio>,
    pub stderr: Option<ChildStdio>,
}

impl CompilerChild {
    /// Launch `program` in embedded mode with all three stdio pipes.
    pub fn launch(program: &Path) -> Result<Self> {
        let mut inner = embedded_command(program)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        tracing::debug!(pid = inner.id(), program = %program.display(), "started compiler");

        let stdin = inner.stdin.take().map(into_async);
        let stdout = inner.stdout.take().map(into_async);
        let stderr = inner.stderr.take().map(into_async);
        Ok(Self {
            inner: Some(inner),
            stdin,
            stdout,
            stderr,
        })
    }

    /// Wait for the compiler to exit, reaping it. Consumes the handle, so
    /// the drop-time kill is disarmed first.
    pub async fn wait(mut self) -> std::io::Result<std::process::ExitStatus> {
        let mut inner = self.inner.take().expect("child is present until waited");
        let handle = tokio::runtime::Handle::current().spawn_blocking(move || inner.wait());
        handle.await.expect("wait does not panic")
    }
}

impl Drop for CompilerChild {
    fn drop(&mut self) {
        if let Some(inner) = &mut self.inner {
            _ = inner.kill();
        }
    }
}

// The pipe travels raw fd/handle -> blocking file -> tokio file.
fn into_async<F>(pipe: F) -> ChildStdio
where
    F: Into<OwnedStdio>,
{
    let file: std::fs::File = pipe.into().into();
    file.into()
}
