//! Kernel server process supervision
//!
//! The server is launched in its own session so that it outlives the
//! orchestrator and does not receive signals aimed at the orchestrator's
//! process group. It is not killed on drop; the only way it is reaped is
//! through [`ProcessSupervisor::wait`].

use std::process::{ExitStatus, Stdio};

use kw_core::config::ServerCommand;
use kw_core::WarmupError;
use tokio::process::{Child, Command};

/// Owns the launched kernel server
#[derive(Debug)]
pub struct ProcessSupervisor {
    child: Child,
    program: String,
}

impl ProcessSupervisor {
    /// Launch the server detached from the current session
    pub fn launch(command: &ServerCommand) -> Result<Self, WarmupError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());

        #[cfg(unix)]
        detach(&mut cmd);

        let child = cmd.spawn().map_err(|e| {
            WarmupError::Process(format!("failed to launch {:?}: {}", command.program, e))
        })?;

        tracing::info!(
            pid = child.id().unwrap_or(0),
            program = %command.program,
            args = ?command.args,
            "Kernel server launched"
        );

        Ok(Self {
            child,
            program: command.program.clone(),
        })
    }

    /// OS process ID, if the process has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the server to exit
    pub async fn wait(&mut self) -> Result<ExitStatus, WarmupError> {
        let status = self.child.wait().await.map_err(|e| {
            WarmupError::Process(format!("failed to wait for {:?}: {}", self.program, e))
        })?;
        tracing::info!("Kernel server {:?} exited with {}", self.program, status);
        Ok(status)
    }
}

/// Start the child in a new session, like `setsid(1)`
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    // SAFETY: setsid is async-signal-safe and runs in the child before exec.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}
