use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::ipc::channel::MoveChannel;
use crate::utils::prelude::*;

/// Spawns one player with the contractual argv (`width height`) and takes
/// over its stdout as the move channel.
pub fn spawn_player(path: &Path, width: u16, height: u16) -> Result<(Child, MoveChannel)> {
    let mut child = Command::new(path)
        .arg(width.to_string())
        .arg(height.to_string())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn player {}", path.display()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("player {} spawned without a stdout pipe", path.display()))?;
    let channel = MoveChannel::from_child(stdout)?;
    Ok((child, channel))
}

/// Spawns the view with the contractual argv. Its stdout stays on the
/// terminal: that is the rendering surface.
pub fn spawn_view(path: &Path, width: u16, height: u16) -> Result<Child> {
    Command::new(path)
        .arg(width.to_string())
        .arg(height.to_string())
        .spawn()
        .with_context(|| format!("spawn view {}", path.display()))
}

/// Best-effort SIGTERM; the child may already be gone.
pub fn terminate(child: &Child) {
    let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM);
}

/// Human-readable exit description for the termination report.
pub fn exit_label(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exited with code {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "exited".to_owned(),
    }
}
