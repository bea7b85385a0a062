//! Hands preview files to the desktop's default application.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use tracing::{debug, warn};

/// Launcher invocation for `path` on this platform.
fn viewer_command(path: &Path) -> Command {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut start = Command::new("cmd");
        start.args(["/C", "start", ""]);
        start
    } else {
        Command::new("xdg-open")
    };
    command
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

/// Start the viewer without waiting for it. Some launchers only return once
/// the viewer exits, so the child is reaped on a background thread.
pub fn open_preview_file(path: &Path) -> io::Result<()> {
    let child = viewer_command(path).spawn()?;
    debug!(pid = child.id(), path = %path.display(), "preview viewer launched");
    thread::Builder::new()
        .name("gymlog-viewer".to_string())
        .spawn(move || reap(child))?;
    Ok(())
}

fn reap(mut child: Child) {
    match child.wait() {
        Ok(status) if !status.success() => warn!(%status, "preview viewer exited with an error"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not wait for preview viewer"),
    }
}
