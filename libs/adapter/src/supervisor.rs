//! Lifecycle of the subprocess tier's external worker.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Spawns, observes, and terminates the external worker process.
///
/// At most one worker is held at a time. `shutdown` is idempotent: safe when
/// nothing was ever spawned, safe when called repeatedly, and it never
/// panics or returns an error.
pub struct ProcessSupervisor {
    child: Mutex<Option<Child>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            child: Mutex::new(None),
        }
    }

    /// Launch the worker at `path`, handing it the loopback port to bind,
    /// then sleep the grace period so the listener has time to come up
    /// before the caller's first connection attempt.
    ///
    /// The worker's stdout and stderr are both forwarded into the tracing
    /// stream, so its diagnostics land in one observable place.
    pub fn spawn(&self, path: &Path, port: u16, grace: Duration) -> Result<()> {
        let mut child = Command::new(path)
            .arg(port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdout) = child.stdout.take() {
            forward_output("stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output("stderr", stderr);
        }

        info!(worker = %path.display(), port, "worker process spawned");
        *self.child.lock() = Some(child);

        thread::sleep(grace);
        Ok(())
    }

    /// Terminate the worker if one is running. Idempotent.
    pub fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().take() {
            if let Err(error) = child.kill() {
                debug!(%error, "worker already gone at shutdown");
            }
            let _ = child.wait();
            info!("worker process terminated");
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn forward_output<R: Read + Send + 'static>(channel: &'static str, reader: R) {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => debug!(target: "worker", channel, "{line}"),
                Err(error) => {
                    warn!(target: "worker", channel, %error, "worker output stream closed");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_without_spawn_is_a_no_op() {
        let supervisor = ProcessSupervisor::new();
        supervisor.shutdown();
        supervisor.shutdown();
    }

    #[test]
    fn spawning_a_nonexistent_binary_fails_cleanly() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor.spawn(
            Path::new("no-such-worker-binary"),
            9094,
            Duration::from_millis(0),
        );
        assert!(result.is_err());
        supervisor.shutdown();
    }
}
