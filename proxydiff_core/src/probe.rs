use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// External video metadata source consumed by the advanced scan policy.
///
/// `frame_count` must never fail hard: a missing tool, an unreadable or
/// corrupt file, a parse error, or a timeout all fold to `None` so scanning
/// can continue past the affected file.
pub trait MetadataProbe: Send + Sync {
    /// Capability check, performed once before any scanning starts.
    fn available(&self) -> bool;

    /// Number of video frames in the file, or `None` when it cannot be
    /// determined.
    fn frame_count(&self, path: &Path) -> Option<u64>;
}

/// Probe backed by the `mediainfo` CLI.
pub struct MediaInfoProbe {
    binary: String,
    timeout: Duration,
    available: OnceLock<bool>,
}

impl MediaInfoProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary("mediainfo", timeout)
    }

    pub fn with_binary(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            available: OnceLock::new(),
        }
    }

    /// Run a command and capture stdout, killing the child if it outlives
    /// the probe timeout. The expected output is a single short line, so
    /// there is no risk of filling the pipe before the child exits.
    fn capture_with_timeout(&self, mut command: Command) -> Option<String> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to spawn {}: {}", self.binary, e);
                return None;
            }
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        debug!("{} exited with {}", self.binary, status);
                        return None;
                    }
                    let mut output = String::new();
                    child
                        .stdout
                        .take()?
                        .read_to_string(&mut output)
                        .ok()?;
                    return Some(output);
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(
                            "{} did not finish within {:?}, killing it",
                            self.binary, self.timeout
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        return None;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    warn!("Failed to wait for {}: {}", self.binary, e);
                    return None;
                }
            }
        }
    }
}

impl MetadataProbe for MediaInfoProbe {
    fn available(&self) -> bool {
        *self.available.get_or_init(|| {
            // Same deadline as frame_count, so a hung binary cannot stall
            // the run before scanning even starts.
            let mut command = Command::new(&self.binary);
            command.arg("--Version");
            let ok = self.capture_with_timeout(command).is_some();
            if !ok {
                debug!("{} not found or not runnable", self.binary);
            }
            ok
        })
    }

    fn frame_count(&self, path: &Path) -> Option<u64> {
        let mut command = Command::new(&self.binary);
        command.arg("--Output=Video;%FrameCount%").arg(path);

        let output = self.capture_with_timeout(command)?;
        let line = output.lines().next().unwrap_or("").trim();
        match line.parse::<u64>() {
            Ok(frames) => Some(frames),
            Err(_) => {
                warn!("Unparseable frame count {:?} for {}", line, path.display());
                None
            }
        }
    }
}
