use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::warn;

/// Hands each accepted reading to an external receiver executable.
///
/// The receiver gets the composite reading string as its sole argument.
/// Invocation is fire-and-forget: the exit status is never collected,
/// and a spawn failure is logged and swallowed. A broken receiver must
/// not disturb acquisition.
#[derive(Debug, Clone)]
pub struct PushHook {
    script: PathBuf,
}

impl PushHook {
    /// A hook invoking `script` once per reading.
    pub fn new(script: PathBuf) -> Self {
        Self { script }
    }

    /// The receiver's path.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Spawn the receiver for one reading.
    pub fn deliver(&self, reading: &str) {
        if let Err(e) = Command::new(&self.script).arg(reading).spawn() {
            warn!(?e, script = ?self.script, "Could not spawn the receiver script");
        }
    }
}
