use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Optional dump of raw upstream responses for offline inspection.
///
/// Disabled unless a directory is configured. Writes happen on a spawned task
/// and failures are only logged; callers never wait on them.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    dir: Option<PathBuf>,
}

impl DiagnosticSink {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn to_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Write `payload` as pretty JSON to `<dir>/<name>.json`
    pub fn record(&self, name: &str, payload: &serde_json::Value) -> Option<JoinHandle<()>> {
        let dir = self.dir.clone()?;
        let file_name = format!("{}.json", sanitize(name));
        let body = match serde_json::to_vec_pretty(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize diagnostic {}: {}", name, e);
                return None;
            }
        };

        Some(tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                warn!("Failed to create diagnostics dir {}: {}", dir.display(), e);
                return;
            }
            let path = dir.join(file_name);
            match tokio::fs::write(&path, body).await {
                Ok(()) => debug!("Saved diagnostic response to {}", path.display()),
                Err(e) => warn!("Failed to write diagnostic {}: {}", path.display(), e),
            }
        }))
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
