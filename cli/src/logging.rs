use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_NAME: &str = "storyfeed.log";

/// Log to `~/.storyfeed/logs/storyfeed.log` (or `./.storyfeed/logs`).
///
/// Stdout carries command output, so when no log file can be opened logging
/// is dropped rather than mixed into it.
pub fn init_tracing(data_dir: &Path) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file(&log_file_candidates(data_dir));

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file(candidates: &[PathBuf]) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in candidates {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(candidate) {
            Ok(file) => return (Some((candidate.clone(), file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(data_dir: &Path) -> Vec<PathBuf> {
    let primary = data_dir.join("logs").join(LOG_FILE_NAME);
    let fallback = PathBuf::from(".storyfeed").join("logs").join(LOG_FILE_NAME);
    if primary == fallback {
        vec![primary]
    } else {
        vec![primary, fallback]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_prefer_data_dir() {
        let candidates = log_file_candidates(Path::new("/home/ann/.storyfeed"));
        assert_eq!(
            candidates,
            [
                PathBuf::from("/home/ann/.storyfeed/logs/storyfeed.log"),
                PathBuf::from(".storyfeed/logs/storyfeed.log"),
            ]
        );
    }

    #[test]
    fn relative_data_dir_is_not_duplicated() {
        assert_eq!(log_file_candidates(Path::new(".storyfeed")).len(), 1);
    }

    #[test]
    fn falls_through_to_next_candidate() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the log directory should be.
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"").unwrap();

        let good = dir.path().join("ok").join(LOG_FILE_NAME);
        let candidates = [blocker.join("logs").join(LOG_FILE_NAME), good.clone()];

        let (opened, warnings) = open_log_file(&candidates);
        assert_eq!(opened.map(|(path, _)| path), Some(good));
        assert_eq!(warnings.len(), 1);
    }
}
