use std::fs;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::Workspace;

/// Deletes every working artifact of `run_id` and returns how many were
/// removed. Missing targets and failed deletions are logged, never fatal.
pub fn perform_cleanup(workspace: &Workspace, run_id: &str) -> usize {
    info!("--- Starting Cleanup Process for ID: {} ---", run_id);

    let targets: [PathBuf; 4] = [
        workspace.audio_path(run_id),
        workspace.tts_parts_dir(run_id),
        workspace.subtitles_path(run_id),
        workspace.video_path(run_id),
    ];

    let mut deleted = 0;
    for target in &targets {
        if !target.exists() {
            warn!(
                "Cleanup target not found (may have failed earlier): {}",
                target.display()
            );
            continue;
        }
        let result = if target.is_dir() {
            fs::remove_dir_all(target)
        } else {
            fs::remove_file(target)
        };
        match result {
            Ok(()) => {
                info!("Deleted temporary artifact: {}", target.display());
                deleted += 1;
            }
            Err(e) => error!("Error deleting {}: {}", target.display(), e),
        }
    }

    info!(
        "Cleanup complete. Deleted {} artifact(s) for ID: {}.",
        deleted, run_id
    );
    deleted
}
