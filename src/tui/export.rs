use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// `relief-review-<UTC timestamp>.<ext>` in the current directory.
fn timestamped_path(ext: &str) -> Result<PathBuf> {
    let fmt = time::macros::format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = time::OffsetDateTime::now_utc()
        .format(&fmt)
        .context("format export timestamp")?;
    let current_dir = std::env::current_dir().context("get current directory")?;
    Ok(current_dir.join(format!("relief-review-{stamp}.{ext}")))
}

/// Export the filtered applications (with stats and criteria) as JSON.
/// Returns the absolute path of the exported file.
pub fn export_filtered_json(state: &UiState) -> Result<PathBuf> {
    let path = timestamped_path("json")?;
    crate::export::export_json(&path, &state.criteria, state.store.stats(), &state.filtered)?;
    Ok(path)
}

/// Export the rendered rows as CSV.
pub fn export_filtered_csv(state: &UiState) -> Result<PathBuf> {
    let path = timestamped_path("csv")?;
    crate::export::export_csv(&path, &state.render)?;
    Ok(path)
}

/// Initialize the clipboard manager thread if not already initialized.
/// Each clipboard instance is kept alive for a while so clipboard managers on
/// Linux can read the contents before it is dropped.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
