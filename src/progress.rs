// Progress bars via indicatif. Disabled bars are represented as None so
// callers can pass `bar.as_ref()` straight through.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProgressManager {
    multi: Option<Arc<MultiProgress>>,
}

impl ProgressManager {
    // If enabled=false, no bars are created.
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            Some(Arc::new(MultiProgress::new()))
        } else {
            None
        };
        Self { multi }
    }

    pub fn is_enabled(&self) -> bool {
        self.multi.is_some()
    }

    // Byte progress over an input file, labelled with its file name.
    pub fn new_file_bar(&self, path: &Path, label: &str) -> Option<ProgressBar> {
        let mp = self.multi.as_ref()?;
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let bar = mp.add(ProgressBar::new(size));
        bar.set_style(byte_style());
        bar.set_prefix(format!("{} {}", label, basename(path)));
        Some(bar)
    }

    // Row counter used while writing INSERT statements.
    pub fn new_row_bar(&self, total: u64, label: &str) -> Option<ProgressBar> {
        let mp = self.multi.as_ref()?;
        let bar = mp.add(ProgressBar::new(total));
        bar.set_style(row_style());
        bar.set_prefix(label.to_string());
        Some(bar)
    }
}

fn byte_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:28} {bytes:>10}/{total_bytes:<10} [{bar:50}] {percent:>3}%",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█ ")
}

fn row_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:28} {pos:>7}/{len:<7} [{bar:50}] {percent:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█ ")
}

pub fn basename(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
