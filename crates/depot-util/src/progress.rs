//! Transfer progress reporting for downloads and uploads.

use indicatif::{ProgressBar, ProgressStyle};

/// Minimum content length before a progress bar is shown at all; small
/// artifacts (most POMs, checksum sidecars) complete too fast to be worth
/// rendering one.
const PROGRESS_THRESHOLD_BYTES: u64 = 100_000;

/// Build a progress bar for a transfer of `total_bytes`, or `None` if the
/// transfer is too small to bother (mirrors the teacher's
/// `download_artifact` heuristic).
pub fn for_transfer(label: &str, total_bytes: u64) -> Option<ProgressBar> {
    if total_bytes <= PROGRESS_THRESHOLD_BYTES {
        return None;
    }
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message(label.to_string());
    Some(pb)
}

/// Advance and finish a progress bar started with [`for_transfer`].
pub fn finish(pb: Option<ProgressBar>, final_bytes: u64) {
    if let Some(pb) = pb {
        pb.set_position(final_bytes);
        pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_transfer_has_no_bar() {
        assert!(for_transfer("tiny.pom", 500).is_none());
    }

    #[test]
    fn large_transfer_gets_a_bar() {
        assert!(for_transfer("big.jar", 10_000_000).is_some());
    }
}
