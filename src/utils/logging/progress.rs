//! Progress reporting for long projection runs, using the indicatif crate.

use indicatif::{ProgressBar, ProgressStyle};

/// Default style for the year progress bar
pub const DEFAULT_YEAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} years ({eta}) {msg}";

/// Create the progress bar over simulated years
///
/// Returns a hidden bar when `enabled` is false so callers never branch.
#[must_use]
pub fn create_year_progress_bar(years: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(years);
    match ProgressStyle::default_bar().template(DEFAULT_YEAR_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::warn!("Invalid progress template: {e}"),
    }
    pb
}

/// Finish a progress bar with a completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
