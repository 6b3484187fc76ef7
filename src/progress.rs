use indicatif::{ProgressBar, ProgressStyle};

/// Totalless line counter; the dump's length is not known up front.
pub fn line_progress(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{msg}: {human_pos} lines ({per_sec})").unwrap());
    bar.set_message(message.to_string());
    bar
}
