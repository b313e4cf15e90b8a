//! Terminal status output. Everything goes to stderr so stdout stays usable
//! for plans and query results.

use std::io::Write;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

fn print_line(style: Style, label: &str, message: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{:>12} {message}", style.apply_to(label));
}

/// An action line with a bold green label: `     Scanned 42 packages, ...`
pub fn status(label: &str, message: &str) {
    print_line(Style::new().green().bold(), label, message);
}

/// Informational line (bold cyan label), e.g. a flavor summary.
pub fn status_info(label: &str, message: &str) {
    print_line(Style::new().cyan().bold(), label, message);
}

/// Something was skipped or ignored (bold yellow label).
pub fn status_warn(label: &str, message: &str) {
    print_line(Style::new().yellow().bold(), label, message);
}

/// Spinner shown while a repository tree is scanned.
///
/// Finish it with [`ProgressBar::finish_and_clear`] before printing status lines.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
