//! Terminal output: status messages and the run summary.
//!
//! Everything is written to stderr so stdout stays free for piping.
//!
//! ```no_run
//! use vigil_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Scenario files are valid");
//! ui::error("Failed to parse scenario");
//! ```

mod format;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_duration, print_run_summary, run_duration};
pub use messages::{error, info, success, warning};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Decide once whether status messages are colored.
///
/// `--no-color` and `NO_COLOR` disable colors, `FORCE_COLOR` forces them,
/// otherwise they follow terminal detection on stderr.
pub fn init_colors(no_color: bool) {
    COLORS.store(!no_color && should_use_color(), Ordering::Relaxed);
}

/// Whether status messages are colored.
pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Check if color output should be enabled from the environment.
///
/// Shared by the status messages and the log output. `NO_COLOR` disables
/// colors and `FORCE_COLOR` forces them even when stderr is not a terminal.
pub fn should_use_color() -> bool {
    color_from_env(
        std::env::var_os("NO_COLOR").is_some(),
        std::env::var_os("FORCE_COLOR").is_some(),
        || console::Term::stderr().features().colors_supported(),
    )
}

fn color_from_env(no_color: bool, force_color: bool, terminal: impl FnOnce() -> bool) -> bool {
    if no_color {
        false
    } else if force_color {
        true
    } else {
        terminal()
    }
}
