//! Formatting utilities for durations and the run summary.

use super::colors_enabled;
use crate::report::{ReportEntry, RunReport};
use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;
use vigil_harness::{RunResult, RunState};

/// Format a duration in human-readable form.
///
/// ```
/// use std::time::Duration;
/// use vigil_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Wall-clock time between the start of a run and its final capture.
pub fn run_duration(result: &RunResult) -> Duration {
    (result.finished_at - result.started_at)
        .to_std()
        .unwrap_or_default()
}

/// Print one line per scenario plus totals to stderr.
pub fn print_run_summary(report: &RunReport, elapsed: Duration) {
    let width = usize::from(Term::stderr().size().1).min(80);
    let color = colors_enabled();

    if color {
        eprintln!("\n{}", "Run Summary".bold().underline());
    } else {
        eprintln!("\nRun Summary");
    }
    eprintln!("{}", "─".repeat(width));

    for entry in &report.runs {
        match entry {
            ReportEntry::Ran(result) => print_result(result, color),
            ReportEntry::Errored { scenario, error } => {
                if color {
                    eprintln!("  {} {} {}", "✗".red().bold(), scenario.bold(), error.red());
                } else {
                    eprintln!("  ✗ {scenario} {error}");
                }
            }
        }
    }

    eprintln!("{}", "─".repeat(width));
    let passed = format!("{} passed", report.passed);
    let failed = format!("{} failed", report.failed);
    let took = format_duration(elapsed);
    if color {
        eprintln!(
            "  {} {}, {} in {}",
            "Total:".bold(),
            passed.green(),
            if report.failed > 0 { failed.red().to_string() } else { failed.dimmed().to_string() },
            took
        );
    } else {
        eprintln!("  Total: {passed}, {failed} in {took}");
    }
}

fn print_result(result: &RunResult, color: bool) {
    let symbol = match result.state() {
        RunState::Completed => "✓",
        RunState::TimedOut => "⏱",
        _ => "✗",
    };
    let duration = format!("({})", format_duration(run_duration(result)));
    let captures = format!("{} capture(s)", result.evidence.len());

    if color {
        let outcome = if result.is_success() {
            result.outcome.to_string().green().to_string()
        } else {
            result.outcome.to_string().red().to_string()
        };
        eprintln!(
            "  {} {} {} {} {}",
            symbol.bold(),
            result.scenario.bold(),
            outcome,
            duration.dimmed(),
            captures.dimmed()
        );
    } else {
        eprintln!(
            "  {symbol} {} {} {duration} {captures}",
            result.scenario, result.outcome
        );
    }

    if !result.page_errors.is_empty() {
        let mut line = format!("{} page error(s)", result.page_errors.len());
        if let Some(log) = &result.error_log {
            line.push_str(&format!(", see {}", log.location));
        }
        if color {
            eprintln!("      {} {}", "⚠".yellow(), line.yellow());
        } else {
            eprintln!("      ⚠ {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_harness::RunOutcome;

    #[test]
    fn test_format_duration_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_run_duration_never_negative() {
        let now = Utc::now();
        let result = RunResult {
            scenario: "s".to_string(),
            outcome: RunOutcome::Timeout { index: 0 },
            steps_completed: 0,
            started_at: now,
            finished_at: now - chrono::Duration::seconds(1),
            evidence: Vec::new(),
            page_errors: Vec::new(),
            console: Vec::new(),
            error_log: None,
        };
        assert_eq!(run_duration(&result), Duration::ZERO);

        let result = RunResult {
            finished_at: now + chrono::Duration::milliseconds(1500),
            ..result
        };
        assert_eq!(run_duration(&result), Duration::from_millis(1500));
    }
}
