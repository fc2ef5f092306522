//! Round-relative step timing and remaining-time projection.

use std::time::{Duration, Instant};

use crate::core::classify::{ExtractedInfo, StepCategory};

/// Assumed sub-steps per supervisory iteration when projecting remaining
/// time. The projection is deliberately coarse: an estimate, not a promise.
const STEPS_PER_ITERATION: u32 = 3;

/// One sealed step: a named unit of engine work and what we learned from it.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub category: StepCategory,
    pub started_at: Instant,
    pub duration: Duration,
    pub info: ExtractedInfo,
}

/// The step currently being timed.
#[derive(Debug, Clone)]
struct OpenStep {
    name: String,
    category: StepCategory,
    started_at: Instant,
    info: ExtractedInfo,
}

/// Wall-clock bookkeeping for one round.
///
/// One tracker lives for exactly one round; a clarification exchange starts a
/// fresh tracker, so elapsed time and estimates never span rounds. At most
/// one step is open at a time, matching the engine's one-update-at-a-time
/// delivery.
#[derive(Debug)]
pub struct ProgressTracker {
    round_started: Instant,
    open: Option<OpenStep>,
    history: Vec<StepRecord>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            round_started: Instant::now(),
            open: None,
            history: Vec::new(),
        }
    }

    /// Begins timing a step. Fails soft if a step is already open: the stale
    /// open step is overwritten, not sealed.
    pub fn start_step(
        &mut self,
        name: impl Into<String>,
        category: StepCategory,
        info: ExtractedInfo,
    ) {
        self.open = Some(OpenStep {
            name: name.into(),
            category,
            started_at: Instant::now(),
            info,
        });
    }

    /// Seals the open step into the round history. No-op when none is open.
    pub fn end_step(&mut self) {
        if let Some(open) = self.open.take() {
            self.history.push(StepRecord {
                name: open.name,
                category: open.category,
                started_at: open.started_at,
                duration: open.started_at.elapsed(),
                info: open.info,
            });
        }
    }

    /// Time since the round started.
    pub fn elapsed(&self) -> Duration {
        self.round_started.elapsed()
    }

    /// The instant the round started; the animator renders elapsed time
    /// relative to this.
    pub fn started_at(&self) -> Instant {
        self.round_started
    }

    /// Steps sealed so far this round.
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// Projects remaining time from the average sealed-step duration.
    /// Unknown (`None`) until at least one step has been sealed.
    pub fn estimate_remaining(
        &self,
        current_iteration: u32,
        max_iterations: u32,
    ) -> Option<Duration> {
        estimate_from_history(&self.history, current_iteration, max_iterations)
    }

    /// Seals any open step and returns the round history.
    pub fn finish(mut self) -> Vec<StepRecord> {
        self.end_step();
        self.history
    }
}

fn estimate_from_history(
    history: &[StepRecord],
    current_iteration: u32,
    max_iterations: u32,
) -> Option<Duration> {
    if history.is_empty() {
        return None;
    }
    let total: Duration = history.iter().map(|record| record.duration).sum();
    let average = total / history.len() as u32;
    let remaining = max_iterations.saturating_sub(current_iteration);
    Some(average * remaining * STEPS_PER_ITERATION)
}

/// Renders a proportional fill bar with a percentage, e.g. `[████░░░░] 50%`.
/// A zero total renders as an empty 0% bar rather than dividing by zero.
pub fn progress_bar(current: u32, total: u32, width: usize) -> String {
    let (filled, percent) = if total == 0 {
        (0, 0)
    } else {
        let current = current.min(total);
        (
            (current as usize * width) / total as usize,
            current * 100 / total,
        )
    };
    let fill: String = (0..width)
        .map(|i| if i < filled { '█' } else { '░' })
        .collect();
    format!("[{fill}] {percent}%")
}

/// Formats a duration as zero-padded minutes and seconds.
pub fn format_mmss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(duration_secs: u64) -> StepRecord {
        StepRecord {
            name: "step".to_string(),
            category: StepCategory::Supervise,
            started_at: Instant::now(),
            duration: Duration::from_secs(duration_secs),
            info: ExtractedInfo::default(),
        }
    }

    #[test]
    fn test_end_without_start_is_noop() {
        let mut tracker = ProgressTracker::new();
        tracker.end_step();

        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_start_overwrites_open_step() {
        let mut tracker = ProgressTracker::new();
        tracker.start_step("first", StepCategory::Brief, ExtractedInfo::default());
        tracker.start_step("second", StepCategory::Supervise, ExtractedInfo::default());
        tracker.end_step();

        let history = tracker.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "second");
    }

    #[test]
    fn test_finish_seals_open_step() {
        let mut tracker = ProgressTracker::new();
        tracker.start_step("only", StepCategory::Report, ExtractedInfo::default());

        let history = tracker.finish();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "only");
    }

    #[test]
    fn test_estimate_unknown_without_history() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.estimate_remaining(0, 6), None);
    }

    #[test]
    fn test_estimate_scales_average_by_remaining_iterations() {
        let history = vec![record(2), record(4)];

        // avg 3s, 4 iterations left, 3 sub-steps each.
        let estimate = estimate_from_history(&history, 2, 6).unwrap();
        assert_eq!(estimate, Duration::from_secs(36));
    }

    #[test]
    fn test_estimate_zero_when_iterations_exhausted() {
        let history = vec![record(5)];

        let estimate = estimate_from_history(&history, 8, 6).unwrap();
        assert_eq!(estimate, Duration::ZERO);
    }

    #[test]
    fn test_progress_bar_zero_total_is_empty_bar() {
        let bar = progress_bar(3, 0, 20);
        assert_eq!(bar, format!("[{}] 0%", "░".repeat(20)));
    }

    #[test]
    fn test_progress_bar_proportions() {
        assert_eq!(progress_bar(1, 2, 10), "[█████░░░░░] 50%");
        assert_eq!(progress_bar(6, 6, 10), "[██████████] 100%");
        assert_eq!(progress_bar(0, 6, 10), "[░░░░░░░░░░] 0%");
    }

    #[test]
    fn test_progress_bar_clamps_overflow() {
        assert_eq!(progress_bar(9, 6, 10), "[██████████] 100%");
    }

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(Duration::from_secs(0)), "00:00");
        assert_eq!(format_mmss(Duration::from_secs(62)), "01:02");
        assert_eq!(format_mmss(Duration::from_secs(600)), "10:00");
    }
}
