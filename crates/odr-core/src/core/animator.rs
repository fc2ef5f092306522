//! Single-line status animation for spans without step boundaries.
//!
//! The animation runs as its own tokio task and redraws one console line per
//! tick. It never touches the durable log. Stopping is cooperative: the task
//! observes a cancellation token, erases its line, and exits; [`AnimatorHandle::stop`]
//! waits for that, so the caller's next write is guaranteed to start on a
//! clean column.

use std::io::Write;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::progress::format_mmss;
use crate::core::sink::ConsoleHandle;

/// Redraw interval.
const TICK: Duration = Duration::from_millis(100);

/// Spinner frames, one per tick.
const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Handle to the running status animation.
///
/// At most one animation is active at a time; the owner must stop it before
/// emitting any other line-oriented output, and unconditionally before the
/// round ends.
pub struct AnimatorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AnimatorHandle {
    /// Starts redrawing a status line on the console until stopped.
    /// Elapsed time is rendered relative to `round_started`.
    pub fn start(console: ConsoleHandle, label: String, round_started: Instant) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            let mut frame = 0usize;
            let mut drawn_width = 0usize;
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let line = format!(
                    "{} {label} ({})",
                    FRAMES[frame % FRAMES.len()],
                    format_mmss(round_started.elapsed())
                );
                frame += 1;
                drawn_width = drawn_width.max(line.chars().count());
                if let Ok(mut console) = console.lock() {
                    let _ = write!(console, "\r{line}");
                    let _ = console.flush();
                }
            }
            // Erase the status line so the next writer starts clean.
            if drawn_width > 0 && let Ok(mut console) = console.lock() {
                let _ = write!(console, "\r{}\r", " ".repeat(drawn_width));
                let _ = console.flush();
            }
        });
        Self { cancel, task }
    }

    /// Stops the animation, waiting until its line has been erased.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
