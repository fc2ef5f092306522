//! Research session runner: one-shot question or interactive loop.

use std::io::Write as _;

use anyhow::{Context, Result};
use odr_core::config::{Config, paths};
use odr_core::core::driver::{Operator, SessionDriver};
use odr_core::core::interrupt::{self, InterruptedError};
use odr_core::core::sink::{OutputSink, stdout_console};
use odr_core::engine::RemoteEngine;
use tracing::info;

/// Keywords ending the interactive loop.
const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

pub async fn run(config: &Config, question: &str, verbose: bool) -> Result<()> {
    let engine = RemoteEngine::from_config(&config.engine)?;
    if question.is_empty() {
        interactive_loop(&engine, config, verbose).await
    } else {
        run_session(&engine, config, question, verbose).await
    }
}

async fn interactive_loop(engine: &RemoteEngine, config: &Config, verbose: bool) -> Result<()> {
    println!("🔬 Deep Research - Interactive Console");

    loop {
        println!();
        println!("Enter your research question (or 'quit' to exit):");
        let Some(line) = read_line("> ").await? else {
            // EOF ends the loop like an explicit quit.
            println!("Goodbye!");
            return Ok(());
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&question.to_lowercase().as_str()) {
            println!("Goodbye!");
            return Ok(());
        }
        if let Err(err) = run_session(engine, config, question, verbose).await {
            if err.downcast_ref::<InterruptedError>().is_some() {
                return Err(err);
            }
            // A failed session ends that question, not the console.
            eprintln!("Session failed: {err:#}");
        }
    }
}

async fn run_session(
    engine: &RemoteEngine,
    config: &Config,
    question: &str,
    verbose: bool,
) -> Result<()> {
    let (mut sink, log_path) = OutputSink::with_session_log(stdout_console(), &paths::logs_dir())?;
    info!(log = %log_path.display(), "session log created");

    let driver =
        SessionDriver::new(engine, config, verbose).with_reports_dir(paths::reports_dir());
    let mut operator = StdinOperator;
    driver.run(question, &mut operator, &mut sink).await?;
    Ok(())
}

/// Operator reading clarification replies from stdin.
struct StdinOperator;

impl Operator for StdinOperator {
    async fn clarification_reply(&mut self, _question: &str) -> Result<String> {
        let line = read_line("Your response (or press Enter to skip and continue): ").await?;
        Ok(line.unwrap_or_default())
    }
}

/// Reads one line from stdin off the runtime, observing interrupts while
/// blocked. `None` means EOF.
async fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    let _ = std::io::stdout().flush();

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|n| (n, line))
    });
    tokio::select! {
        () = interrupt::wait_for_interrupt() => Err(InterruptedError.into()),
        result = read => {
            let (n, line) = result.context("stdin reader panicked")?.context("read stdin")?;
            if n == 0 {
                Ok(None)
            } else {
                Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
            }
        }
    }
}
