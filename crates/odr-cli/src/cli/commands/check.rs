//! Engine connectivity probe.

use anyhow::Result;
use odr_core::config::Config;
use odr_core::engine::RemoteEngine;

pub async fn run(config: &Config) -> Result<()> {
    let engine = RemoteEngine::from_config(&config.engine)?;
    println!("Engine URL: {}", engine.base_url());

    if let Err(err) = engine.health().await {
        anyhow::bail!("Engine unreachable at {}: {err}", engine.base_url());
    }
    println!("Engine: reachable");

    println!();
    println!("Research configuration:");
    println!("  search_api: {}", config.search_api);
    println!("  research_model: {}", config.research_model);
    println!(
        "  max_concurrent_research_units: {}",
        config.max_concurrent_research_units
    );
    println!(
        "  max_researcher_iterations: {}",
        config.max_researcher_iterations
    );
    println!("  max_react_tool_calls: {}", config.max_react_tool_calls);
    Ok(())
}
