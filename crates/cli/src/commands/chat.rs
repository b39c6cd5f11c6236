//! `concierge chat`: Run one conversation cycle without the HTTP layer.

use concierge_agent::build_orchestrator;
use concierge_config::AppConfig;
use concierge_core::message::ChatRequest;
use tracing::warn;

pub async fn run(user: Option<String>, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let user_id = user.unwrap_or_else(|| config.gateway.default_user_id.clone());

    let orchestrator = build_orchestrator(&config).await?;
    let cycle = orchestrator
        .run_cycle(&ChatRequest::new(user_id, message))
        .await?;

    println!("{}", cycle.reply);

    for degradation in &cycle.degradations {
        eprintln!("  (degraded: {}: {})", degradation.step, degradation.reason);
    }

    // The process exits right after, so wait for the memory write-back here.
    if let Some(writeback) = cycle.writeback {
        if let Err(e) = writeback.await {
            warn!(error = %e, "Memory write-back task failed");
        }
    }

    Ok(())
}
