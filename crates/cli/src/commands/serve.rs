//! `concierge serve`: Start the HTTP gateway.

use concierge_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Concierge Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({})", config.llm.model, config.llm.provider);
    println!("   Sessions:  {}", config.session.backend);
    println!(
        "   Memory:    {}",
        if config.memory.enabled {
            config.memory.backend.as_str()
        } else {
            "disabled"
        }
    );

    concierge_gateway::start(config).await?;

    Ok(())
}
