use std::time::Duration;

use satele_config::BridgeConfig;

/// Address to query when the gateway binds every interface.
fn status_url(config: &BridgeConfig) -> String {
    let host = match config.gateway.bind.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{host}:{}/status", config.gateway.port)
}

pub async fn print_status(config: &BridgeConfig) -> anyhow::Result<()> {
    println!("Satele status:");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;
    let url = status_url(config);
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body: serde_json::Value = resp.json().await?;
            let state = body["state"].as_str().unwrap_or("unknown");
            println!("  WhatsApp bridge: RUNNING ({state})");
            if let Some(own_id) = body["ownId"].as_str() {
                println!("  Linked account:  {own_id}");
            }
            if let Some(code) = body["pairingCode"].as_str() {
                println!("  Pairing code:    {code}");
            }
        },
        Ok(resp) => println!("  WhatsApp bridge: ERROR {}", resp.status()),
        Err(_) => println!("  WhatsApp bridge: STOPPED ({url})"),
    }

    println!("  Trigger:         {}", config.trigger);
    println!("  Allowed numbers: {}", config.allowed_numbers.len());
    println!("  Webhook:         {}", config.webhook_url);
    Ok(())
}
