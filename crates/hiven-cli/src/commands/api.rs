//! One-shot REST commands.

use hiven_core::Config;
use hiven_rest::{RestApi, RestClient};

fn client(config: &Config) -> anyhow::Result<RestClient> {
    let token = config.require_token()?;
    Ok(RestClient::with_timeout(
        token,
        &config.api.base_url,
        config.api.timeout_secs,
    )?)
}

/// Print a user as JSON.
pub async fn user(config: &Config, id: &str) -> anyhow::Result<()> {
    match client(config)?.get_user(id).await? {
        Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
        None => anyhow::bail!("User not found: {}", id),
    }
    Ok(())
}

/// Send a message and print the created message.
pub async fn send(config: &Config, room_id: &str, content: &str) -> anyhow::Result<()> {
    let message = client(config)?.send_message(room_id, content).await?;
    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}
