//! Run command: hold a gateway session open and log what it sees.

use clap::Args;
use hiven_core::Config;
use hiven_gateway::{names, EventKind, GatewayEvent, SessionBuilder, SharedCache};
use tracing::{info, warn};

/// Run command arguments.
#[derive(Args)]
pub struct RunArgs {
    /// Reply "pong" to messages starting with this prefix
    #[arg(long)]
    pub ping_prefix: Option<String>,
}

/// Run the gateway session until Ctrl-C or until the server closes it.
pub async fn run(args: RunArgs, config: Config) -> anyhow::Result<()> {
    config.require_token()?;
    config.validate()?;

    let mut builder = SessionBuilder::from_config(&config);
    let cache = builder.cache();

    {
        let cache = cache.clone();
        builder = builder.on(names::READY, move |_| {
            let cache = cache.read();
            match cache.self_user() {
                Some(user) => info!(user = %user.id, "Ready"),
                None => info!("Ready"),
            }
        });
    }

    for kind in EventKind::ALL.into_iter().filter(|k| *k != EventKind::InitState) {
        builder = builder.on(kind.public_name(), move |event: &GatewayEvent| {
            info!(event = event.name(), "{}", summarize(event));
        });
    }

    if let Some(prefix) = args.ping_prefix {
        builder = builder.on(names::MESSAGE_CREATE, ping_listener(prefix, cache));
    }

    let session = builder.connect().await?;
    info!("Session is {}", session.state());

    tokio::select! {
        _ = session.closed() => {
            warn!("Gateway closed the session");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }

    session.shutdown();
    Ok(())
}

fn summarize(event: &GatewayEvent) -> String {
    if let Some(message) = event.as_message() {
        return format!("[{}] {}", message.room_id, message.text());
    }
    if let Some(house) = event.as_house() {
        return format!("{} ({})", house.name.as_deref().unwrap_or("unnamed"), house.id);
    }
    event
        .data()
        .and_then(|d| d.get("id"))
        .and_then(|id| id.as_str())
        .map(|id| format!("id={}", id))
        .unwrap_or_default()
}

/// Reply "pong" to messages starting with `prefix`, ignoring our own.
fn ping_listener(
    prefix: String,
    cache: SharedCache,
) -> impl Fn(&GatewayEvent) + Send + Sync + 'static {
    move |event: &GatewayEvent| {
        let Some(message) = event.as_message() else {
            return;
        };
        if !message.text().starts_with(prefix.as_str()) {
            return;
        }
        let own = cache
            .read()
            .self_user()
            .map(|me| message.author_user().map(|a| a.id == me.id).unwrap_or(false))
            .unwrap_or(false);
        if own {
            return;
        }

        let message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = message.reply("pong").await {
                warn!(room = %message.room_id, "Reply failed: {}", e);
            }
        });
    }
}
