use nexlink::{
    Manager, ManagerEvent,
    common::{
        banner::{BannerInfo, print_banner},
        logger,
        types::GuildId,
    },
    configs::Config,
};
use serde_json::Value;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}, using defaults");
            Config::default()
        }
    };

    print_banner(&BannerInfo::from_config(&config));
    logger::init(&config);

    let (manager, events) = Manager::new(&config, |guild: GuildId, payload: Value| {
        info!("[{}] Voice state to relay: {}", guild, payload);
    })?;

    let client_id = std::env::var("NEXLINK_CLIENT_ID").unwrap_or_default();
    manager.init(client_id)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            event = events.recv_async() => match event {
                Ok(ManagerEvent::Error(e)) => error!("{}", e),
                Ok(ManagerEvent::NodeDisconnect { node, code, reason }) => {
                    warn!("[{}] Disconnected ({}: {})", node, code, reason)
                }
                Ok(event) => info!("{}", event.name()),
                Err(_) => break,
            },
        }
    }

    manager.destroy_nodes().await;
    Ok(())
}
