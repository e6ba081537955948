use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use parrot_bot::{
    bootstrap,
    ds::{
        loopback::{LoopbackConnector, DEFAULT_CHANNEL_CAPACITY},
        OfflineDirectory,
    },
    identity_store::PlainIdentityStore,
    Args, BotConfig, Collaborators,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = BotConfig::try_from(Args::parse())?;

    // No network transport is linked into this binary: the session is an
    // in-process loopback and everything the bot sends is only logged.
    let connector = Arc::new(LoopbackConnector::new(DEFAULT_CHANNEL_CAPACITY));
    let bot = bootstrap(
        &config,
        Collaborators {
            identities: Arc::new(PlainIdentityStore),
            directory: Arc::new(OfflineDirectory),
            connector: connector.clone(),
        },
    )
    .await?;

    let remote = connector
        .take_remote()
        .ok_or_else(|| anyhow::anyhow!("loopback session has no remote end"))?;
    let inject = remote.inject;
    let mut delivered = remote.delivered;
    tokio::spawn(async move {
        while let Some(event) = delivered.recv().await {
            info!("Outbound: {event}");
        }
    });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Interrupted, shutting down");
        }
        // The dispatch loop dropped its inbound source after a fatal error.
        _ = inject.closed() => {}
    }
    // Closing the inbound source ends the dispatch loop.
    drop(inject);

    bot.wait().await
}
