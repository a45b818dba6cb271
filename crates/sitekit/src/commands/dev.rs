//! Dev command: watcher, initial transforms and the dev server.
//!
//! The watcher and the {style, script, server} sequence are independent
//! concurrent activities; neither waits for the other beyond being started
//! together. Runs until the process is terminated.

use std::sync::Arc;

use anyhow::Result;

use sitekit_assets::{scripts, styles, SiteConfig};
use sitekit_server::{DevServer, DevServerConfig, FileWatcher, ReloadHub, ReloadMessage, WatchTopic};

/// Run the dev workflow.
pub async fn run(config: SiteConfig, port: u16, open: bool) -> Result<()> {
    let config = Arc::new(config);
    let hub = ReloadHub::new();

    // Watch rules run for the life of the process
    let (watcher, mut topics) = FileWatcher::new(&config)?;
    let watch_config = Arc::clone(&config);
    let watch_hub = hub.clone();
    tokio::spawn(async move {
        while let Some(topic) = topics.recv().await {
            handle_topic(&watch_config, &watch_hub, topic);
        }
        drop(watcher);
    });

    // Initial transforms. A stylesheet syntax error here is a notification,
    // not a crash: the watch loop picks up the corrected file.
    run_styles(&config, &hub);
    run_scripts(&config, &hub);

    let server_config = DevServerConfig {
        root: config.src.home.clone(),
        port,
        open,
        ..DevServerConfig::default()
    };

    DevServer::new(server_config).start(hub).await?;

    Ok(())
}

/// React to a debounced watch notification.
fn handle_topic(config: &SiteConfig, hub: &ReloadHub, topic: WatchTopic) {
    match topic {
        WatchTopic::Styles => run_styles(config, hub),
        WatchTopic::Scripts => run_scripts(config, hub),
        // Markup is served verbatim in development; just refresh
        WatchTopic::Markup => hub.send(ReloadMessage::Reload),
    }
}

fn run_styles(config: &SiteConfig, hub: &ReloadHub) {
    match styles::run(config) {
        Ok(_) => hub.send(ReloadMessage::RefreshCss),
        Err(e) => tracing::error!("Style transform failed: {}", e),
    }
}

fn run_scripts(config: &SiteConfig, hub: &ReloadHub) {
    match scripts::run(config) {
        Ok(_) => hub.send(ReloadMessage::Reload),
        Err(e) => tracing::error!("Script transform failed: {}", e),
    }
}
