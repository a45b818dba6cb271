//! WebSocket-based live reload signaling.
//!
//! Transforms and the watcher publish to the hub; every connected browser
//! client is push-notified. Nothing polls.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload (markup or script changes)
    Reload,

    /// CSS hot swap: stylesheets are re-fetched without a full page load
    RefreshCss,

    /// Connection established
    Connected,
}

/// Hub broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Publish a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is connected yet
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side reload script, injected into served HTML documents.
pub fn reload_client_script() -> &'static str {
    r#"
(function() {
  'use strict';

  const ws = new WebSocket('ws://' + location.host + '/__livereload');

  ws.onmessage = function(event) {
    const msg = JSON.parse(event.data);

    switch (msg.type) {
      case 'reload':
        location.reload();
        break;

      case 'refresh_css':
        document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {
          const url = new URL(link.href);
          url.searchParams.set('v', Date.now().toString());
          link.href = url.toString();
        });
        break;

      case 'connected':
        console.log('[livereload] connected');
        break;
    }
  };

  ws.onclose = function() {
    console.log('[livereload] disconnected');
  };
})();
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::RefreshCss);

        match rx.try_recv() {
            Ok(ReloadMessage::RefreshCss) => {}
            other => panic!("Expected RefreshCss, got {:?}", other),
        }
    }

    #[test]
    fn send_without_receivers_is_a_no_op() {
        let hub = ReloadHub::new();
        hub.send(ReloadMessage::Reload);
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn serializes_with_snake_case_tags() {
        let json = serde_json::to_string(&ReloadMessage::RefreshCss).unwrap();
        assert!(json.contains("refresh_css"));

        let json = serde_json::to_string(&ReloadMessage::Reload).unwrap();
        assert!(json.contains("reload"));
    }
}
