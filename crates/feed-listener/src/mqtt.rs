//! MQTT Feed Source
//!
//! Each channel is an MQTT topic. Payloads are parsed as JSON; anything that
//! is not valid JSON is passed on as a plain string. Routed topics are
//! subscribed again whenever the broker starts a fresh session.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::source::{Canceller, FeedSource, RawSubscription};
use crate::FeedError;

/// MQTT connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client id presented to the broker
    pub client_id: String,
    /// Keep-alive interval (seconds)
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "aqualog".to_string(),
            keep_alive_secs: 30,
        }
    }
}

type Routes = HashMap<String, Vec<(u64, mpsc::UnboundedSender<Value>)>>;

#[derive(Default)]
struct RouteTable {
    routes: Routes,
    next_id: u64,
}

fn lock(table: &Mutex<RouteTable>) -> MutexGuard<'_, RouteTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Feed source backed by an MQTT broker
pub struct MqttFeed {
    client: AsyncClient,
    table: Arc<Mutex<RouteTable>>,
    event_loop: JoinHandle<()>,
}

impl MqttFeed {
    /// Create the client and spawn its event loop
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let table: Arc<Mutex<RouteTable>> = Arc::default();
        let routes = table.clone();
        let resubscriber = client.clone();

        let event_loop = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = decode_payload(&publish.payload);
                        dispatch(&routes, &publish.topic, payload);
                    }
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("MQTT connected (session present: {})", ack.session_present);
                        if !ack.session_present {
                            let restored = resubscribe(&resubscriber, &routes);
                            if restored > 0 {
                                info!("Resubscribed to {} MQTT topics", restored);
                            }
                        }
                    }
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Err(e) => {
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        info!("MQTT feed connecting to {}:{}", config.host, config.port);
        Self {
            client,
            table,
            event_loop,
        }
    }
}

impl Drop for MqttFeed {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

/// JSON if possible, otherwise the payload as text
fn decode_payload(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Queue a subscribe for every routed topic; returns how many were queued
fn resubscribe(client: &AsyncClient, table: &Mutex<RouteTable>) -> usize {
    let topics: Vec<String> = lock(table).routes.keys().cloned().collect();
    topics
        .into_iter()
        .filter(|topic| match client.try_subscribe(topic.clone(), QoS::AtLeastOnce) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to resubscribe to MQTT topic '{}': {}", topic, e);
                false
            }
        })
        .count()
}

fn dispatch(table: &Mutex<RouteTable>, topic: &str, payload: Value) {
    let mut table = lock(table);
    match table.routes.get_mut(topic) {
        Some(subscribers) => {
            subscribers.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        }
        None => debug!("Dropping message on unrouted topic '{}'", topic),
    }
}

#[async_trait]
impl FeedSource for MqttFeed {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn subscribe(&self, channel: &str) -> Result<RawSubscription, FeedError> {
        self.client
            .subscribe(channel, QoS::AtLeastOnce)
            .await
            .map_err(|e| FeedError::Subscribe {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut table = lock(&self.table);
            table.next_id += 1;
            let id = table.next_id;
            table.routes.entry(channel.to_string()).or_default().push((id, tx));
            id
        };
        info!("Subscribed to MQTT topic '{}'", channel);

        let table = self.table.clone();
        let client = self.client.clone();
        let topic = channel.to_string();
        let canceller = Canceller::new(move || {
            let now_empty = {
                let mut table = lock(&table);
                let subscribers = table.routes.entry(topic.clone()).or_default();
                subscribers.retain(|(sub_id, _)| *sub_id != id);
                let empty = subscribers.is_empty();
                if empty {
                    table.routes.remove(&topic);
                }
                empty
            };
            if now_empty {
                if let Err(e) = client.try_unsubscribe(topic.clone()) {
                    warn!("Failed to unsubscribe from MQTT topic '{}': {}", topic, e);
                }
            }
        });

        Ok(RawSubscription::new(channel, rx, canceller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload(br#"{"tds": 300}"#), json!({"tds": 300}));
        assert_eq!(decode_payload(b"24.5"), json!(24.5));
        assert_eq!(decode_payload(b"low"), json!("low"));
    }

    #[test]
    fn test_dispatch_routes_by_topic() {
        let table = Mutex::new(RouteTable::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        table.lock().unwrap().routes.insert("water/tds".to_string(), vec![(1, tx)]);

        dispatch(&table, "water/tds", json!(310));
        dispatch(&table, "water/temp", json!(20));

        assert_eq!(rx.try_recv().unwrap(), json!(310));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resubscribe_covers_every_routed_topic() {
        let (client, _eventloop) = AsyncClient::new(MqttOptions::new("aqualog-test", "localhost", 1883), 16);
        let table = Mutex::new(RouteTable::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        {
            let mut routes = table.lock().unwrap();
            routes.routes.insert("Temperature".to_string(), vec![(1, tx.clone())]);
            routes.routes.insert("TDS".to_string(), vec![(2, tx)]);
        }

        assert_eq!(resubscribe(&client, &table), 2);
        assert_eq!(resubscribe(&client, &Mutex::new(RouteTable::default())), 0);
    }

    #[test]
    fn test_default_config() {
        let config = MqttConfig::default();
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive_secs, 30);
    }
}
