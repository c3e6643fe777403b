// ── MQTT publish transport ──
//
// `rumqttc` client plus a background task that drives its event loop.
// Publishes are QoS 1; a message counts as pending from `enqueue` until
// the broker acknowledges it, which is what the shutdown drain waits on.
// Enqueueing never waits: with the broker gone and the request queue
// full, a publish fails instead of stalling the poll cycle.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MqttSettings;
use crate::error::CoreError;
use crate::publish::PublishSink;

const REQUEST_CAPACITY: usize = 100;
const RECONNECT_PAUSE: Duration = Duration::from_secs(5);
const EVENT_LOOP_EXIT_TIMEOUT: Duration = Duration::from_secs(2);
const QOS: QoS = QoS::AtLeastOnce;

/// Publish sink backed by an MQTT broker connection.
///
/// The connection is (re)established lazily by the event-loop task;
/// `start` does not wait for the broker to be reachable.
pub struct MqttPublisher {
    client: AsyncClient,
    in_flight: Arc<AtomicUsize>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttPublisher {
    /// Create the client and spawn its event loop. Must be called inside a
    /// tokio runtime.
    pub fn start(settings: &MqttSettings) -> Self {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(settings.keep_alive);
        if let Some(username) = &settings.username {
            let password = settings
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_owned())
                .unwrap_or_default();
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        info!(
            host = %settings.host,
            port = settings.port,
            client_id = %settings.client_id,
            "starting MQTT client"
        );

        let task = tokio::spawn(drive_event_loop(
            event_loop,
            Arc::clone(&in_flight),
            cancel.clone(),
        ));

        Self {
            client,
            in_flight,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }
}

impl PublishSink for MqttPublisher {
    async fn enqueue(&self, topic: &str, payload: String, retain: bool) -> Result<(), CoreError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.client.try_publish(topic, QOS, retain, payload) {
            release(&self.in_flight);
            return Err(CoreError::Publish {
                topic: topic.to_owned(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    fn pending_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        if let Err(e) = self.client.try_disconnect() {
            debug!(error = %e, "disconnect request not queued");
        }

        let task = self.task.lock().ok().and_then(|mut guard| guard.take());
        if let Some(mut task) = task {
            if tokio::time::timeout(EVENT_LOOP_EXIT_TIMEOUT, &mut task)
                .await
                .is_err()
            {
                debug!("event loop did not exit after disconnect, cancelling");
                self.cancel.cancel();
                task.abort();
            }
        }
        info!("MQTT client stopped");
    }
}

/// Saturating decrement: acks for publishes from a previous connection must
/// not wrap the counter.
fn release(in_flight: &AtomicUsize) {
    let _ = in_flight.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
}

async fn drive_event_loop(
    mut event_loop: EventLoop,
    in_flight: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = event_loop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("connected to MQTT broker"),
            Ok(Event::Incoming(Packet::PubAck(_) | Packet::PubComp(_))) => release(&in_flight),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "MQTT connection error, retrying in {}s", RECONNECT_PAUSE.as_secs());
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(RECONNECT_PAUSE) => {}
                }
            }
        }
    }
}
