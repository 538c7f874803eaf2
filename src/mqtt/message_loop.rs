//! Background network processing for an open broker session.
//!
//! rumqttc only moves bytes while its [`Connection`] is being polled. The
//! [`MessageLoop`] hands the connection to a dedicated thread that keeps
//! polling it (pings, flushing queued publishes, the final DISCONNECT) until
//! the session ends or the loop is stopped. The UI thread never blocks on it.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rumqttc::{Connection, Event, Outgoing, RecvTimeoutError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::ProtocolError;

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Timing of the loop thread.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Longest a single poll may block before the thread checks for cancellation
    pub tick: Duration,
    /// How long a graceful stop waits for the session to wind down on its own
    pub drain_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the loop thread. At most one loop runs at a time.
pub struct MessageLoop {
    settings: LoopSettings,
    running: Option<RunningLoop>,
}

impl MessageLoop {
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            settings,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts polling `connection` on a new thread and returns immediately.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::LoopRunning`] if a loop is already active,
    /// [`ProtocolError::Spawn`] if the thread cannot be created.
    pub fn start(&mut self, connection: Connection) -> Result<(), ProtocolError> {
        if self.running.is_some() {
            error!("Message loop start requested while it is already running");
            return Err(ProtocolError::LoopRunning);
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tick = self.settings.tick;
        let handle = thread::Builder::new()
            .name("mqtt-loop".into())
            .spawn(move || run_loop(connection, token, tick))
            .map_err(ProtocolError::Spawn)?;

        debug!("Spawned message loop thread with tick {:?}", tick);
        self.running = Some(RunningLoop { cancel, handle });
        Ok(())
    }

    /// Stops the loop and joins its thread.
    ///
    /// Without `force` the thread first gets `drain_timeout` to finish by
    /// itself, which it does once a pending DISCONNECT has been written out.
    /// With `force` it is cancelled right away.
    pub fn stop(&mut self, force: bool) -> Result<(), ProtocolError> {
        let Some(running) = self.running.take() else {
            error!("Message loop stop requested while it is not running");
            return Err(ProtocolError::LoopNotRunning);
        };

        if !force {
            let deadline = Instant::now() + self.settings.drain_timeout;
            while !running.handle.is_finished() && Instant::now() < deadline {
                thread::sleep(DRAIN_POLL);
            }
            if !running.handle.is_finished() {
                warn!(
                    "Message loop still busy after {:?}, cancelling it",
                    self.settings.drain_timeout
                );
            }
        }

        running.cancel.cancel();
        running
            .handle
            .join()
            .map_err(|_| ProtocolError::LoopPanicked)?;
        info!("Message loop stopped (force: {})", force);
        Ok(())
    }
}

impl Drop for MessageLoop {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if running.handle.join().is_err() {
                warn!("Message loop thread panicked during drop");
            }
        }
    }
}

fn run_loop(mut connection: Connection, cancel: CancellationToken, tick: Duration) {
    info!("Message loop running");

    while !cancel.is_cancelled() {
        match connection.recv_timeout(tick) {
            Ok(Ok(Event::Outgoing(Outgoing::Disconnect))) => {
                info!("Disconnect sent, message loop ending");
                break;
            }
            Ok(Ok(event)) => debug!("MQTT event: {:?}", event),
            Ok(Err(e)) => {
                // rumqttc reconnects on the next poll; don't spin on a dead broker
                warn!("MQTT connection error: {}", e);
                thread::sleep(tick);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("Client handle dropped, message loop ending");
                break;
            }
        }
    }

    debug!("Message loop thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{Client, MqttOptions};

    fn fast_settings() -> LoopSettings {
        LoopSettings {
            tick: Duration::from_millis(50),
            drain_timeout: Duration::from_millis(100),
        }
    }

    /// A connection pointed at a port nobody listens on; polling it only yields errors.
    fn idle_connection() -> (Client, Connection) {
        Client::new(MqttOptions::new("loop-test", "127.0.0.1", 1), 10)
    }

    #[test]
    fn test_stop_without_start_fails() {
        let mut driver = MessageLoop::new(fast_settings());
        assert!(matches!(
            driver.stop(true),
            Err(ProtocolError::LoopNotRunning)
        ));
    }

    #[test]
    fn test_start_twice_fails() {
        let (_client, first) = idle_connection();
        let (_other, second) = idle_connection();
        let mut driver = MessageLoop::new(fast_settings());

        driver.start(first).unwrap();
        assert!(matches!(
            driver.start(second),
            Err(ProtocolError::LoopRunning)
        ));
        assert!(driver.is_running());

        driver.stop(true).unwrap();
        assert!(!driver.is_running());
    }

    #[test]
    fn test_graceful_stop_falls_back_to_cancel() {
        let (_client, connection) = idle_connection();
        let mut driver = MessageLoop::new(fast_settings());

        driver.start(connection).unwrap();
        driver.stop(false).unwrap();
        assert!(!driver.is_running());
        assert!(matches!(
            driver.stop(false),
            Err(ProtocolError::LoopNotRunning)
        ));
    }
}
