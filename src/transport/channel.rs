//! Websocket client with fixed-delay reconnect.
//!
//! The socket lives on a dedicated thread running its own tokio runtime. The
//! UI side talks to it through [`TransportChannel`] and receives
//! [`TransportEvent`]s over a std `mpsc` channel, drained once per frame.

use std::pin::Pin;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::status::ConnectionState;

use super::policy::{ReconnectPolicy, RetryBudget};

/// Called after every event so an idle UI wakes up.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

/// What the transport reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    StateChanged(ConnectionState),
    ReconnectScheduled { attempt: u32, delay: Duration },
    RetriesExhausted { attempts: u32 },
    /// One text frame, undecoded.
    Frame(String),
    FrameDropped { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Connect,
    Disconnect,
    Shutdown,
}

/// Handle to the transport thread. Dropping it shuts the thread down.
pub struct TransportChannel {
    url: String,
    commands: UnboundedSender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TransportChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportChannel")
            .field("url", &self.url)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl TransportChannel {
    /// Start the transport thread. Nothing is dialled until [`connect`](Self::connect).
    pub fn spawn(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        events: Sender<TransportEvent>,
        notify: Option<Notifier>,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;
        let (tx, rx) = unbounded_channel();
        let driver = Driver {
            url: url.clone(),
            budget: RetryBudget::new(policy),
            commands: rx,
            sink: EventSink { tx: events, notify },
            reconnect: ReconnectTimer::default(),
        };
        info!(%url, policy = %policy.describe(), "transport ready");
        let worker = std::thread::Builder::new()
            .name("echemplot-transport".into())
            .spawn(move || runtime.block_on(driver.run()))
            .map_err(TransportError::Runtime)?;
        Ok(Self {
            url,
            commands: tx,
            worker: Some(worker),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the socket. Also cancels a pending reconnect and refills the retry budget.
    pub fn connect(&self) -> Result<(), TransportError> {
        self.send(Command::Connect)
    }

    /// Close the socket deliberately; no reconnect follows.
    pub fn disconnect(&self) -> Result<(), TransportError> {
        self.send(Command::Disconnect)
    }

    fn send(&self, command: Command) -> Result<(), TransportError> {
        self.commands.send(command).map_err(|_| TransportError::Closed)
    }

    /// Stop the thread and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("transport thread panicked");
            }
        }
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

struct EventSink {
    tx: Sender<TransportEvent>,
    notify: Option<Notifier>,
}

impl EventSink {
    /// `false` once the receiving side is gone.
    fn emit(&self, event: TransportEvent) -> bool {
        let delivered = self.tx.send(event).is_ok();
        if let Some(notify) = &self.notify {
            notify();
        }
        delivered
    }

    fn state(&self, state: ConnectionState) -> bool {
        self.emit(TransportEvent::StateChanged(state))
    }
}

/// At most one pending reconnect. Dropping the timer cancels it.
#[derive(Default)]
struct ReconnectTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    fn arm(&mut self, delay: Duration) -> bool {
        if self.is_pending() {
            return false;
        }
        self.sleep = Some(Box::pin(tokio::time::sleep(delay)));
        true
    }

    fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    /// Resolves when the armed timer fires; never resolves while disarmed.
    async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending::<()>().await,
        }
        self.sleep = None;
    }
}

enum Wake {
    Command(Command),
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Closed on request.
    Deliberate,
    /// Refused, dropped, or closed by the peer.
    Abnormal,
    Shutdown,
}

struct Driver {
    url: String,
    budget: RetryBudget,
    commands: UnboundedReceiver<Command>,
    sink: EventSink,
    reconnect: ReconnectTimer,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                cmd = self.commands.recv() => Wake::Command(cmd.unwrap_or(Command::Shutdown)),
                _ = self.reconnect.fired() => Wake::Timer,
            };
            let end = match wake {
                Wake::Command(Command::Shutdown) => break,
                Wake::Command(Command::Disconnect) => {
                    if self.reconnect.cancel() {
                        debug!("pending reconnect cancelled");
                    }
                    self.budget.reset();
                    continue;
                }
                Wake::Command(Command::Connect) => {
                    self.reconnect.cancel();
                    self.budget.reset();
                    self.session().await
                }
                Wake::Timer => self.session().await,
            };
            match end {
                SessionEnd::Deliberate => {}
                SessionEnd::Abnormal => self.schedule_reconnect(),
                SessionEnd::Shutdown => break,
            }
        }
        self.reconnect.cancel();
        debug!(url = %self.url, "transport stopped");
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect.is_pending() {
            return;
        }
        match self.budget.next_attempt() {
            Some((attempt, delay)) => {
                self.reconnect.arm(delay);
                info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                self.sink
                    .emit(TransportEvent::ReconnectScheduled { attempt, delay });
            }
            None => {
                let attempts = self.budget.attempts();
                warn!(attempts, url = %self.url, "giving up on reconnect");
                self.sink.emit(TransportEvent::RetriesExhausted { attempts });
            }
        }
    }

    /// One connection from dial to close.
    async fn session(&mut self) -> SessionEnd {
        self.sink.state(ConnectionState::Connecting);

        let timeout = self.budget.policy().dial_timeout;
        let dial = tokio::time::timeout(
            timeout,
            tokio_tungstenite::connect_async(self.url.as_str()),
        );
        tokio::pin!(dial);
        let dialled = loop {
            tokio::select! {
                res = &mut dial => break res,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Connect) => continue,
                    Some(Command::Disconnect) => {
                        self.budget.reset();
                        self.sink.state(ConnectionState::Disconnected);
                        return SessionEnd::Deliberate;
                    }
                    Some(Command::Shutdown) | None => {
                        self.sink.state(ConnectionState::Disconnected);
                        return SessionEnd::Shutdown;
                    }
                },
            }
        };
        let dialled = match dialled {
            Ok(res) => res.map_err(TransportError::from),
            Err(_elapsed) => Err(TransportError::DialTimeout(timeout)),
        };
        let mut ws = match dialled {
            Ok((ws, _response)) => ws,
            Err(e) => {
                warn!(url = %self.url, error = %e, "connect failed");
                self.sink.state(ConnectionState::Disconnected);
                return SessionEnd::Abnormal;
            }
        };

        self.budget.reset();
        self.sink.state(ConnectionState::Connected);

        let end = loop {
            tokio::select! {
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !self.sink.emit(TransportEvent::Frame(text.as_str().to_owned())) {
                            break SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if !self.sink.emit(TransportEvent::Frame(text)) {
                                break SessionEnd::Shutdown;
                            }
                        }
                        Err(e) => {
                            warn!(len = bytes.len(), error = %e.utf8_error(), "dropping binary frame");
                            self.sink.emit(TransportEvent::FrameDropped {
                                reason: "binary frame is not UTF-8".to_string(),
                            });
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "server closed the connection");
                        break SessionEnd::Abnormal;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "connection lost");
                        break SessionEnd::Abnormal;
                    }
                    None => {
                        warn!("connection ended without close frame");
                        break SessionEnd::Abnormal;
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Connect) => {}
                    Some(Command::Disconnect) => {
                        self.budget.reset();
                        break SessionEnd::Deliberate;
                    }
                    Some(Command::Shutdown) | None => break SessionEnd::Shutdown,
                },
            }
        };

        if end != SessionEnd::Abnormal {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "close handshake failed");
            }
        }
        self.sink.state(ConnectionState::Disconnected);
        end
    }
}
