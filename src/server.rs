//! Decision server: one worker thread that owns the bandit.
//!
//! Concurrency model: the bandit is **moved** into the worker on
//! [`DecisionServer::start`] and moved back out on [`DecisionServer::stop`].
//! While the server runs, the worker is the only code that can touch the
//! model or the history — single-writer by ownership, no locks — and callers
//! interact purely through the channels.
//!
//! The worker blocks on the inbound channel with a bounded timeout so the
//! cooperative stop flag is observed within [`ServerConfig::poll_timeout`].
//! Malformed or unserviceable requests are answered with an outbound
//! [`OutboundMessage::Error`] and processing continues; no message terminates
//! the worker.
//!
//! The message enums serialize to the wire protocol directly:
//!
//! ```rust
//! use armax::InboundMessage;
//!
//! let msg: InboundMessage =
//!     serde_json::from_str(r#"{"type":"context","context":[1.0,0.0]}"#).unwrap();
//! assert_eq!(msg, InboundMessage::Context { context: vec![1.0, 0.0] });
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ContextualBandit, Error};

/// Requests accepted by the decision worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Ask for a decision for this global context.
    Context { context: Vec<f64> },
    /// Attribute a reward.  Without `idx` the most recent decision is used.
    Reward {
        reward: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idx: Option<usize>,
    },
    /// Any unrecognized message tag deserializes here and is answered with an
    /// error instead of killing the worker.
    #[serde(other)]
    Unknown,
}

/// Responses published by the decision worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Decision for a `Context` request.
    InferResult { arm: String, idx: usize },
    /// Non-fatal processing error; the worker keeps running.
    Error { detail: String },
}

/// Configuration for [`DecisionServer`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServerConfig {
    /// How long one blocking receive waits before re-checking the stop flag.
    /// Bounds the worst-case shutdown latency.
    pub poll_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(50),
        }
    }
}

/// Server lifecycle.  `Stopped` is terminal; a server never restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    Running,
    Stopped,
}

/// Wraps a [`ContextualBandit`] behind inbound/outbound channels.
pub struct DecisionServer {
    cfg: ServerConfig,
    state: ServerState,
    bandit: Option<ContextualBandit>,
    inbound: Option<Receiver<InboundMessage>>,
    outbound: Option<Sender<OutboundMessage>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<ContextualBandit>>,
}

impl DecisionServer {
    /// Wrap a bandit.  The caller keeps the inbound `Sender` and the outbound
    /// `Receiver`; this side consumes requests and publishes responses.
    pub fn new(
        bandit: ContextualBandit,
        inbound: Receiver<InboundMessage>,
        outbound: Sender<OutboundMessage>,
        cfg: ServerConfig,
    ) -> Self {
        Self {
            cfg,
            state: ServerState::NotStarted,
            bandit: Some(bandit),
            inbound: Some(inbound),
            outbound: Some(outbound),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Spawn the worker thread, handing it ownership of the bandit.
    ///
    /// Valid only from `NotStarted`: a running server rejects a second start
    /// and a stopped server never restarts.
    pub fn start(&mut self) -> Result<(), Error> {
        match self.state {
            ServerState::Running => return Err(Error::AlreadyStarted),
            ServerState::Stopped => return Err(Error::AlreadyStopped),
            ServerState::NotStarted => {}
        }
        let (Some(bandit), Some(inbound), Some(outbound)) = (
            self.bandit.take(),
            self.inbound.take(),
            self.outbound.take(),
        ) else {
            return Err(Error::AlreadyStarted);
        };
        let stop = Arc::clone(&self.stop);
        let poll = self.cfg.poll_timeout;
        let handle = thread::Builder::new()
            .name("armax-decision".to_string())
            .spawn(move || worker_loop(bandit, inbound, outbound, stop, poll))?;
        self.worker = Some(handle);
        self.state = ServerState::Running;
        info!("decision server started");
        Ok(())
    }

    /// Request shutdown, join the worker, and hand the bandit back.
    ///
    /// The worker notices the flag within one poll timeout.  Stopping a
    /// server that never started returns the untouched bandit.
    pub fn stop(&mut self) -> Result<ContextualBandit, Error> {
        match self.state {
            ServerState::Stopped => Err(Error::AlreadyStopped),
            ServerState::NotStarted => {
                self.state = ServerState::Stopped;
                self.bandit.take().ok_or(Error::AlreadyStopped)
            }
            ServerState::Running => {
                self.stop.store(true, Ordering::SeqCst);
                let handle = self.worker.take().ok_or(Error::AlreadyStopped)?;
                self.state = ServerState::Stopped;
                let bandit = handle.join().map_err(|_| Error::WorkerPanicked)?;
                info!("decision server stopped");
                Ok(bandit)
            }
        }
    }
}

fn worker_loop(
    mut bandit: ContextualBandit,
    inbound: Receiver<InboundMessage>,
    outbound: Sender<OutboundMessage>,
    stop: Arc<AtomicBool>,
    poll: Duration,
) -> ContextualBandit {
    info!("decision worker running");
    let mut last_decision: Option<usize> = None;
    while !stop.load(Ordering::SeqCst) {
        match inbound.recv_timeout(poll) {
            Ok(msg) => handle_message(&mut bandit, msg, &mut last_decision, &outbound),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Every sender is gone: no request can ever arrive again.
                debug!("inbound channel closed; worker exiting");
                break;
            }
        }
    }
    info!(decisions = bandit.history().len(), "decision worker exiting");
    bandit
}

fn handle_message(
    bandit: &mut ContextualBandit,
    msg: InboundMessage,
    last_decision: &mut Option<usize>,
    outbound: &Sender<OutboundMessage>,
) {
    match msg {
        InboundMessage::Context { context } => match bandit.infer_with_context(&context) {
            Ok((arm, idx)) => {
                *last_decision = Some(idx);
                debug!(idx, arm = %arm, "inference served");
                publish(outbound, OutboundMessage::InferResult { arm, idx });
            }
            Err(e) => publish_error(outbound, format!("inference failed: {e}")),
        },
        InboundMessage::Reward { reward, idx } => {
            let Some(target) = idx.or(*last_decision) else {
                publish_error(outbound, "reward arrived but no decision index".to_string());
                return;
            };
            match bandit.give_reward(target, reward) {
                Ok(()) => debug!(idx = target, reward, "reward applied"),
                Err(e) => publish_error(outbound, format!("reward failed: {e}")),
            }
        }
        InboundMessage::Unknown => {
            publish_error(outbound, "unknown message type".to_string());
        }
    }
}

fn publish(outbound: &Sender<OutboundMessage>, msg: OutboundMessage) {
    if outbound.send(msg).is_err() {
        debug!("outbound receiver dropped; response discarded");
    }
}

fn publish_error(outbound: &Sender<OutboundMessage>, detail: String) {
    warn!(%detail, "request not serviced");
    publish(outbound, OutboundMessage::Error { detail });
}
