//! Link liveness supervision (t3).
//!
//! [`LinkState`] records the last activity on a connection. It is shared
//! between the transport, which refreshes it on inbound frames, and the
//! [`LinkSupervisor`], which sends a test frame once the
//! link has been silent for longer than t3.
//!
//! Sending the test frame counts as activity. No reply is awaited, so a
//! link that only fails in the receive direction produces one test frame
//! per t3 period and nothing more.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn, Span};

use crate::dispatch::CommandDispatcher;
use crate::transport::Transport;

/// Per-connection activity tracking.
#[derive(Debug, Clone)]
pub struct LinkState {
    last_activity: Arc<Mutex<Instant>>,
    timeout: Duration,
}

impl LinkState {
    /// Create link state with the given t3 timeout, starting now.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_activity: Arc::new(Mutex::new(Instant::now())),
            timeout,
        }
    }

    /// Record activity at the current instant.
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Restart tracking, used when a connection is (re)established.
    pub fn reset(&self) {
        self.touch();
    }

    /// Instant of the last recorded activity.
    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Time since the last recorded activity.
    pub fn idle(&self) -> Duration {
        self.last_activity().elapsed()
    }

    /// The t3 timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the link has been silent for longer than t3.
    pub fn is_expired(&self) -> bool {
        self.idle() > self.timeout
    }
}

/// Supervision state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    /// Activity seen within t3
    #[default]
    Alive,
    /// t3 elapsed and the test frame could not be sent
    Suspect,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alive => f.write_str("alive"),
            Self::Suspect => f.write_str("suspect"),
        }
    }
}

/// Sends a test frame whenever the link has been idle for longer than t3.
pub struct LinkSupervisor<T: Transport> {
    link: LinkState,
    dispatcher: Arc<CommandDispatcher<T>>,
    status: LinkStatus,
    span: Span,
}

impl<T: Transport> LinkSupervisor<T> {
    /// Create a supervisor for `link`, probing through `dispatcher`.
    pub fn new(link: LinkState, dispatcher: Arc<CommandDispatcher<T>>, span: Span) -> Self {
        Self {
            link,
            dispatcher,
            status: LinkStatus::Alive,
            span,
        }
    }

    /// Current supervision state.
    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Shared link state.
    pub fn link(&self) -> &LinkState {
        &self.link
    }

    /// Check the link and send a test frame if t3 has elapsed.
    ///
    /// Does nothing before the timeout. Otherwise the link turns suspect,
    /// one test frame is sent, and a successful send returns it to alive
    /// with the activity timestamp reset.
    pub async fn check(&mut self) -> LinkStatus {
        if !self.link.is_expired() {
            return self.status;
        }

        let idle = self.link.idle();
        self.status = LinkStatus::Suspect;
        info!(
            parent: &self.span,
            idle_secs = idle.as_secs(),
            "Link timeout ({}s), sending test frame",
            self.link.timeout().as_secs()
        );

        match self.dispatcher.send_test_frame().await {
            Ok(()) => {
                self.status = LinkStatus::Alive;
                debug!(parent: &self.span, "Link activity reset by test frame");
            }
            Err(e) => {
                warn!(parent: &self.span, error = %e, "Link remains suspect");
            }
        }
        self.status
    }

    /// Mark the link alive again, used on (re)connect.
    pub fn reset(&mut self) {
        self.link.reset();
        self.status = LinkStatus::Alive;
    }
}
