//! Client-side evaluation point.
//!
//! The reference implementation of the guard a dashboard client runs in-process:
//! it subscribes to its identity provider's session feed and re-evaluates the current
//! page on every change. Nothing on the server publishes here; the server's side of
//! the same contract is `POST /api/access/evaluate` and `POST /api/session/refresh`,
//! both driven by the same [`AccessPolicy`].

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    identity::IdentitySignal,
    policy::{AccessPolicy, Decision},
};

/// SessionResolution
///
/// Where the identity provider is in resolving the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResolution {
    Resolving,
    Resolved(IdentitySignal),
}

/// GuardView
///
/// What a client-side page should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Session still resolving: render a neutral placeholder, not the page.
    Loading,
    Render,
    Redirect(String),
}

/// SessionFeed
///
/// The identity provider's side of the "current session changed" stream. Starts out
/// `Resolving`; every publish wakes all subscribed guards.
pub struct SessionFeed {
    tx: watch::Sender<SessionResolution>,
}

impl Default for SessionFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionResolution::Resolving);
        Self { tx }
    }

    pub fn publish(&self, signal: IdentitySignal) {
        self.tx.send_replace(SessionResolution::Resolved(signal));
    }

    pub fn sign_out(&self) {
        self.publish(IdentitySignal::anonymous());
    }

    /// Back to `Resolving`, e.g. while a refresh is in flight.
    pub fn begin_refresh(&self) {
        self.tx.send_replace(SessionResolution::Resolving);
    }

    pub fn current(&self) -> SessionResolution {
        *self.tx.borrow()
    }

    pub fn subscribe(&self, policy: Arc<AccessPolicy>) -> ClientGuard {
        ClientGuard {
            rx: self.tx.subscribe(),
            policy,
        }
    }
}

/// ClientGuard
///
/// The client evaluation point. Shares the exact policy used at the edge, so both
/// points agree for the same signal and path.
pub struct ClientGuard {
    rx: watch::Receiver<SessionResolution>,
    policy: Arc<AccessPolicy>,
}

impl ClientGuard {
    /// view
    ///
    /// Never evaluates the policy while the session is still resolving.
    pub fn view(&self, path: &str) -> GuardView {
        let resolution = *self.rx.borrow();
        Self::view_for(&self.policy, resolution, path)
    }

    /// next_view
    ///
    /// Waits for the next session change and returns the resulting view.
    /// `None` once the feed has been dropped.
    pub async fn next_view(&mut self, path: &str) -> Option<GuardView> {
        self.rx.changed().await.ok()?;
        let resolution = *self.rx.borrow_and_update();
        Some(Self::view_for(&self.policy, resolution, path))
    }

    fn view_for(policy: &AccessPolicy, resolution: SessionResolution, path: &str) -> GuardView {
        match resolution {
            SessionResolution::Resolving => GuardView::Loading,
            SessionResolution::Resolved(signal) => {
                match policy.decide_path(signal.state(), path) {
                    Decision::Allow => GuardView::Render,
                    Decision::Deny(target) => GuardView::Redirect(target.path().to_string()),
                }
            }
        }
    }
}
