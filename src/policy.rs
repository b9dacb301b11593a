use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    identity::{AccessState, IdentitySignal},
    route_class::{PENDING_APPROVAL_PATH, RouteClass, RouteTable, normalize_path},
};

/// RedirectTarget
///
/// The only places a denied request is ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    Login,
    AdminHome,
    TrainerHome,
    PendingApproval,
}

impl RedirectTarget {
    pub const ALL: [RedirectTarget; 4] = [
        RedirectTarget::Login,
        RedirectTarget::AdminHome,
        RedirectTarget::TrainerHome,
        RedirectTarget::PendingApproval,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::Login => "/login",
            RedirectTarget::AdminHome => "/admin",
            RedirectTarget::TrainerHome => "/",
            RedirectTarget::PendingApproval => PENDING_APPROVAL_PATH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    Deny(RedirectTarget),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// decide
///
/// The access table. Total over `AccessState x RouteClass`; the policy only branches on
/// active versus non-active trainers, so pending, suspended and rejected share a row.
///
/// Anonymous visitors on the pending page are sent to login; admins may view it.
pub fn decide(state: AccessState, class: RouteClass) -> Decision {
    use AccessState::*;
    use RouteClass::*;

    match (state, class) {
        (_, Public) => Decision::Allow,

        (Anonymous, AuthOnly) => Decision::Allow,
        (Anonymous, AdminArea | TrainerArea | PendingPage) => {
            Decision::Deny(RedirectTarget::Login)
        }

        (Admin, AuthOnly) => Decision::Deny(RedirectTarget::AdminHome),
        (Admin, AdminArea | TrainerArea | PendingPage) => Decision::Allow,

        (TrainerActive, TrainerArea) => Decision::Allow,
        (TrainerActive, AuthOnly | AdminArea | PendingPage) => {
            Decision::Deny(RedirectTarget::TrainerHome)
        }

        (TrainerPending | TrainerSuspended | TrainerRejected, PendingPage) => Decision::Allow,
        (TrainerPending | TrainerSuspended | TrainerRejected, TrainerArea) => {
            Decision::Deny(RedirectTarget::PendingApproval)
        }
        (TrainerPending | TrainerSuspended | TrainerRejected, AuthOnly | AdminArea) => {
            Decision::Deny(RedirectTarget::TrainerHome)
        }
    }
}

/// AccessDecision
///
/// The wire form of a verdict, shared by the edge guard and the client evaluation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessDecision {
    pub allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub redirect: Option<String>,
}

impl From<Decision> for AccessDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow => Self {
                allow: true,
                redirect: None,
            },
            Decision::Deny(target) => Self {
                allow: false,
                redirect: Some(target.path().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("redirect target {target} for {state:?} is itself denied (classified as {class:?})")]
    RedirectLoop {
        state: AccessState,
        target: &'static str,
        class: RouteClass,
    },
}

/// AccessPolicy
///
/// A route table paired with the access table. Construction proves that no redirect
/// produced under this table can itself be denied, so a misconfigured route list is
/// rejected at startup instead of looping in a browser.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    routes: RouteTable,
}

impl AccessPolicy {
    pub fn new(routes: RouteTable) -> Result<Self, PolicyError> {
        let policy = Self { routes };
        policy.verify_loop_free()?;
        Ok(policy)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn classify(&self, raw_path: &str) -> RouteClass {
        self.routes.classify(raw_path)
    }

    pub fn decide_path(&self, state: AccessState, raw_path: &str) -> Decision {
        decide(state, self.routes.classify_normalized(&normalize_path(raw_path)))
    }

    /// evaluate
    ///
    /// The single entry point for both evaluation points. Pure: the same signal and path
    /// always produce the same verdict.
    pub fn evaluate(&self, signal: &IdentitySignal, raw_path: &str) -> AccessDecision {
        self.decide_path(signal.state(), raw_path).into()
    }

    fn verify_loop_free(&self) -> Result<(), PolicyError> {
        for state in AccessState::ALL {
            for class in RouteClass::ALL {
                if let Decision::Deny(target) = decide(state, class) {
                    let target_class = self.routes.classify(target.path());
                    if !decide(state, target_class).is_allow() {
                        return Err(PolicyError::RedirectLoop {
                            state,
                            target: target.path(),
                            class: target_class,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        // The standard table is loop-free by construction; see `decide`.
        Self {
            routes: RouteTable::standard(),
        }
    }
}

/// Where an identity lands after signing in, and where the dashboard sends it "home".
pub fn home_for(state: AccessState) -> RedirectTarget {
    match state {
        AccessState::Anonymous => RedirectTarget::Login,
        AccessState::Admin => RedirectTarget::AdminHome,
        AccessState::TrainerActive => RedirectTarget::TrainerHome,
        AccessState::TrainerPending | AccessState::TrainerSuspended | AccessState::TrainerRejected => {
            RedirectTarget::PendingApproval
        }
    }
}
