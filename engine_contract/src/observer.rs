//! Session observer contract and the events engines deliver to it.
//!
//! Observers are a tagged capability: each declares the `ObserverKind`
//! it listens to and the engine only delivers events of that kind.
//! Observers read events; they never see or touch working memory.

use serde::Serialize;
use serde_json::Value;

use crate::domain::ObserverKind;

/// Engine activity visible to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    // -- agenda --
    MatchCreated { rule: String },
    MatchCancelled { rule: String },
    BeforeMatchFired { rule: String },
    AfterMatchFired { rule: String },
    AgendaGroupPushed { group: String },
    AgendaGroupPopped { group: String },
    BeforeDecisionEvaluated { decision: String },
    AfterDecisionEvaluated { decision: String, value: Value },

    // -- working memory --
    FactInserted { name: String, value: Value },
    FactUpdated {
        name: String,
        rule: Option<String>,
        value: Value,
    },
    FactDeleted { name: String, value: Value },

    // -- process --
    ProcessStarted { process: String },
    ProcessCompleted { process: String },
    NodeTriggered { process: String, node: String },
    NodeLeft { process: String, node: String },
    VariableChanged {
        process: String,
        variable: String,
        old_value: Value,
        new_value: Value,
    },
}

impl SessionEvent {
    /// The observer kind this event is delivered to.
    pub fn kind(&self) -> ObserverKind {
        match self {
            SessionEvent::MatchCreated { .. }
            | SessionEvent::MatchCancelled { .. }
            | SessionEvent::BeforeMatchFired { .. }
            | SessionEvent::AfterMatchFired { .. }
            | SessionEvent::AgendaGroupPushed { .. }
            | SessionEvent::AgendaGroupPopped { .. }
            | SessionEvent::BeforeDecisionEvaluated { .. }
            | SessionEvent::AfterDecisionEvaluated { .. } => ObserverKind::Agenda,
            SessionEvent::FactInserted { .. }
            | SessionEvent::FactUpdated { .. }
            | SessionEvent::FactDeleted { .. } => ObserverKind::WorkingMemory,
            SessionEvent::ProcessStarted { .. }
            | SessionEvent::ProcessCompleted { .. }
            | SessionEvent::NodeTriggered { .. }
            | SessionEvent::NodeLeft { .. }
            | SessionEvent::VariableChanged { .. } => ObserverKind::Process,
        }
    }
}

/// Observer attached to a session.
///
/// `on_event` is infallible: an observer must not fail or panic into the
/// engine. The adaptor wraps its diagnostic observers so failures are
/// caught and reported on the diagnostics channel instead.
pub trait SessionObserver: Send + Sync {
    fn kind(&self) -> ObserverKind;

    fn on_event(&self, event: &SessionEvent);
}
