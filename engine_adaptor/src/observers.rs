//! Observer registry and built-in diagnostic observers.
//!
//! Diagnostic observers may fail (return an error or panic). Every one is
//! wrapped in a guard before it reaches the engine, so a failure is logged
//! at `warn` and the batch carries on.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use engine_contract::domain::{ObserverFlags, ObserverKind};
use engine_contract::engine::EngineSession;
use engine_contract::error::ObserverError;
use engine_contract::observer::{SessionEvent, SessionObserver};

/// Tracing target for per-event diagnostic records.
pub const OBSERVER_TARGET: &str = "engine_adaptor::observer";

/// Fallible observer attached through the registry.
pub trait DiagnosticObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent) -> Result<(), ObserverError>;
}

/// Builds a diagnostic observer for one execution of the given profile id.
pub type ObserverFactory = Arc<dyn Fn(&str) -> Box<dyn DiagnosticObserver> + Send + Sync>;

// ---------------------------------------------------------------------------
// Tracing observer
// ---------------------------------------------------------------------------

/// Emits one `debug!` record per engine event.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    kind: ObserverKind,
    profile: String,
}

impl TracingObserver {
    pub fn new(kind: ObserverKind, profile: &str) -> Self {
        Self {
            kind,
            profile: profile.to_string(),
        }
    }
}

impl DiagnosticObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) -> Result<(), ObserverError> {
        let record = serde_json::to_string(event)
            .map_err(|e| ObserverError::new(self.kind, e.to_string()))?;
        debug!(
            target: OBSERVER_TARGET,
            profile = %self.profile,
            observer = %self.kind,
            event = %record,
            "{}",
            describe(event)
        );
        Ok(())
    }
}

fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::MatchCreated { rule } => format!("match created: {}", rule),
        SessionEvent::MatchCancelled { rule } => format!("match cancelled: {}", rule),
        SessionEvent::BeforeMatchFired { rule } => format!("firing rule: {}", rule),
        SessionEvent::AfterMatchFired { rule } => format!("rule fired: {}", rule),
        SessionEvent::AgendaGroupPushed { group } => format!("agenda group pushed: {}", group),
        SessionEvent::AgendaGroupPopped { group } => format!("agenda group popped: {}", group),
        SessionEvent::BeforeDecisionEvaluated { decision } => {
            format!("evaluating decision: {}", decision)
        }
        SessionEvent::AfterDecisionEvaluated { decision, value } => {
            format!("decision evaluated: {} = {}", decision, value)
        }
        SessionEvent::FactInserted { name, .. } => format!("fact inserted: {}", name),
        SessionEvent::FactUpdated {
            name,
            rule: Some(rule),
            ..
        } => format!("fact updated: {} (by {})", name, rule),
        SessionEvent::FactUpdated { name, rule: None, .. } => format!("fact updated: {}", name),
        SessionEvent::FactDeleted { name, .. } => format!("fact deleted: {}", name),
        SessionEvent::ProcessStarted { process } => format!("process started: {}", process),
        SessionEvent::ProcessCompleted { process } => format!("process completed: {}", process),
        SessionEvent::NodeTriggered { process, node } => {
            format!("node triggered: {}/{}", process, node)
        }
        SessionEvent::NodeLeft { process, node } => format!("node left: {}/{}", process, node),
        SessionEvent::VariableChanged {
            process,
            variable,
            old_value,
            new_value,
        } => format!(
            "variable changed: {}/{} {} -> {}",
            process, variable, old_value, new_value
        ),
    }
}

// ---------------------------------------------------------------------------
// Failure boundary
// ---------------------------------------------------------------------------

struct GuardedObserver {
    kind: ObserverKind,
    profile: String,
    inner: Box<dyn DiagnosticObserver>,
}

impl SessionObserver for GuardedObserver {
    fn kind(&self) -> ObserverKind {
        self.kind
    }

    fn on_event(&self, event: &SessionEvent) {
        let error = match panic::catch_unwind(AssertUnwindSafe(|| self.inner.on_event(event))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => ObserverError::new(self.kind, panic_message(payload.as_ref())),
        };
        warn!(
            profile = %self.profile,
            observer = %self.kind,
            error = %error,
            "observer failed, batch continues"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps each observer kind to the diagnostic observers attached for it.
#[derive(Clone)]
pub struct ObserverRegistry {
    factories: BTreeMap<ObserverKind, Vec<ObserverFactory>>,
}

impl ObserverRegistry {
    /// A tracing observer for every kind.
    pub fn new() -> Self {
        ObserverKind::ALL
            .iter()
            .fold(Self::empty(), |registry, &kind| {
                registry.register(kind, move |profile: &str| {
                    Box::new(TracingObserver::new(kind, profile)) as Box<dyn DiagnosticObserver>
                })
            })
    }

    /// No observers for any kind; flags attach nothing.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register<F>(mut self, kind: ObserverKind, factory: F) -> Self
    where
        F: Fn(&str) -> Box<dyn DiagnosticObserver> + Send + Sync + 'static,
    {
        self.factories
            .entry(kind)
            .or_default()
            .push(Arc::new(factory));
        self
    }

    pub fn registered(&self, kind: ObserverKind) -> usize {
        self.factories.get(&kind).map_or(0, Vec::len)
    }

    /// Attach the observers for every flagged kind. A factory that panics
    /// is logged and skipped. Returns how many were attached.
    pub fn attach(
        &self,
        flags: &ObserverFlags,
        profile_id: &str,
        session: &mut dyn EngineSession,
    ) -> usize {
        let mut attached = 0;
        for kind in flags {
            for factory in self.factories.get(kind).into_iter().flatten() {
                let inner = match panic::catch_unwind(AssertUnwindSafe(|| (**factory)(profile_id))) {
                    Ok(inner) => inner,
                    Err(payload) => {
                        let error = ObserverError::new(*kind, panic_message(payload.as_ref()));
                        warn!(
                            profile = %profile_id,
                            observer = %kind,
                            error = %error,
                            "observer not attached, batch continues"
                        );
                        continue;
                    }
                };
                session.attach_observer(Box::new(GuardedObserver {
                    kind: *kind,
                    profile: profile_id.to_string(),
                    inner,
                }));
                attached += 1;
            }
        }
        if attached > 0 {
            debug!(profile = %profile_id, attached, "observers attached");
        }
        attached
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.factories.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use engine_contract::operations::{EngineResultSet, Operation};
    use engine_contract::error::EngineError;
    use serde_json::json;

    /// Session stub that replays one event to each attached observer.
    #[derive(Default)]
    struct ReplaySession {
        observers: Vec<Box<dyn SessionObserver>>,
    }

    impl EngineSession for ReplaySession {
        fn attach_observer(&mut self, observer: Box<dyn SessionObserver>) {
            self.observers.push(observer);
        }

        fn run(&mut self, _: &[Operation]) -> Result<EngineResultSet, EngineError> {
            let event = SessionEvent::FactInserted {
                name: "age".to_string(),
                value: json!(30),
            };
            for observer in &self.observers {
                observer.on_event(&event);
            }
            Ok(EngineResultSet::default())
        }

        fn dispose(&mut self) {}
    }

    struct Failing;

    impl DiagnosticObserver for Failing {
        fn on_event(&self, _: &SessionEvent) -> Result<(), ObserverError> {
            Err(ObserverError::new(ObserverKind::WorkingMemory, "disk full"))
        }
    }

    struct Panicking;

    impl DiagnosticObserver for Panicking {
        fn on_event(&self, _: &SessionEvent) -> Result<(), ObserverError> {
            panic!("observer bug")
        }
    }

    struct Counting(Arc<Mutex<usize>>);

    impl DiagnosticObserver for Counting {
        fn on_event(&self, _: &SessionEvent) -> Result<(), ObserverError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn default_registry_covers_every_kind() {
        let registry = ObserverRegistry::new();
        for kind in ObserverKind::ALL {
            assert_eq!(registry.registered(kind), 1);
        }
    }

    #[test]
    fn no_flags_attach_nothing() {
        let mut session = ReplaySession::default();
        let attached = ObserverRegistry::new().attach(&ObserverFlags::new(), "p", &mut session);
        assert_eq!(attached, 0);
        assert!(session.observers.is_empty());
    }

    #[test]
    fn only_flagged_kinds_are_attached() {
        let mut session = ReplaySession::default();
        let flags: ObserverFlags = [ObserverKind::Process].into_iter().collect();
        assert_eq!(ObserverRegistry::new().attach(&flags, "p", &mut session), 1);
        assert_eq!(session.observers[0].kind(), ObserverKind::Process);
    }

    #[test]
    fn failures_and_panics_do_not_escape() {
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let registry = ObserverRegistry::empty()
            .register(ObserverKind::WorkingMemory, |_: &str| {
                Box::new(Failing) as Box<dyn DiagnosticObserver>
            })
            .register(ObserverKind::WorkingMemory, |_: &str| {
                Box::new(Panicking) as Box<dyn DiagnosticObserver>
            })
            .register(ObserverKind::WorkingMemory, move |_: &str| {
                Box::new(Counting(counter.clone())) as Box<dyn DiagnosticObserver>
            });

        let mut session = ReplaySession::default();
        let flags: ObserverFlags = [ObserverKind::WorkingMemory].into_iter().collect();
        assert_eq!(registry.attach(&flags, "p", &mut session), 3);

        assert!(session.run(&[]).is_ok());
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn panicking_factory_is_skipped() {
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let registry = ObserverRegistry::empty()
            .register(ObserverKind::Agenda, |_: &str| -> Box<dyn DiagnosticObserver> {
                panic!("factory bug")
            })
            .register(ObserverKind::WorkingMemory, move |_: &str| {
                Box::new(Counting(counter.clone())) as Box<dyn DiagnosticObserver>
            });

        let mut session = ReplaySession::default();
        let flags: ObserverFlags = [ObserverKind::Agenda, ObserverKind::WorkingMemory]
            .into_iter()
            .collect();
        assert_eq!(registry.attach(&flags, "p", &mut session), 1);
        assert_eq!(session.observers[0].kind(), ObserverKind::WorkingMemory);

        assert!(session.run(&[]).is_ok());
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(panic_message(&"boom"), "panicked: boom");
        assert_eq!(panic_message(&"boom".to_string()), "panicked: boom");
        assert_eq!(panic_message(&42), "panicked");
    }
}
