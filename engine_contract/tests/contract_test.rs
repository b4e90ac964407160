//! Contract-level behaviour of the scripted engine, driven directly through
//! the engine traits without the adaptor.

use std::sync::{Arc, Mutex};

use serde_json::json;

use engine_contract::domain::{ContainerSource, FactSet, ObserverKind, SessionStrategy};
use engine_contract::engine::{InferenceEngine, SessionSpec};
use engine_contract::error::EngineError;
use engine_contract::hashing::canonical_hash;
use engine_contract::observer::{SessionEvent, SessionObserver};
use engine_contract::operations::Operation;
use engine_contract::scripted::{ScriptedEngine, ScriptedModel};

struct Collect {
    kind: ObserverKind,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl SessionObserver for Collect {
    fn kind(&self) -> ObserverKind {
        self.kind
    }

    fn on_event(&self, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn spec(strategy: SessionStrategy) -> SessionSpec {
    SessionSpec {
        knowledge_base: "kb".to_string(),
        session_name: "s".to_string(),
        strategy,
    }
}

fn insert(name: &str, value: serde_json::Value) -> Operation {
    Operation::InsertFact {
        name: name.to_string(),
        value,
    }
}

#[test]
fn rules_mutate_working_memory_and_notify_observers() {
    let engine = ScriptedEngine::new().with_rule(
        "raise-limit",
        |facts| facts.get("score").and_then(|v| v.as_i64()).unwrap_or(0) > 700,
        |facts| {
            facts.insert("limit", json!(5000));
        },
    );
    let container = engine.resolve_container(&ContainerSource::Classpath).unwrap();
    let mut session = engine
        .open_session(container.as_ref(), &spec(SessionStrategy::Stateful))
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    session.attach_observer(Box::new(Collect {
        kind: ObserverKind::WorkingMemory,
        events: events.clone(),
    }));

    let out = session
        .run(&[insert("score", json!(720)), Operation::FireAllRules])
        .unwrap();
    assert_eq!(out.facts, FactSet::new().with("score", json!(720)).with("limit", json!(5000)));

    let names: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            SessionEvent::FactInserted { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["score", "limit"]);

    session.dispose();
    assert_eq!(
        session.run(&[Operation::FireAllRules]).unwrap_err(),
        EngineError::SessionDisposed("s".to_string())
    );
}

#[test]
fn decisions_are_returned_in_model_order() {
    let engine = ScriptedEngine::new().with_model(
        ScriptedModel::new("ns", "Eligibility")
            .decision("Adult", |facts| json!(facts.get("age").and_then(|v| v.as_i64()).unwrap_or(0) >= 18))
            .decision("Eligible", |facts| json!(facts.get("Adult") == Some(&json!(true)))),
    );
    let container = engine.resolve_container(&ContainerSource::Classpath).unwrap();
    let mut session = engine
        .open_session(container.as_ref(), &spec(SessionStrategy::Stateless))
        .unwrap();

    let out = session
        .run(&[
            insert("age", json!(21)),
            Operation::EvaluateModel {
                namespace: "ns".to_string(),
                name: "Eligibility".to_string(),
            },
        ])
        .unwrap();
    let decided: Vec<(&str, &serde_json::Value)> =
        out.decisions.iter().map(|d| (d.name.as_str(), &d.value)).collect();
    assert_eq!(decided, vec![("Adult", &json!(true)), ("Eligible", &json!(true))]);
}

#[test]
fn unknown_model_is_an_engine_error() {
    let engine = ScriptedEngine::new();
    let container = engine.resolve_container(&ContainerSource::Classpath).unwrap();
    let mut session = engine
        .open_session(container.as_ref(), &spec(SessionStrategy::Stateful))
        .unwrap();
    assert_eq!(
        session
            .run(&[Operation::EvaluateModel {
                namespace: "ns".to_string(),
                name: "Missing".to_string(),
            }])
            .unwrap_err(),
        EngineError::UnknownModel {
            namespace: "ns".to_string(),
            name: "Missing".to_string(),
        }
    );
}

#[test]
fn engine_output_hash_is_stable_across_runs() {
    let run = || {
        let engine = ScriptedEngine::new();
        let container = engine.resolve_container(&ContainerSource::Classpath).unwrap();
        let mut session = engine
            .open_session(container.as_ref(), &spec(SessionStrategy::Stateless))
            .unwrap();
        let out = session
            .run(&[insert("b", json!(2)), insert("a", json!(1)), Operation::FireAllRules])
            .unwrap();
        canonical_hash(&serde_json::to_value(&out).unwrap())
    };
    assert_eq!(run(), run());
}
