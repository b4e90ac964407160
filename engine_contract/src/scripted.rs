//! Scripted engine: a deterministic, recording engine double.
//!
//! Implements the engine contract with closures instead of rule matching:
//!   - inserted facts are echoed back by identifier
//!   - scripted rules fire at most once per batch, in registration order,
//!     when their condition holds against working memory
//!   - a decision model evaluates its decisions in order; each decision sees
//!     the input facts plus the outputs of earlier decisions
//!   - every contract call lands in a shared `EngineJournal`
//!
//! Events are delivered only to observers of the matching kind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::domain::{ContainerSource, FactSet, ObserverKind, SessionStrategy};
use crate::engine::{EngineSession, InferenceEngine, KnowledgeContainer, SessionSpec};
use crate::error::EngineError;
use crate::observer::{SessionEvent, SessionObserver};
use crate::operations::{DecisionOutcome, EngineResultSet, Operation};

type Condition = dyn Fn(&FactSet) -> bool + Send + Sync;
type Action = dyn Fn(&mut FactSet) + Send + Sync;
type Decision = dyn Fn(&FactSet) -> Value + Send + Sync;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// One recorded contract call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    ResolveContainer(ContainerSource),
    OpenSession(SessionSpec),
    AttachObserver(ObserverKind),
    Run(Vec<Operation>),
    Dispose(String),
}

/// Shared, cloneable record of every call made against a `ScriptedEngine`.
#[derive(Debug, Clone, Default)]
pub struct EngineJournal {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl EngineJournal {
    fn record(&self, call: EngineCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn containers_resolved(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::ResolveContainer(_)))
    }

    pub fn sessions_opened(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::OpenSession(_)))
    }

    pub fn dispose_count(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Dispose(_)))
    }

    pub fn observers_attached(&self) -> Vec<ObserverKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::AttachObserver(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    /// Every batch passed to `run`, in call order.
    pub fn batches(&self) -> Vec<Vec<Operation>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Run(ops) => Some(ops),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// A named condition/action pair.
pub struct ScriptedRule {
    name: String,
    when: Box<Condition>,
    then: Box<Action>,
}

/// A decision model: ordered named decisions.
pub struct ScriptedModel {
    namespace: String,
    name: String,
    decisions: Vec<(String, Box<Decision>)>,
}

impl ScriptedModel {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            decisions: Vec::new(),
        }
    }

    /// Append a decision. Later decisions can read earlier outputs by name.
    pub fn decision<F>(mut self, name: &str, evaluate: F) -> Self
    where
        F: Fn(&FactSet) -> Value + Send + Sync + 'static,
    {
        self.decisions.push((name.to_string(), Box::new(evaluate)));
        self
    }
}

#[derive(Clone, Default)]
struct Script {
    /// `None` accepts every knowledge base name.
    knowledge_bases: Option<BTreeSet<String>>,
    rules: Vec<Arc<ScriptedRule>>,
    workflows: BTreeMap<String, Vec<String>>,
    models: Vec<Arc<ScriptedModel>>,
    fail_open: Option<String>,
    fail_run: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Deterministic engine double. See module docs.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Script,
    coordinates: BTreeSet<String>,
    fail_container: Option<String>,
    journal: EngineJournal,
}

impl ScriptedEngine {
    /// Echo engine: classpath container, any knowledge base, no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the container to registered knowledge bases.
    pub fn with_knowledge_base(mut self, name: &str) -> Self {
        self.script
            .knowledge_bases
            .get_or_insert_with(BTreeSet::new)
            .insert(name.to_string());
        self
    }

    /// Make an artifact coordinate resolvable.
    pub fn with_coordinate(mut self, coordinate: &str) -> Self {
        self.coordinates.insert(coordinate.to_string());
        self
    }

    pub fn with_rule<W, T>(mut self, name: &str, when: W, then: T) -> Self
    where
        W: Fn(&FactSet) -> bool + Send + Sync + 'static,
        T: Fn(&mut FactSet) + Send + Sync + 'static,
    {
        self.script.rules.push(Arc::new(ScriptedRule {
            name: name.to_string(),
            when: Box::new(when),
            then: Box::new(then),
        }));
        self
    }

    /// Register a workflow whose nodes are visited in order when started.
    pub fn with_workflow(mut self, name: &str, nodes: &[&str]) -> Self {
        self.script.workflows.insert(
            name.to_string(),
            nodes.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn with_model(mut self, model: ScriptedModel) -> Self {
        self.script.models.push(Arc::new(model));
        self
    }

    /// Container resolution fails with `message`.
    pub fn failing_container(mut self, message: &str) -> Self {
        self.fail_container = Some(message.to_string());
        self
    }

    /// Session creation fails with `message`.
    pub fn failing_session(mut self, message: &str) -> Self {
        self.script.fail_open = Some(message.to_string());
        self
    }

    /// Every batch run fails with `message`.
    pub fn failing_run(mut self, message: &str) -> Self {
        self.script.fail_run = Some(message.to_string());
        self
    }

    /// Handle onto the call journal; stays valid after the engine moves.
    pub fn journal(&self) -> EngineJournal {
        self.journal.clone()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn resolve_container(
        &self,
        source: &ContainerSource,
    ) -> Result<Arc<dyn KnowledgeContainer>, EngineError> {
        self.journal.record(EngineCall::ResolveContainer(source.clone()));

        if let Some(message) = &self.fail_container {
            return Err(EngineError::ContainerUnavailable {
                container: source.to_string(),
                message: message.clone(),
            });
        }
        if let ContainerSource::Coordinate(coordinate) = source {
            if !self.coordinates.contains(coordinate) {
                return Err(EngineError::ContainerUnavailable {
                    container: source.to_string(),
                    message: "artifact not found".to_string(),
                });
            }
        }

        Ok(Arc::new(ScriptedContainer {
            source: source.clone(),
            knowledge_bases: self.script.knowledge_bases.clone(),
        }))
    }

    fn open_session(
        &self,
        container: &dyn KnowledgeContainer,
        spec: &SessionSpec,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        self.journal.record(EngineCall::OpenSession(spec.clone()));

        if let Some(message) = &self.script.fail_open {
            return Err(EngineError::SessionUnavailable {
                name: spec.session_name.clone(),
                message: message.clone(),
            });
        }
        container.check_knowledge_base(&spec.knowledge_base)?;

        Ok(Box::new(ScriptedSession {
            spec: spec.clone(),
            script: self.script.clone(),
            observers: Vec::new(),
            memory: FactSet::new(),
            journal: self.journal.clone(),
            disposed: false,
        }))
    }
}

struct ScriptedContainer {
    source: ContainerSource,
    knowledge_bases: Option<BTreeSet<String>>,
}

impl KnowledgeContainer for ScriptedContainer {
    fn source(&self) -> &ContainerSource {
        &self.source
    }

    fn check_knowledge_base(&self, name: &str) -> Result<(), EngineError> {
        match &self.knowledge_bases {
            Some(known) if !known.contains(name) => {
                Err(EngineError::UnknownKnowledgeBase(name.to_string()))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct ScriptedSession {
    spec: SessionSpec,
    script: Script,
    observers: Vec<Box<dyn SessionObserver>>,
    memory: FactSet,
    journal: EngineJournal,
    disposed: bool,
}

impl EngineSession for ScriptedSession {
    fn attach_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.journal.record(EngineCall::AttachObserver(observer.kind()));
        self.observers.push(observer);
    }

    fn run(&mut self, operations: &[Operation]) -> Result<EngineResultSet, EngineError> {
        self.journal.record(EngineCall::Run(operations.to_vec()));

        if self.disposed {
            return Err(EngineError::SessionDisposed(self.spec.session_name.clone()));
        }
        if let Some(message) = &self.script.fail_run {
            return Err(EngineError::Execution(message.clone()));
        }

        let mut decisions = Vec::new();
        for op in operations {
            self.apply_operation(op, &mut decisions)?;
        }

        let result = EngineResultSet {
            facts: self.memory.clone(),
            decisions,
        };
        if self.spec.strategy == SessionStrategy::Stateless {
            self.memory = FactSet::new();
        }
        Ok(result)
    }

    fn dispose(&mut self) {
        self.journal
            .record(EngineCall::Dispose(self.spec.session_name.clone()));
        self.disposed = true;
        self.memory = FactSet::new();
    }
}

impl ScriptedSession {
    fn emit(&self, event: SessionEvent) {
        let kind = event.kind();
        for observer in self.observers.iter().filter(|o| o.kind() == kind) {
            observer.on_event(&event);
        }
    }

    /// Dispatch one operation against working memory.
    fn apply_operation(
        &mut self,
        op: &Operation,
        decisions: &mut Vec<DecisionOutcome>,
    ) -> Result<(), EngineError> {
        match op {
            Operation::InsertFact { name, value } => {
                self.memory.insert(name, value.clone());
                self.emit(SessionEvent::FactInserted {
                    name: name.clone(),
                    value: value.clone(),
                });
                Ok(())
            }
            Operation::StartWorkflow { name } => self.start_workflow(name),
            Operation::FireAllRules => {
                self.fire_all_rules();
                Ok(())
            }
            Operation::EvaluateModel { namespace, name } => {
                decisions.extend(self.evaluate_model(namespace, name)?);
                Ok(())
            }
        }
    }

    fn start_workflow(&mut self, name: &str) -> Result<(), EngineError> {
        let nodes = self
            .script
            .workflows
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownWorkflow(name.to_string()))?;

        self.emit(SessionEvent::ProcessStarted {
            process: name.to_string(),
        });
        for node in nodes {
            self.emit(SessionEvent::NodeTriggered {
                process: name.to_string(),
                node: node.clone(),
            });
            self.emit(SessionEvent::NodeLeft {
                process: name.to_string(),
                node,
            });
        }
        self.emit(SessionEvent::ProcessCompleted {
            process: name.to_string(),
        });
        Ok(())
    }

    fn fire_all_rules(&mut self) {
        let rules = self.script.rules.clone();
        for rule in rules {
            if !(rule.when)(&self.memory) {
                continue;
            }
            self.emit(SessionEvent::MatchCreated {
                rule: rule.name.clone(),
            });
            self.emit(SessionEvent::BeforeMatchFired {
                rule: rule.name.clone(),
            });

            let before = self.memory.clone();
            (rule.then)(&mut self.memory);

            self.emit(SessionEvent::AfterMatchFired {
                rule: rule.name.clone(),
            });
            self.emit_memory_changes(&before, &rule.name);
        }
    }

    /// Working-memory events for the difference between `before` and now.
    fn emit_memory_changes(&self, before: &FactSet, rule: &str) {
        for (name, value) in &self.memory {
            match before.get(name) {
                Some(old) if old == value => {}
                Some(_) => self.emit(SessionEvent::FactUpdated {
                    name: name.clone(),
                    rule: Some(rule.to_string()),
                    value: value.clone(),
                }),
                None => self.emit(SessionEvent::FactInserted {
                    name: name.clone(),
                    value: value.clone(),
                }),
            }
        }
        for (name, value) in before {
            if !self.memory.contains(name) {
                self.emit(SessionEvent::FactDeleted {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    fn evaluate_model(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<DecisionOutcome>, EngineError> {
        let model = self
            .script
            .models
            .iter()
            .find(|m| m.namespace == namespace && m.name == name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownModel {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let mut context = self.memory.clone();
        let mut outcomes = Vec::with_capacity(model.decisions.len());
        for (decision, evaluate) in &model.decisions {
            self.emit(SessionEvent::BeforeDecisionEvaluated {
                decision: decision.clone(),
            });
            let value = evaluate(&context);
            self.emit(SessionEvent::AfterDecisionEvaluated {
                decision: decision.clone(),
                value: value.clone(),
            });
            context.insert(decision, value.clone());
            outcomes.push(DecisionOutcome {
                name: decision.clone(),
                value,
            });
        }
        Ok(outcomes)
    }
}
