//! Core domain types: profiles, strategies, facts.
//!
//! Pure data. Strategy values are closed enums; parsing them from strings
//! goes through `FromStr`, so an unrecognized value is a
//! `ConfigurationError` rather than a silently defaulted state.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigurationError;

/// Workflow name meaning "do not start a workflow" (compared case-insensitively).
pub const NO_WORKFLOW: &str = "none";

// ── Strategies ─────────────────────────────────────────────────────

/// Where the engine's knowledge container comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ContainerStrategy {
    /// Container bundled with the running process.
    Classpath,
    /// Container addressed by an external artifact coordinate.
    Coordinate,
}

impl ContainerStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStrategy::Classpath => "classpath",
            ContainerStrategy::Coordinate => "coordinate",
        }
    }
}

impl fmt::Display for ContainerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ContainerStrategy {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ContainerStrategy {
    type Err = ConfigurationError;

    /// Accepts `classpath`, `coordinate` and the `release-id` spellings,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classpath" => Ok(ContainerStrategy::Classpath),
            "coordinate" | "release-id" | "release_id" | "releaseid" => {
                Ok(ContainerStrategy::Coordinate)
            }
            _ => Err(ConfigurationError::UnsupportedContainerStrategy(
                s.to_string(),
            )),
        }
    }
}

/// Session lifecycle used for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum SessionStrategy {
    /// Explicit lifecycle: create, use once, dispose.
    Stateful,
    /// Single-shot; nothing to release.
    Stateless,
}

impl SessionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStrategy::Stateful => "stateful",
            SessionStrategy::Stateless => "stateless",
        }
    }
}

impl fmt::Display for SessionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SessionStrategy {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for SessionStrategy {
    type Err = ConfigurationError;

    /// Exact match (case-insensitive). Empty is rejected here; the
    /// by-name convenience path applies its own stateful default first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stateful" => Ok(SessionStrategy::Stateful),
            "stateless" => Ok(SessionStrategy::Stateless),
            _ => Err(ConfigurationError::UnsupportedSessionStrategy(
                s.to_string(),
            )),
        }
    }
}

/// Diagnostic observer categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObserverKind {
    /// Match/fire activity and decision evaluation.
    Agenda,
    /// Fact insert/update/delete.
    WorkingMemory,
    /// Workflow lifecycle and node transitions.
    Process,
}

impl ObserverKind {
    pub const ALL: [ObserverKind; 3] = [
        ObserverKind::Agenda,
        ObserverKind::WorkingMemory,
        ObserverKind::Process,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObserverKind::Agenda => "agenda",
            ObserverKind::WorkingMemory => "working-memory",
            ObserverKind::Process => "process",
        }
    }
}

impl fmt::Display for ObserverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of observers to attach. Empty means nothing is attached.
pub type ObserverFlags = BTreeSet<ObserverKind>;

/// Resolved container address handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "coordinate", rename_all = "snake_case")]
pub enum ContainerSource {
    Classpath,
    Coordinate(String),
}

impl fmt::Display for ContainerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerSource::Classpath => f.write_str("classpath"),
            ContainerSource::Coordinate(c) => write!(f, "coordinate({})", c),
        }
    }
}

// ── Profile ────────────────────────────────────────────────────────

/// What a profile runs: a rule set or a decision model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileKind {
    RuleSet {
        workflow_name: Option<String>,
    },
    DecisionModel {
        model_name: String,
        model_namespace: String,
    },
}

impl ProfileKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProfileKind::RuleSet { .. } => "rule_set",
            ProfileKind::DecisionModel { .. } => "decision_model",
        }
    }
}

/// Resolved, immutable description of how to run one rule set or model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub id: String,
    pub knowledge_base_name: String,
    pub container_strategy: ContainerStrategy,
    /// Required iff `container_strategy` is `Coordinate`; ignored otherwise.
    pub coordinate: Option<String>,
    pub session_strategy: SessionStrategy,
    pub session_name: String,
    pub kind: ProfileKind,
    pub observer_flags: ObserverFlags,
}

impl ExecutionProfile {
    /// Rule-set profile on the classpath container with a stateful session.
    pub fn rule_set(id: &str, knowledge_base_name: &str, session_name: &str) -> Self {
        Self {
            id: id.to_string(),
            knowledge_base_name: knowledge_base_name.to_string(),
            container_strategy: ContainerStrategy::Classpath,
            coordinate: None,
            session_strategy: SessionStrategy::Stateful,
            session_name: session_name.to_string(),
            kind: ProfileKind::RuleSet {
                workflow_name: None,
            },
            observer_flags: ObserverFlags::new(),
        }
    }

    /// Decision-model profile on the classpath container.
    /// The session name is empty, i.e. the engine's default session.
    pub fn decision_model(
        id: &str,
        knowledge_base_name: &str,
        model_namespace: &str,
        model_name: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            knowledge_base_name: knowledge_base_name.to_string(),
            container_strategy: ContainerStrategy::Classpath,
            coordinate: None,
            session_strategy: SessionStrategy::Stateful,
            session_name: String::new(),
            kind: ProfileKind::DecisionModel {
                model_name: model_name.to_string(),
                model_namespace: model_namespace.to_string(),
            },
            observer_flags: ObserverFlags::new(),
        }
    }

    /// Switch to the coordinate container strategy.
    pub fn with_coordinate(mut self, coordinate: &str) -> Self {
        self.container_strategy = ContainerStrategy::Coordinate;
        self.coordinate = Some(coordinate.to_string());
        self
    }

    pub fn with_session_strategy(mut self, strategy: SessionStrategy) -> Self {
        self.session_strategy = strategy;
        self
    }

    pub fn with_session_name(mut self, session_name: &str) -> Self {
        self.session_name = session_name.to_string();
        self
    }

    /// Set the workflow for a rule-set profile. No effect on decision profiles.
    pub fn with_workflow(mut self, workflow_name: &str) -> Self {
        if let ProfileKind::RuleSet { workflow_name: wf } = &mut self.kind {
            *wf = Some(workflow_name.to_string());
        }
        self
    }

    pub fn with_observer(mut self, kind: ObserverKind) -> Self {
        self.observer_flags.insert(kind);
        self
    }

    pub fn with_observers<I: IntoIterator<Item = ObserverKind>>(mut self, kinds: I) -> Self {
        self.observer_flags.extend(kinds);
        self
    }

    pub fn is_decision_model(&self) -> bool {
        matches!(self.kind, ProfileKind::DecisionModel { .. })
    }

    /// Workflow to start before firing rules, if any.
    /// Absent, blank and `"none"` (any case) all mean no workflow.
    pub fn workflow_to_start(&self) -> Option<&str> {
        match &self.kind {
            ProfileKind::RuleSet {
                workflow_name: Some(name),
            } => {
                let name = name.trim();
                if name.is_empty() || name.eq_ignore_ascii_case(NO_WORKFLOW) {
                    None
                } else {
                    Some(name)
                }
            }
            _ => None,
        }
    }

    /// Resolve the container address. A coordinate profile without a
    /// non-empty coordinate never reaches the engine.
    pub fn container_source(&self) -> Result<ContainerSource, ConfigurationError> {
        match self.container_strategy {
            ContainerStrategy::Classpath => Ok(ContainerSource::Classpath),
            ContainerStrategy::Coordinate => match self.coordinate.as_deref().map(str::trim) {
                Some(c) if !c.is_empty() => Ok(ContainerSource::Coordinate(c.to_string())),
                _ => Err(ConfigurationError::MissingCoordinate {
                    profile: self.id.clone(),
                }),
            },
        }
    }
}

// ── Facts ──────────────────────────────────────────────────────────

/// Named input facts. Names are unique; insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet(Map<String, Value>);

impl FactSet {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    /// Insert or replace. A replaced fact keeps its original position.
    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        self.0.insert(name.to_string(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Build from a JSON object. Returns `None` for any other JSON shape.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for FactSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for FactSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
