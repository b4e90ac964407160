//! Configuration collaborator: named key/value settings resolved into an
//! immutable `ExecutionProfile`.
//!
//! Keys are namespaced by profile id (`<profile>.<suffix>`). Where two
//! spellings of a suffix exist, the first one present wins. Blank values
//! count as absent.
//!
//! Defaults applied on this by-name path only:
//!   - no container type      -> classpath
//!   - no session type        -> stateful
//!   - no listener flag       -> observer not attached
//!
//! Anything present but unrecognized is a `ConfigurationError`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

use engine_contract::domain::{
    ContainerStrategy, ExecutionProfile, ObserverFlags, ObserverKind, ProfileKind,
    SessionStrategy,
};
use engine_contract::error::ConfigurationError;
use engine_contract::validation::validate_profile;

/// Key suffixes, appended to `<profile>.`.
pub mod keys {
    pub const KIE_BASE_NAME: &[&str] = &["kie-base.name", "kiebase.name"];
    pub const KIE_CONTAINER_TYPE: &str = "kie-container.type";
    pub const EXECUTION_MODE: &str = "execution.mode";
    pub const RELEASE_ID: &str = "release.id";
    pub const KIE_SESSION_NAME: &[&str] = &["kie-session.name", "kiesession.name"];
    pub const KIE_SESSION_TYPE: &[&str] = &["kie-session.type", "kiesession.type"];
    pub const RULEFLOW_NAME: &str = "ruleflow.name";
    pub const DMN_MODEL_NAME: &str = "dmn.model.name";
    pub const DMN_MODEL_NAMESPACE: &str = "dmn.model.namespace";
    pub const ENABLE_AGENDA_LISTENER: &str = "enable.agenda.listener";
    pub const ENABLE_WORKING_MEMORY_LISTENER: &str = "enable.working-memory.listener";
    pub const ENABLE_PROCESS_LISTENER: &str = "enable.process.listener";
    /// Generic listener switches; they enable the agenda observer.
    pub const ENABLE_LISTENER: &[&str] = &["enable.listener", "enable.default.listener"];
}

/// Source of named settings.
pub trait ConfigSource: Send + Sync {
    fn value(&self, key: &str) -> Option<String>;
}

// ---------------------------------------------------------------------------
// In-memory / TOML source
// ---------------------------------------------------------------------------

/// Ordered in-memory settings, optionally loaded from TOML.
///
/// TOML tables are flattened into dotted keys, so
///
/// ```toml
/// [loan-check]
/// kiebase.name = "loan-rules"
/// ```
///
/// yields `loan-check.kiebase.name = "loan-rules"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapConfig {
    values: BTreeMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: &str, value: &str) -> Option<String> {
        self.values.insert(key.to_string(), value.to_string())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigurationError::Source(e.to_string()))?;
        let mut values = BTreeMap::new();
        for (key, value) in table {
            flatten_toml(key, value, &mut values)?;
        }
        Ok(Self { values })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::Source(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

impl ConfigSource for MapConfig {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn flatten_toml(
    key: String,
    value: toml::Value,
    out: &mut BTreeMap<String, String>,
) -> Result<(), ConfigurationError> {
    let scalar = match value {
        toml::Value::Table(table) => {
            for (child, v) in table {
                flatten_toml(format!("{}.{}", key, child), v, out)?;
            }
            return Ok(());
        }
        toml::Value::String(s) => s,
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) => {
            return Err(ConfigurationError::InvalidValue {
                key,
                value: "[array]".to_string(),
                reason: "arrays are not supported".to_string(),
            })
        }
    };
    out.insert(key, scalar);
    Ok(())
}

// ---------------------------------------------------------------------------
// Profile resolution
// ---------------------------------------------------------------------------

/// Resolve `profile_id` into a validated profile.
#[instrument(level = "debug", skip(source))]
pub fn resolve_profile(
    source: &dyn ConfigSource,
    profile_id: &str,
) -> Result<ExecutionProfile, ConfigurationError> {
    let lookup = ProfileKeys {
        source,
        profile: profile_id,
    };

    let knowledge_base_name = lookup.required(keys::KIE_BASE_NAME)?;
    let kind = resolve_kind(&lookup)?;
    let (container_strategy, coordinate) = resolve_container(&lookup)?;
    let session_name = match (lookup.optional(keys::KIE_SESSION_NAME), &kind) {
        (Some((_, name)), _) => name,
        (None, ProfileKind::DecisionModel { .. }) => String::new(),
        (None, ProfileKind::RuleSet { .. }) => {
            return Err(ConfigurationError::MissingKey {
                key: lookup.key(keys::KIE_SESSION_NAME[0]),
            })
        }
    };
    let session_strategy = resolve_session_strategy(&lookup)?;
    let observer_flags = resolve_observers(&lookup)?;

    let profile = ExecutionProfile {
        id: profile_id.to_string(),
        knowledge_base_name,
        container_strategy,
        coordinate,
        session_strategy,
        session_name,
        kind,
        observer_flags,
    };
    validate_profile(&profile)?;

    debug!(
        kind = profile.kind.label(),
        container = %profile.container_strategy,
        session = %profile.session_strategy,
        observers = profile.observer_flags.len(),
        "profile resolved"
    );
    Ok(profile)
}

struct ProfileKeys<'a> {
    source: &'a dyn ConfigSource,
    profile: &'a str,
}

impl ProfileKeys<'_> {
    fn key(&self, suffix: &str) -> String {
        format!("{}.{}", self.profile, suffix)
    }

    /// First non-blank value among `suffixes`, with the full key it came from.
    fn optional(&self, suffixes: &[&str]) -> Option<(String, String)> {
        suffixes.iter().find_map(|suffix| {
            let key = self.key(suffix);
            let value = self.source.value(&key)?;
            let value = value.trim();
            if value.is_empty() {
                None
            } else {
                Some((key, value.to_string()))
            }
        })
    }

    fn required(&self, suffixes: &[&str]) -> Result<String, ConfigurationError> {
        self.optional(suffixes)
            .map(|(_, value)| value)
            .ok_or_else(|| ConfigurationError::MissingKey {
                key: self.key(suffixes[0]),
            })
    }

    fn flag(&self, suffixes: &[&str]) -> Result<bool, ConfigurationError> {
        match self.optional(suffixes) {
            None => Ok(false),
            Some((key, value)) => parse_bool(&key, &value),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        })
    }
}

/// A decision profile is one that names a decision model.
fn resolve_kind(lookup: &ProfileKeys<'_>) -> Result<ProfileKind, ConfigurationError> {
    match lookup.optional(&[keys::DMN_MODEL_NAME]) {
        Some((_, model_name)) => Ok(ProfileKind::DecisionModel {
            model_name,
            model_namespace: lookup.required(&[keys::DMN_MODEL_NAMESPACE])?,
        }),
        None => Ok(ProfileKind::RuleSet {
            workflow_name: lookup.optional(&[keys::RULEFLOW_NAME]).map(|(_, v)| v),
        }),
    }
}

/// `kie-container.type` wins over the legacy `execution.mode`, which may
/// also carry the coordinate itself.
fn resolve_container(
    lookup: &ProfileKeys<'_>,
) -> Result<(ContainerStrategy, Option<String>), ConfigurationError> {
    let release_id = lookup.optional(&[keys::RELEASE_ID]).map(|(_, v)| v);

    if let Some((_, value)) = lookup.optional(&[keys::KIE_CONTAINER_TYPE]) {
        return Ok((value.parse()?, release_id));
    }

    match lookup.optional(&[keys::EXECUTION_MODE]) {
        None => Ok((ContainerStrategy::Classpath, release_id)),
        Some((_, mode)) => match mode.parse::<ContainerStrategy>() {
            Ok(strategy) => Ok((strategy, release_id)),
            Err(_) if is_inline_coordinate(&mode) => {
                Ok((ContainerStrategy::Coordinate, Some(mode)))
            }
            Err(err) => Err(err),
        },
    }
}

/// `group:artifact:version` (or longer), no blank segments.
fn is_inline_coordinate(value: &str) -> bool {
    let segments: Vec<&str> = value.split(':').collect();
    segments.len() >= 3
        && segments
            .iter()
            .all(|s| !s.is_empty() && !s.contains(char::is_whitespace))
}

fn resolve_session_strategy(lookup: &ProfileKeys<'_>) -> Result<SessionStrategy, ConfigurationError> {
    match lookup.optional(keys::KIE_SESSION_TYPE) {
        None => Ok(SessionStrategy::Stateful),
        Some((_, value)) => value.parse(),
    }
}

fn resolve_observers(lookup: &ProfileKeys<'_>) -> Result<ObserverFlags, ConfigurationError> {
    let agenda = lookup.flag(&[keys::ENABLE_AGENDA_LISTENER])?;
    let generic = lookup.flag(keys::ENABLE_LISTENER)?;
    let working_memory = lookup.flag(&[keys::ENABLE_WORKING_MEMORY_LISTENER])?;
    let process = lookup.flag(&[keys::ENABLE_PROCESS_LISTENER])?;

    let mut flags = ObserverFlags::new();
    if agenda || generic {
        flags.insert(ObserverKind::Agenda);
    }
    if working_memory {
        flags.insert(ObserverKind::WorkingMemory);
    }
    if process {
        flags.insert(ObserverKind::Process);
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_config() -> MapConfig {
        MapConfig::from_pairs([
            ("loan.kiebase.name", "loan-kb"),
            ("loan.kiesession.name", "loan-session"),
        ])
    }

    #[test]
    fn minimal_rule_set_uses_legacy_defaults() {
        let profile = resolve_profile(&rule_config(), "loan").unwrap();
        assert_eq!(profile.knowledge_base_name, "loan-kb");
        assert_eq!(profile.session_name, "loan-session");
        assert_eq!(profile.container_strategy, ContainerStrategy::Classpath);
        assert_eq!(profile.session_strategy, SessionStrategy::Stateful);
        assert_eq!(profile.kind, ProfileKind::RuleSet { workflow_name: None });
        assert!(profile.observer_flags.is_empty());
    }

    #[test]
    fn hyphenated_spellings_win() {
        let config = rule_config()
            .with("loan.kie-base.name", "preferred")
            .with("loan.kie-session.type", "stateless");
        let profile = resolve_profile(&config, "loan").unwrap();
        assert_eq!(profile.knowledge_base_name, "preferred");
        assert_eq!(profile.session_strategy, SessionStrategy::Stateless);
    }

    #[test]
    fn blank_session_type_defaults_to_stateful() {
        let config = rule_config().with("loan.kiesession.type", "  ");
        let profile = resolve_profile(&config, "loan").unwrap();
        assert_eq!(profile.session_strategy, SessionStrategy::Stateful);
    }

    #[test]
    fn unknown_session_type_is_rejected() {
        let config = rule_config().with("loan.kiesession.type", "unknown");
        assert_eq!(
            resolve_profile(&config, "loan").unwrap_err(),
            ConfigurationError::UnsupportedSessionStrategy("unknown".to_string())
        );
    }

    #[test]
    fn missing_knowledge_base_names_the_key() {
        let config = MapConfig::new().with("loan.kiesession.name", "s");
        assert_eq!(
            resolve_profile(&config, "loan").unwrap_err(),
            ConfigurationError::MissingKey {
                key: "loan.kie-base.name".to_string()
            }
        );
    }

    #[test]
    fn coordinate_container_takes_release_id() {
        let config = rule_config()
            .with("loan.kie-container.type", "RELEASE_ID")
            .with("loan.release.id", "com.acme:loan-rules:2.1.0");
        let profile = resolve_profile(&config, "loan").unwrap();
        assert_eq!(profile.container_strategy, ContainerStrategy::Coordinate);
        assert_eq!(profile.coordinate.as_deref(), Some("com.acme:loan-rules:2.1.0"));
    }

    #[test]
    fn coordinate_container_without_release_id_fails() {
        let config = rule_config().with("loan.kie-container.type", "coordinate");
        assert_eq!(
            resolve_profile(&config, "loan").unwrap_err(),
            ConfigurationError::MissingCoordinate {
                profile: "loan".to_string()
            }
        );
    }

    #[test]
    fn execution_mode_may_carry_the_coordinate() {
        let config = rule_config().with("loan.execution.mode", "com.acme:loan-rules:2.1.0");
        let profile = resolve_profile(&config, "loan").unwrap();
        assert_eq!(profile.container_strategy, ContainerStrategy::Coordinate);
        assert_eq!(profile.coordinate.as_deref(), Some("com.acme:loan-rules:2.1.0"));
    }

    #[test]
    fn unknown_execution_mode_is_rejected() {
        let config = rule_config().with("loan.execution.mode", "filesystem");
        assert_eq!(
            resolve_profile(&config, "loan").unwrap_err(),
            ConfigurationError::UnsupportedContainerStrategy("filesystem".to_string())
        );
    }

    #[test]
    fn workflow_and_listener_flags() {
        let config = rule_config()
            .with("loan.ruleflow.name", "approval")
            .with("loan.enable.agenda.listener", "false")
            .with("loan.enable.working-memory.listener", "TRUE")
            .with("loan.enable.process.listener", "true");
        let profile = resolve_profile(&config, "loan").unwrap();
        assert_eq!(profile.workflow_to_start(), Some("approval"));
        assert_eq!(
            profile.observer_flags.iter().copied().collect::<Vec<_>>(),
            vec![ObserverKind::WorkingMemory, ObserverKind::Process]
        );
    }

    #[test]
    fn malformed_flag_is_rejected() {
        let config = rule_config().with("loan.enable.process.listener", "yes");
        assert!(matches!(
            resolve_profile(&config, "loan"),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn decision_profile_needs_namespace_not_session() {
        let config = MapConfig::new()
            .with("pricing.kie-base.name", "pricing-kb")
            .with("pricing.dmn.model.name", "Pricing")
            .with("pricing.enable.listener", "true");
        assert_eq!(
            resolve_profile(&config, "pricing").unwrap_err(),
            ConfigurationError::MissingKey {
                key: "pricing.dmn.model.namespace".to_string()
            }
        );

        let config = config.with("pricing.dmn.model.namespace", "https://acme.com/dmn");
        let profile = resolve_profile(&config, "pricing").unwrap();
        assert!(profile.is_decision_model());
        assert_eq!(profile.session_name, "");
        assert!(profile.observer_flags.contains(&ObserverKind::Agenda));
    }

    #[test]
    fn toml_tables_flatten_into_dotted_keys() {
        let config = MapConfig::from_toml_str(
            r#"
            [loan]
            kiebase.name = "loan-kb"
            kiesession.name = "loan-session"
            enable.process.listener = true

            [pricing]
            "dmn.model.name" = "Pricing"
            "#,
        )
        .unwrap();
        assert_eq!(config.value("loan.kiebase.name").as_deref(), Some("loan-kb"));
        assert_eq!(config.value("loan.enable.process.listener").as_deref(), Some("true"));
        assert_eq!(config.value("pricing.dmn.model.name").as_deref(), Some("Pricing"));
        assert_eq!(config.len(), 4);
    }

    #[test]
    fn toml_arrays_are_rejected() {
        let err = MapConfig::from_toml_str("[loan]\nkiebase.name = [\"a\"]").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { key, .. } if key == "loan.kiebase.name"));
    }

    #[test]
    fn malformed_toml_is_a_source_error() {
        assert!(matches!(
            MapConfig::from_toml_str("[loan"),
            Err(ConfigurationError::Source(_))
        ));
    }
}
