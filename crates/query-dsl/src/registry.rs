use crate::{
    clause::{Clause, aggs, boolean, highlight, range, request, single_entry, sort, term, text},
    error::{DslError, Result},
    version::Version,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Inputs handed to a clause constructor.
#[derive(Clone, Copy)]
pub struct ClauseArgs<'a> {
    /// Field the clause targets, for field-bearing variants built by name.
    pub field: Option<&'a str>,
    /// Existing body to rebuild from, i.e. the value under the clause's root key.
    pub body: Option<&'a Value>,
    pub version: Version,
    /// Used by container variants to resolve their sub-clauses.
    pub registry: &'a ClauseRegistry,
}

pub type ClauseConstructor = fn(ClauseArgs<'_>) -> Result<Clause>;

/// What the factory can turn into a clause.
#[derive(Debug, Clone)]
pub enum ClauseSpec<'a> {
    Name { name: &'a str, field: Option<&'a str> },
    Document(&'a Value),
    Built(Clause),
}

impl<'a> From<&'a str> for ClauseSpec<'a> {
    fn from(name: &'a str) -> Self {
        ClauseSpec::Name { name, field: None }
    }
}

impl<'a> From<&'a Value> for ClauseSpec<'a> {
    fn from(doc: &'a Value) -> Self {
        ClauseSpec::Document(doc)
    }
}

impl From<Clause> for ClauseSpec<'_> {
    fn from(clause: Clause) -> Self {
        ClauseSpec::Built(clause)
    }
}

/// Name-to-constructor table behind the clause factory.
pub struct ClauseRegistry {
    constructors: HashMap<String, ClauseConstructor>,
}

impl ClauseRegistry {
    /// A registry with no variants.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with every built-in variant.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.register("bool", boolean::construct);
        registry.register("term", term::construct_term);
        registry.register("terms", term::construct_terms);
        registry.register("match", text::construct);
        registry.register("range", range::construct);
        registry.register("sort", sort::construct);
        registry.register("aggs", aggs::construct);
        registry.register("highlight", highlight::construct);
        registry.register("dsl", request::construct);
        registry.register("request", request::construct);

        registry
    }

    pub fn register(&mut self, name: &str, constructor: ClauseConstructor) {
        self.constructors.insert(name.to_lowercase(), constructor);
    }

    pub fn has_clause(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_lowercase())
    }

    pub fn clause_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Builds an empty clause of the variant registered under `name`.
    pub fn create(&self, name: &str, field: Option<&str>, version: Version) -> Result<Clause> {
        self.construct(name, field, None, version)
    }

    /// Rebuilds a clause from a single-key `{name: body}` document.
    pub fn from_document(&self, doc: &Value, version: Version) -> Result<Clause> {
        let (name, body) = single_entry(doc)?;
        self.construct(name, None, Some(body), version)
    }

    /// Resolves a name, a document or an already built clause. Built clauses are
    /// returned unchanged.
    pub fn resolve<'a>(&self, spec: impl Into<ClauseSpec<'a>>, version: Version) -> Result<Clause> {
        match spec.into() {
            ClauseSpec::Name { name, field } => self.create(name, field, version),
            ClauseSpec::Document(doc) => self.from_document(doc, version),
            ClauseSpec::Built(clause) => Ok(clause),
        }
    }

    fn construct(&self, name: &str, field: Option<&str>, body: Option<&Value>, version: Version) -> Result<Clause> {
        let constructor = self
            .constructors
            .get(&name.to_lowercase())
            .ok_or_else(|| DslError::UnknownClause(name.to_string()))?;

        let clause = constructor(ClauseArgs {
            field,
            body,
            version,
            registry: self,
        })?;
        debug!(clause = %clause.kind(), %version, from_body = body.is_some(), "Resolved clause");
        Ok(clause)
    }
}

impl Default for ClauseRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseKind;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_registry_has_builtin_clauses() {
        let registry = ClauseRegistry::builtin();
        for name in ["bool", "TERM", "terms", "match", "range", "sort", "aggs", "highlight", "dsl", "request"] {
            assert!(registry.has_clause(name), "{name}");
        }
        assert!(!registry.has_clause("wildcard"));
        assert!(ClauseRegistry::empty().clause_names().is_empty());
    }

    #[test]
    fn test_create_by_name() {
        let registry = ClauseRegistry::builtin();
        let clause = registry.create("range", Some("age"), Version::default()).unwrap();
        assert_eq!(clause.kind(), ClauseKind::Range);
        assert_eq!(Value::from(clause), json!({"range": {"age": {}}}));

        let clause = registry.create("request", None, Version::new(7, 0)).unwrap();
        assert_eq!(clause.kind(), ClauseKind::Request);

        assert_eq!(
            registry.create("term", None, Version::default()).unwrap_err(),
            DslError::MissingField { clause: "term", what: "field name" }
        );
        assert_eq!(
            registry.create("wildcard", Some("a"), Version::default()).unwrap_err(),
            DslError::UnknownClause("wildcard".into())
        );
    }

    #[test]
    fn test_create_rejects_unsupported_versions() {
        let registry = ClauseRegistry::builtin();
        for version in [Version::new(4, 9), Version::new(8, 0)] {
            assert_eq!(
                registry.create("bool", None, version).unwrap_err(),
                DslError::InvalidVersion(version)
            );
        }
    }

    #[test]
    fn test_resolve_is_idempotent_for_built_clauses() {
        let registry = ClauseRegistry::builtin();
        let built = registry.create("bool", None, Version::default()).unwrap();
        let resolved = registry.resolve(built.clone(), Version::new(7, 0)).unwrap();
        assert_eq!(resolved, built);
    }

    #[test]
    fn test_custom_constructor() {
        fn match_all(args: ClauseArgs<'_>) -> Result<Clause> {
            let mut group = boolean::BoolQuery::new(args.version)?;
            group.with_must(json!({"match_all": {}}));
            Ok(Clause::Bool(group))
        }

        let mut registry = ClauseRegistry::empty();
        registry.register("Everything", match_all);
        let clause = registry.resolve("everything", Version::default()).unwrap();
        assert_eq!(Value::from(clause), json!({"bool": {"must": [{"match_all": {}}]}}));
    }

    #[test]
    #[traced_test]
    fn test_resolution_is_logged() {
        let registry = ClauseRegistry::builtin();
        registry
            .from_document(&json!({"term": {"host": {"value": "a"}}}), Version::default())
            .unwrap();
        assert!(logs_contain("Resolved clause"));
    }
}
