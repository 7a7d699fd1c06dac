//! Subject metadata: resolution and caching.
//!
//! Metadata for a subject is the id/label table of each of its distribution
//! variables. It is an enrichment aid, never a hard dependency:
//!
//! - if the variable list cannot be fetched, the subject resolves to empty
//!   metadata;
//! - if one variable's values cannot be fetched, that variable is left out
//!   and the others still resolve.
//!
//! Resolved metadata is cached per subject for the lifetime of the
//! resolver, including empty results, until `clear()` or `invalidate()`.
//! The cache is owned by one resolver, so separate clients never share it.

use crate::cache::{CacheStats, MetadataCache};
use crate::error::Result;
use crate::types::{Variable, VariableValue};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Source of subject variables and their values.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// List the distribution variables of `subject`.
    async fn variables(&self, subject: &str) -> Result<Vec<Variable>>;

    /// List every value of `variable` in `subject`.
    async fn values(&self, subject: &str, variable: &str) -> Result<Vec<VariableValue>>;
}

/// The id/label table of one distribution variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableTable {
    pub variable: String,
    pub values: Vec<VariableValue>,
}

impl VariableTable {
    pub fn new(variable: impl Into<String>, values: Vec<VariableValue>) -> Self {
        Self {
            variable: variable.into(),
            values,
        }
    }

    /// Map from lookup key to label. When an id repeats, the first entry wins.
    pub fn labels(&self) -> IndexMap<String, Value> {
        let mut labels = IndexMap::new();
        for value in &self.values {
            if let Some(key) = lookup_key(&value.id) {
                labels.entry(key).or_insert_with(|| value.text.clone());
            }
        }
        labels
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Key used to match an identifier in a data row against metadata ids.
///
/// Integers and strings compare by their text form, so an id of `1` in a
/// row matches `"1"` in metadata. Whole floats compare as integers. Other
/// values never match.
pub fn lookup_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// Metadata of one subject: variable name to its value table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectMetadata {
    variables: IndexMap<String, VariableTable>,
}

impl SubjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable table, returning `self` for chaining.
    pub fn with(mut self, variable: impl Into<String>, values: Vec<VariableValue>) -> Self {
        self.insert(VariableTable::new(variable, values));
        self
    }

    pub fn insert(&mut self, table: VariableTable) {
        self.variables.insert(table.variable.clone(), table);
    }

    pub fn get(&self, variable: &str) -> Option<&VariableTable> {
        self.variables.get(variable)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.variables.contains_key(variable)
    }

    /// Number of resolved variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableTable> {
        self.variables.values()
    }
}

/// Resolves subject metadata through a [`MetadataSource`], caching results.
#[derive(Debug)]
pub struct MetadataResolver {
    cache: MetadataCache,
}

impl MetadataResolver {
    pub fn new(cache: MetadataCache) -> Self {
        Self { cache }
    }

    /// Metadata for `subject`, fetched on first use.
    ///
    /// Never fails: fetch errors are logged and degrade to missing variables.
    pub async fn resolve<S>(&self, source: &S, subject: &str) -> Arc<SubjectMetadata>
    where
        S: MetadataSource + ?Sized,
    {
        if let Some(cached) = self.cache.get(subject).await {
            return cached;
        }

        tracing::info!(subject = %subject, "Fetching metadata for subject");
        let metadata = Arc::new(Self::fetch(source, subject).await);
        self.cache.put(subject.to_string(), metadata.clone()).await;
        metadata
    }

    async fn fetch<S>(source: &S, subject: &str) -> SubjectMetadata
    where
        S: MetadataSource + ?Sized,
    {
        let mut metadata = SubjectMetadata::new();

        let variables = match source.variables(subject).await {
            Ok(variables) => variables,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "Could not fetch subject variables");
                return metadata;
            }
        };

        for name in variables.into_iter().filter_map(|v| v.name) {
            if name.is_empty() {
                continue;
            }
            match source.values(subject, &name).await {
                Ok(values) if values.is_empty() => {
                    tracing::debug!(subject = %subject, variable = %name, "Variable has no values");
                }
                Ok(values) => {
                    tracing::debug!(variable = %name, entries = values.len(), "Resolved variable metadata");
                    metadata.insert(VariableTable::new(name, values));
                }
                Err(e) => {
                    tracing::warn!(
                        subject = %subject,
                        variable = %name,
                        error = %e,
                        "Could not fetch metadata for variable"
                    );
                }
            }
        }

        metadata
    }

    pub async fn invalidate(&self, subject: &str) {
        self.cache.invalidate(subject).await;
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn value(id: Value, text: &str) -> VariableValue {
        serde_json::from_value(json!({ "id": id, "text": text })).unwrap()
    }

    fn variable(name: &str) -> Variable {
        serde_json::from_value(json!({ "namn": name, "text": name })).unwrap()
    }

    /// In-memory source that counts calls and can fail selectively.
    #[derive(Default)]
    struct FakeSource {
        variables: Option<Vec<Variable>>,
        values: HashMap<String, Vec<VariableValue>>,
        variable_calls: AtomicUsize,
        value_calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        async fn variables(&self, subject: &str) -> Result<Vec<Variable>> {
            self.variable_calls.fetch_add(1, Ordering::SeqCst);
            self.variables
                .clone()
                .ok_or_else(|| ClientError::NotFound(subject.to_string()))
        }

        async fn values(&self, _subject: &str, variable: &str) -> Result<Vec<VariableValue>> {
            self.value_calls.fetch_add(1, Ordering::SeqCst);
            self.values
                .get(variable)
                .cloned()
                .ok_or_else(|| ClientError::RequestFailed {
                    status: Some(500),
                    message: "boom".to_string(),
                })
        }
    }

    fn kon_source() -> FakeSource {
        FakeSource {
            variables: Some(vec![variable("kon"), variable("region")]),
            values: HashMap::from([
                (
                    "kon".to_string(),
                    vec![value(json!(1), "Man"), value(json!(2), "Kvinna")],
                ),
                ("region".to_string(), vec![value(json!(1), "Stockholm")]),
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_is_cached_per_subject() {
        let source = kon_source();
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        let first = resolver.resolve(&source, "dodsorsaker").await;
        let second = resolver.resolve(&source, "dodsorsaker").await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(source.variable_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.value_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let source = kon_source();
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        resolver.resolve(&source, "dodsorsaker").await;
        resolver.clear().await;
        resolver.resolve(&source, "dodsorsaker").await;

        assert_eq!(source.variable_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_variable_is_skipped() {
        let mut source = kon_source();
        source.values.remove("region");
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        let metadata = resolver.resolve(&source, "dodsorsaker").await;

        assert!(metadata.contains("kon"));
        assert!(!metadata.contains("region"));
    }

    #[tokio::test]
    async fn test_failed_variable_list_resolves_empty() {
        let source = FakeSource::default();
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        let metadata = resolver.resolve(&source, "dodsorsaker").await;

        assert!(metadata.is_empty());
        assert_eq!(source.value_calls.load(Ordering::SeqCst), 0);

        resolver.resolve(&source, "dodsorsaker").await;
        assert_eq!(source.variable_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_variable_entry_does_not_hide_others() {
        let mut source = kon_source();
        source.variables = Some(
            serde_json::from_value(json!([
                {"namn": "kon", "text": "Kön"},
                {"namn": 7, "text": "Numeric name"}
            ]))
            .unwrap(),
        );
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        let metadata = resolver.resolve(&source, "dodsorsaker").await;

        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("kon").unwrap().labels()["1"], json!("Man"));
        assert_eq!(source.value_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_variables_without_values_are_skipped() {
        let mut source = kon_source();
        source.values.insert("region".to_string(), Vec::new());
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        let metadata = resolver.resolve(&source, "dodsorsaker").await;

        assert_eq!(metadata.len(), 1);
        assert!(metadata.contains("kon"));
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let source = kon_source();
        let resolver = MetadataResolver::new(MetadataCache::new(None));

        assert_eq!(resolver.cache_stats().await, CacheStats::default());

        resolver.resolve(&source, "dodsorsaker").await;
        resolver.resolve(&source, "amning").await;

        let stats = resolver.cache_stats().await;
        assert_eq!(stats.cached_subjects, 2);
        assert_eq!(stats.total_variables, 4);
    }

    #[test]
    fn test_labels_first_occurrence_wins() {
        let table = VariableTable::new(
            "kon",
            vec![
                value(json!(1), "Man"),
                value(json!(1), "Duplicate"),
                value(json!("2"), "Kvinna"),
            ],
        );

        let labels = table.labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["1"], json!("Man"));
        assert_eq!(labels["2"], json!("Kvinna"));
    }

    #[test]
    fn test_lookup_key() {
        assert_eq!(lookup_key(&json!(1)), Some("1".to_string()));
        assert_eq!(lookup_key(&json!(1.0)), Some("1".to_string()));
        assert_eq!(lookup_key(&json!("B15")), Some("B15".to_string()));
        assert_eq!(lookup_key(&json!(null)), None);
        assert_eq!(lookup_key(&json!(true)), None);
    }
}
