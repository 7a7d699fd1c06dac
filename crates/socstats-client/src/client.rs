//! HTTP client for the statistics API, with pagination and label enrichment.

use crate::cache::{CacheStats, MetadataCache};
use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::enrich;
use crate::error::Result;
use crate::http::RequestExecutor;
use crate::metadata::{MetadataResolver, MetadataSource, SubjectMetadata};
use crate::pagination::collect_pages;
use crate::query::{subject_spec, DataQuery, QuerySpec, ValueQuery};
use crate::table::Table;
use crate::types::{CodeText, DataPage, Subject, Variable, VariableValue};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Statistics API client with automatic retries and cached metadata.
#[derive(Debug)]
pub struct StatsClient {
    executor: RequestExecutor,
    config: ClientConfig,
    resolver: MetadataResolver,
}

impl StatsClient {
    /// Create a new client builder with the given base URL.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let executor = RequestExecutor::new(&config)?;
        let resolver = MetadataResolver::new(MetadataCache::new(config.metadata_cache_capacity));

        Ok(Self {
            executor,
            config,
            resolver,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Meta API
    // =========================================================================

    /// List API versions.
    pub async fn list_versions(&self) -> Result<Vec<CodeText>> {
        self.get(&QuerySpec::default()).await
    }

    /// List response languages of the configured version.
    pub async fn list_languages(&self) -> Result<Vec<CodeText>> {
        self.get(&QuerySpec::default().segment(self.config.version.as_str()))
            .await
    }

    /// List all subjects.
    pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.get(&self.spec()).await
    }

    /// List all subjects as a table.
    pub async fn list_subjects_table(&self) -> Result<Table> {
        Table::from_records(&self.list_subjects().await?)
    }

    /// List the distribution variables of a subject.
    pub async fn subject_variables(&self, subject: &str) -> Result<Vec<Variable>> {
        let spec = subject_spec(&self.config.version, &self.config.language, subject)?;
        self.get(&spec).await
    }

    /// List the distribution variables of a subject as a table.
    pub async fn subject_variables_table(&self, subject: &str) -> Result<Table> {
        Table::from_records(&self.subject_variables(subject).await?)
    }

    /// List the values of a distribution variable.
    ///
    /// ```rust,ignore
    /// let regions = client
    ///     .variable_values("dodsorsaker", "region", &ValueQuery::ids([1, 3]))
    ///     .await?;
    /// ```
    pub async fn variable_values(
        &self,
        subject: &str,
        variable: &str,
        query: &ValueQuery,
    ) -> Result<Vec<VariableValue>> {
        let spec = query.to_spec(
            &self.config.version,
            &self.config.language,
            subject,
            variable,
        )?;
        self.get(&spec).await
    }

    /// List the values of a distribution variable as a table.
    pub async fn variable_values_table(
        &self,
        subject: &str,
        variable: &str,
        query: &ValueQuery,
    ) -> Result<Table> {
        Table::from_records(&self.variable_values(subject, variable, query).await?)
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Fetch data for a subject, following next-page links unless the query
    /// disables pagination or asks for a specific page.
    ///
    /// Arguments are validated before any request is sent.
    pub async fn get_data(&self, query: &DataQuery) -> Result<DataPage> {
        let spec = query.to_spec(&self.config.version, &self.config.language)?;

        tracing::debug!(subject = %query.subject, "Fetching data");

        let first: DataPage = self
            .executor
            .execute_as(&spec.url(&self.config.base_url), spec.params())
            .await?;

        let options = query.pagination_options(self.config.page_delay);
        collect_pages(&self.executor, first, &options).await
    }

    /// Fetch data for a subject as a table, optionally with label columns.
    ///
    /// Label enrichment is best-effort: metadata failures leave columns
    /// unlabelled but never fail the call.
    pub async fn get_data_table(&self, query: &DataQuery, include_labels: bool) -> Result<Table> {
        let page = self.get_data(query).await?;

        if page.is_empty() {
            tracing::warn!(subject = %query.subject, "No data returned for query");
            return Ok(Table::from_page(page));
        }

        let mut table = Table::from_page(page);
        if include_labels {
            let metadata = self.metadata(&query.subject).await;
            let added = enrich::enrich_in_place(&mut table.rows, &metadata);
            table
                .columns
                .extend(added.into_iter().map(|column| column.label));
            dedup_columns(&mut table.columns);
        }
        Ok(table)
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Resolve the metadata of a subject, using the cache when possible.
    pub async fn metadata(&self, subject: &str) -> Arc<SubjectMetadata> {
        self.resolver.resolve(self, subject).await
    }

    /// Drop cached metadata for one subject.
    pub async fn invalidate_metadata(&self, subject: &str) {
        self.resolver.invalidate(subject).await;
    }

    /// Clear all cached metadata.
    pub async fn clear_metadata_cache(&self) {
        self.resolver.clear().await;
    }

    /// Get metadata cache statistics.
    pub async fn metadata_cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats().await
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn spec(&self) -> QuerySpec {
        QuerySpec::new(&self.config.version, &self.config.language)
    }

    async fn get<T: DeserializeOwned>(&self, spec: &QuerySpec) -> Result<T> {
        self.executor
            .execute_as(&spec.url(&self.config.base_url), spec.params())
            .await
    }
}

#[async_trait]
impl MetadataSource for StatsClient {
    /// Entries that are not variable records are skipped, so one malformed
    /// entry never hides the others.
    async fn variables(&self, subject: &str) -> Result<Vec<Variable>> {
        let spec = subject_spec(&self.config.version, &self.config.language, subject)?;
        let entries: Vec<Value> = self.get(&spec).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Variable>(entry) {
                Ok(variable) => Some(variable),
                Err(e) => {
                    tracing::warn!(
                        subject = %subject,
                        error = %e,
                        "Skipping malformed variable entry"
                    );
                    None
                }
            })
            .collect())
    }

    async fn values(&self, subject: &str, variable: &str) -> Result<Vec<VariableValue>> {
        self.variable_values(subject, variable, &ValueQuery::all())
            .await
    }
}

/// Keep the first occurrence of each column name.
fn dedup_columns(columns: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    columns.retain(|column| seen.insert(column.clone()));
}

/// Arc-wrapped client for shared ownership.
pub type SharedClient = Arc<StatsClient>;
