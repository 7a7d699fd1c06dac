//! Query construction: path segments and query parameters.
//!
//! Every endpoint of the service is addressed by path:
//!
//! ```text
//! {base}/{version}/{language}/{subject}/{variable}[/{ids} | /text/{text}]
//! {base}/{version}/{language}/{subject}/resultat/{key}/{value}/...
//! ```
//!
//! Arguments are validated while the [`QuerySpec`] is built, so invalid input
//! never reaches the network.

use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::{ClientError, Result};
use crate::filter::{FilterValue, Filters};
use crate::pagination::PaginationOptions;
use std::time::Duration;

/// Path marker for data endpoints.
pub const RESULT_SEGMENT: &str = "resultat";

/// Filter name of the measure.
pub const MEASURE_KEY: &str = "matt";

/// Ordered path segments plus non-path query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    segments: Vec<String>,
    params: Vec<(&'static str, String)>,
}

impl QuerySpec {
    /// Start from the `{version}/{language}` prefix shared by subject endpoints.
    pub fn new(version: &str, language: &str) -> Self {
        Self::default().segment(version).segment(language)
    }

    /// Append one raw path segment. Empty segments are skipped.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if !segment.is_empty() {
            self.segments.push(segment);
        }
        self
    }

    /// Append a query parameter.
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Render the full URL below `base_url`. Segments are percent-encoded
    /// token by token so the commas of joined lists stay literal.
    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.segments.is_empty() {
            return base.to_string();
        }
        let path = self
            .segments
            .iter()
            .map(|segment| encode_segment(segment))
            .collect::<Vec<_>>()
            .join("/");
        format!("{base}/{path}")
    }
}

fn encode_segment(segment: &str) -> String {
    segment
        .split(',')
        .map(|token| urlencoding::encode(token).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Filter for a variable-values lookup.
///
/// At most one of `ids` and `text` may be set; an empty id list or empty
/// text counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueQuery {
    pub ids: Option<FilterValue>,
    pub text: Option<String>,
}

impl ValueQuery {
    /// All values of the variable.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the values with the given ids.
    pub fn ids(ids: impl Into<FilterValue>) -> Self {
        Self {
            ids: Some(ids.into()),
            text: None,
        }
    }

    /// Only the values whose label contains `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            ids: None,
            text: Some(text.into()),
        }
    }

    /// Build the query for `variable` of `subject`.
    pub fn to_spec(
        &self,
        version: &str,
        language: &str,
        subject: &str,
        variable: &str,
    ) -> Result<QuerySpec> {
        require_name("variable", variable)?;

        let ids = self.ids.as_ref().filter(|ids| !ids.is_empty());
        let text = self.text.as_deref().filter(|text| !text.is_empty());

        let spec = subject_spec(version, language, subject)?.segment(variable);

        match (ids, text) {
            (Some(_), Some(_)) => Err(ClientError::Validation(
                "cannot specify both 'ids' and 'text' for a variable lookup".to_string(),
            )),
            (Some(ids), None) => Ok(spec.segment(ids.normalize())),
            (None, Some(text)) => Ok(spec.segment("text").segment(text)),
            (None, None) => Ok(spec),
        }
    }
}

/// A data request for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuery {
    /// Subject name, e.g. "dodsorsaker"
    pub subject: String,
    /// Measure filter (`matt`)
    pub measure: Option<FilterValue>,
    /// Named filters, emitted in order after the measure
    pub filters: Filters,
    /// Records per page; `per_sida` is only sent when it differs from the default
    pub page_size: u32,
    /// Explicit page index; implies no pagination beyond this page
    pub page: Option<u32>,
    /// Follow next-page links (default: true)
    pub auto_paginate: bool,
    /// Maximum number of pages to fetch, including the first
    pub max_pages: Option<u32>,
}

impl DataQuery {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            measure: None,
            filters: Filters::new(),
            page_size: DEFAULT_PAGE_SIZE,
            page: None,
            auto_paginate: true,
            max_pages: None,
        }
    }

    /// Set the measure (`matt`) filter.
    pub fn measure(mut self, measure: impl Into<FilterValue>) -> Self {
        self.measure = Some(measure.into());
        self
    }

    /// Add a named filter, e.g. `.filter("ar", 2018..2021)`.
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(name, value);
        self
    }

    /// Replace all named filters.
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Request exactly this page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn auto_paginate(mut self, enabled: bool) -> Self {
        self.auto_paginate = enabled;
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Build the query for the first page.
    pub fn to_spec(&self, version: &str, language: &str) -> Result<QuerySpec> {
        require_name("subject", &self.subject)?;

        if self.page_size == 0 {
            return Err(ClientError::Validation(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.page == Some(0) {
            return Err(ClientError::Validation(
                "page index starts at 1".to_string(),
            ));
        }
        if self.max_pages == Some(0) {
            return Err(ClientError::Validation(
                "max_pages must be at least 1".to_string(),
            ));
        }
        if self.measure.is_some() && self.filters.contains(MEASURE_KEY) {
            return Err(ClientError::Validation(format!(
                "'{MEASURE_KEY}' given both as measure and as a named filter"
            )));
        }

        let mut spec = QuerySpec::new(version, language)
            .segment(self.subject.as_str())
            .segment(RESULT_SEGMENT);

        let measure = self.measure.as_ref().map(|m| (MEASURE_KEY, m));
        for (name, value) in measure.into_iter().chain(self.filters.iter()) {
            require_name("filter", name)?;
            if value.is_empty() {
                return Err(ClientError::Validation(format!(
                    "filter '{name}' has no values"
                )));
            }
            spec = spec.segment(name).segment(value.normalize());
        }

        if self.page_size != DEFAULT_PAGE_SIZE {
            spec = spec.param("per_sida", self.page_size);
        }
        if let Some(page) = self.page {
            spec = spec.param("sida", page);
        }

        Ok(spec)
    }

    /// Pagination settings for this query.
    pub fn pagination_options(&self, page_delay: Duration) -> PaginationOptions {
        PaginationOptions {
            auto_paginate: self.auto_paginate,
            max_pages: self.max_pages,
            explicit_page: self.page.is_some(),
            page_delay,
        }
    }
}

/// Path of a subject's variable list: `{version}/{language}/{subject}`.
pub fn subject_spec(version: &str, language: &str, subject: &str) -> Result<QuerySpec> {
    require_name("subject", subject)?;
    Ok(QuerySpec::new(version, language).segment(subject))
}

fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ClientError::Validation(format!("{what} name cannot be empty")));
    }
    if name.contains('/') {
        return Err(ClientError::Validation(format!(
            "{what} name cannot contain '/': {name}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://sdb.socialstyrelsen.se/api";

    #[test]
    fn test_data_query_path_and_params() {
        let spec = DataQuery::new("dodsorsaker")
            .measure(1)
            .filter("diagnos", "99")
            .filter("ar", 2020..2022)
            .to_spec("v1", "sv")
            .unwrap();

        assert_eq!(
            spec.url(BASE),
            "https://sdb.socialstyrelsen.se/api/v1/sv/dodsorsaker/resultat/matt/1/diagnos/99/ar/2020,2021"
        );
        assert!(spec.params().is_empty());
    }

    #[test]
    fn test_data_query_params_only_when_needed() {
        let spec = DataQuery::new("amning")
            .page_size(100)
            .page(3)
            .to_spec("v1", "en")
            .unwrap();

        assert_eq!(spec.url(BASE), format!("{BASE}/v1/en/amning/resultat"));
        assert_eq!(
            spec.params(),
            &[("per_sida", "100".to_string()), ("sida", "3".to_string())]
        );
    }

    #[test]
    fn test_data_query_rejects_duplicate_measure() {
        let err = DataQuery::new("dodsorsaker")
            .measure(1)
            .filter("matt", 2)
            .to_spec("v1", "sv")
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_data_query_rejects_empty_filter() {
        let err = DataQuery::new("dodsorsaker")
            .filter("ar", Vec::<i64>::new())
            .to_spec("v1", "sv")
            .unwrap_err();
        assert!(err.to_string().contains("ar"));
    }

    #[test]
    fn test_data_query_rejects_zero_limits() {
        assert!(DataQuery::new("x").max_pages(0).to_spec("v1", "sv").is_err());
        assert!(DataQuery::new("x").page(0).to_spec("v1", "sv").is_err());
        assert!(DataQuery::new("x").page_size(0).to_spec("v1", "sv").is_err());
        assert!(DataQuery::new("").to_spec("v1", "sv").is_err());
    }

    #[test]
    fn test_pagination_options_mark_explicit_page() {
        let options = DataQuery::new("x")
            .page(2)
            .pagination_options(Duration::ZERO);
        assert!(options.explicit_page);
        assert!(options.auto_paginate);

        let options = DataQuery::new("x").pagination_options(Duration::ZERO);
        assert!(!options.explicit_page);
    }

    #[test]
    fn test_value_query_variants() {
        let all = ValueQuery::all().to_spec("v1", "sv", "dodsorsaker", "region").unwrap();
        assert_eq!(all.url(BASE), format!("{BASE}/v1/sv/dodsorsaker/region"));

        let ids = ValueQuery::ids(vec![1, 3])
            .to_spec("v1", "sv", "dodsorsaker", "region")
            .unwrap();
        assert_eq!(ids.url(BASE), format!("{BASE}/v1/sv/dodsorsaker/region/1,3"));

        let text = ValueQuery::text("botten")
            .to_spec("v1", "sv", "dodsorsaker", "region")
            .unwrap();
        assert_eq!(
            text.url(BASE),
            format!("{BASE}/v1/sv/dodsorsaker/region/text/botten")
        );
    }

    #[test]
    fn test_value_query_rejects_ids_and_text() {
        let query = ValueQuery {
            ids: Some(FilterValue::from(vec![1])),
            text: Some("test".to_string()),
        };
        let err = query
            .to_spec("v1", "sv", "dodsorsaker", "region")
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_value_query_empty_filters_are_unset() {
        let query = ValueQuery {
            ids: Some(FilterValue::from(Vec::<i64>::new())),
            text: Some("Skåne".to_string()),
        };
        let spec = query.to_spec("v1", "sv", "dodsorsaker", "region").unwrap();
        assert_eq!(
            spec.url(BASE),
            format!("{BASE}/v1/sv/dodsorsaker/region/text/Sk%C3%A5ne")
        );
    }

    #[test]
    fn test_url_encodes_tokens_but_not_commas() {
        let spec = QuerySpec::new("v1", "sv")
            .segment("amne")
            .segment("a b,c/d");
        assert_eq!(spec.url("http://localhost/"), "http://localhost/v1/sv/amne/a%20b,c%2Fd");
    }

    #[test]
    fn test_empty_spec_is_base_url() {
        assert_eq!(QuerySpec::default().url("http://localhost:8080/api/"), "http://localhost:8080/api");
    }
}
