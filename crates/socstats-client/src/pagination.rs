//! Following `nasta_sida` links across a paged result.
//!
//! Pages are fetched strictly one after another: the locator of page N+1 is
//! only known once page N has arrived. Records are concatenated in page
//! arrival order, then intra-page order.

use crate::error::Result;
use crate::types::{DataPage, Row};
use async_trait::async_trait;
use std::time::Duration;

/// Fetches one page given a complete next-page locator.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<DataPage>;
}

/// How far to follow a paged result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Follow next-page links at all
    pub auto_paginate: bool,
    /// Stop after this many pages, including the first
    pub max_pages: Option<u32>,
    /// The caller asked for one specific page index
    pub explicit_page: bool,
    /// Pause after each followed page
    pub page_delay: Duration,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            auto_paginate: true,
            max_pages: None,
            explicit_page: false,
            page_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    Initial,
    FetchingNext,
    Done,
}

/// Collect all pages reachable from `first`.
///
/// If pagination does not apply (disabled, explicit page index, or no
/// next-page link) `first` is returned untouched. Otherwise the result holds
/// every fetched record with `sida = 1`, `per_sida` = record count and
/// `sidor` = pages actually fetched. Hitting `max_pages` is not an error;
/// the partial result keeps the last `nasta_sida` so it can be resumed.
pub async fn collect_pages<S>(
    source: &S,
    first: DataPage,
    options: &PaginationOptions,
) -> Result<DataPage>
where
    S: PageSource + ?Sized,
{
    let mut state = PageState::Initial;
    let mut current = first;
    let mut records: Vec<Row> = Vec::new();
    let mut subject = None;
    let mut fetched: u32 = 1;

    loop {
        state = match state {
            PageState::Initial => {
                if !options.auto_paginate
                    || options.explicit_page
                    || current.next_page_url().is_none()
                {
                    return Ok(current);
                }
                records = std::mem::take(&mut current.data);
                subject = current.subject.clone();
                PageState::FetchingNext
            }
            PageState::FetchingNext => {
                let next_url = current.next_page_url().map(str::to_owned);
                match next_url {
                    None => PageState::Done,
                    Some(_) if options.max_pages.is_some_and(|cap| fetched >= cap) => {
                        tracing::info!(max_pages = fetched, "Reached maximum page limit");
                        PageState::Done
                    }
                    Some(url) => {
                        fetched += 1;
                        tracing::info!(page = fetched, "Fetching page");

                        current = source.fetch_page(&url).await?;
                        records.append(&mut current.data);

                        if !options.page_delay.is_zero() {
                            tokio::time::sleep(options.page_delay).await;
                        }
                        PageState::FetchingNext
                    }
                }
            }
            PageState::Done => break,
        };
    }

    tracing::info!(
        records = records.len(),
        pages = fetched,
        "Fetched all records"
    );

    current.per_page = Some(records.len() as u64);
    current.data = records;
    current.page = Some(1);
    current.page_count = Some(u64::from(fetched));
    if current.subject.is_none() {
        current.subject = subject;
    }
    Ok(current)
}
