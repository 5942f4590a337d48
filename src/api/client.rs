//! Single-shot API calls

use super::resources::{log_decoder, LogKind, Resource};
use crate::decode::extract_records;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::output::OutputSink;
use crate::pagination::{
    CursorPaginator, NextPage, OffsetPaginator, PaginationState, Paginator, StopCondition,
};
use crate::types::JsonValue;
use std::collections::HashMap;
use tracing::{debug, info};

/// Records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Authenticated client for the management API
#[derive(Debug)]
pub struct ApiClient {
    http: HttpClient,
    page_size: u32,
}

impl ApiClient {
    /// Wrap a configured HTTP client
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the page size used by listings and tail fetches
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Records requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// GET `path` and parse the JSON body
    pub async fn get_json(&self, path: &str, config: RequestConfig) -> Result<JsonValue> {
        self.http.get_json(path, config).await
    }

    /// Write every record of a catalog resource to `sink`.
    ///
    /// Pages with `offset`/`limit` until the server reports no next page or
    /// returns a short page. Returns the number of records written.
    pub async fn list(&self, resource: Resource, sink: &mut dyn OutputSink) -> Result<u64> {
        let paginator = OffsetPaginator::new(
            "offset",
            "limit",
            self.page_size,
            StopCondition::field("meta.next", JsonValue::Null),
        );
        let written = self
            .paginate(resource.path(), "objects", &paginator, HashMap::new(), sink)
            .await?;
        info!(resource = resource.name(), count = written, "Listed");
        Ok(written)
    }

    /// Write the events of `kind` between `since` and `until` (epoch ms).
    ///
    /// Pages through the server's cursor until it stops handing one out.
    pub async fn fetch_logs(
        &self,
        kind: LogKind,
        since: i64,
        until: Option<i64>,
        sink: &mut dyn OutputSink,
    ) -> Result<u64> {
        let paginator = CursorPaginator::new("cursor", "meta.next_cursor", StopCondition::EmptyPage);
        let mut base = HashMap::new();
        base.insert("from".to_string(), since.to_string());
        if let Some(until) = until {
            base.insert("to".to_string(), until.to_string());
        }
        base.insert("limit".to_string(), self.page_size.to_string());

        let decoder = log_decoder(kind);
        let mut state = PaginationState::new();
        let mut params = paginator.initial_params(&state);
        let mut written = 0u64;

        loop {
            let mut config = RequestConfig::new();
            config.query.extend(base.clone());
            config.query.extend(params);

            let body = self.get_json(kind.path(), config).await?;
            let batch = decoder.decode(&body)?;
            let count = batch.items.len();

            for item in batch
                .items
                .iter()
                .filter(|item| until.map_or(true, |u| item.position <= u))
            {
                sink.emit(item)?;
                written += 1;
            }
            sink.flush()?;
            debug!(log = %kind, page = state.pages + 1, count, "Fetched log page");

            match paginator.process_response(&body, count, &mut state) {
                NextPage::Continue(next) => params = next,
                NextPage::Done => break,
            }
        }

        info!(log = %kind, count = written, "Fetched log window");
        Ok(written)
    }

    async fn paginate(
        &self,
        path: &str,
        records_path: &str,
        paginator: &dyn Paginator,
        base: HashMap<String, String>,
        sink: &mut dyn OutputSink,
    ) -> Result<u64> {
        let mut state = PaginationState::new();
        let mut params = paginator.initial_params(&state);
        let mut written = 0u64;

        loop {
            let mut config = RequestConfig::new();
            config.query.extend(base.clone());
            config.query.extend(params);

            let body = self.get_json(path, config).await?;
            let records = extract_records(&body, Some(records_path))
                .map_err(|message| Error::schema(path, message))?;

            for record in &records {
                sink.write_record(record)?;
            }
            sink.flush()?;
            written += records.len() as u64;
            debug!(path, page = state.pages + 1, count = records.len(), "Fetched page");

            match paginator.process_response(&body, records.len(), &mut state) {
                NextPage::Continue(next) => params = next,
                NextPage::Done => return Ok(written),
            }
        }
    }
}
