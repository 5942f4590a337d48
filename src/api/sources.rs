//! Tail sources

use super::client::ApiClient;
use super::resources::{connector_decoder, log_decoder, LogKind, Resource};
use crate::decode::BatchDecoder;
use crate::engine::BatchSource;
use crate::error::Result;
use crate::http::RequestConfig;
use crate::state::{FetchBatch, PollCursor};
use async_trait::async_trait;
use std::sync::Arc;

/// Polls one audit log
#[derive(Debug)]
pub struct LogSource {
    client: Arc<ApiClient>,
    kind: LogKind,
    decoder: BatchDecoder,
}

impl LogSource {
    /// Create a source for `kind`
    pub fn new(client: Arc<ApiClient>, kind: LogKind) -> Self {
        Self {
            client,
            kind,
            decoder: log_decoder(kind),
        }
    }

    fn request(&self, cursor: &PollCursor) -> RequestConfig {
        let config = RequestConfig::new()
            .retries(0)
            .query("limit", self.client.page_size().to_string());

        // A token already encodes its position; `from` is inclusive
        match cursor {
            PollCursor::Beginning => config,
            PollCursor::Position(ms) => config.query("from", ms.to_string()),
            PollCursor::Token { token, .. } => config.query("cursor", token.as_str()),
        }
    }
}

#[async_trait]
impl BatchSource for LogSource {
    fn name(&self) -> &str {
        self.kind.path()
    }

    async fn fetch(&mut self, cursor: &PollCursor) -> Result<FetchBatch> {
        let body = self
            .client
            .get_json(self.kind.path(), self.request(cursor))
            .await?;
        self.decoder.decode(&body)
    }
}

/// Polls connector status snapshots
#[derive(Debug)]
pub struct ConnectorSource {
    client: Arc<ApiClient>,
    decoder: BatchDecoder,
}

impl ConnectorSource {
    /// Create a connector status source
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            decoder: connector_decoder(),
        }
    }
}

#[async_trait]
impl BatchSource for ConnectorSource {
    fn name(&self) -> &str {
        Resource::Connectors.path()
    }

    async fn fetch(&mut self, cursor: &PollCursor) -> Result<FetchBatch> {
        let config = RequestConfig::new()
            .retries(0)
            .query("limit", self.client.page_size().to_string());
        let body = self
            .client
            .get_json(Resource::Connectors.path(), config)
            .await?;
        let mut batch = self.decoder.decode(&body)?;

        // A snapshot lists every connector, including ones that have not
        // checked in since the cursor. Its watermark never trails the cursor.
        let watermark = [batch.trailing_position(), cursor.position()]
            .into_iter()
            .flatten()
            .max();
        batch.high_watermark = watermark;
        Ok(batch)
    }

    fn is_snapshot(&self) -> bool {
        true
    }
}
