//! Decoder configuration

use super::decoders::{extract_records, lookup_path};
use crate::error::{Error, Result};
use crate::state::{FetchBatch, Item};
use crate::types::{CursorFormat, JsonValue};

/// Describes how a polled endpoint lays out its response
#[derive(Debug, Clone)]
pub struct BatchDecoder {
    /// Endpoint name used in error messages
    pub endpoint: String,
    /// Dot path to the record array (`None` = the body is the array)
    pub records_path: Option<String>,
    /// Dot path to a record's unique id, relative to the record
    pub id_path: Option<String>,
    /// Dot path to a record's timestamp, relative to the record
    pub position_path: String,
    /// Format of timestamps in this response
    pub position_format: CursorFormat,
    /// Dot path to the continuation token
    pub token_path: Option<String>,
    /// Dot path to the server high-water mark
    pub watermark_path: Option<String>,
    /// Dot path to the oldest retained position
    pub oldest_path: Option<String>,
    /// Records without a timestamp sort first instead of failing
    pub position_optional: bool,
}

impl BatchDecoder {
    /// Create a decoder reading records from `records_path`
    pub fn new(
        endpoint: impl Into<String>,
        records_path: impl Into<String>,
        position_path: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            records_path: Some(records_path.into()),
            id_path: None,
            position_path: position_path.into(),
            position_format: CursorFormat::default(),
            token_path: None,
            watermark_path: None,
            oldest_path: None,
            position_optional: false,
        }
    }

    /// Set the id path
    #[must_use]
    pub fn id(mut self, path: impl Into<String>) -> Self {
        self.id_path = Some(path.into());
        self
    }

    /// Set the timestamp format
    #[must_use]
    pub fn format(mut self, format: CursorFormat) -> Self {
        self.position_format = format;
        self
    }

    /// Set the continuation token path
    #[must_use]
    pub fn token(mut self, path: impl Into<String>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Set the high-water mark path
    #[must_use]
    pub fn watermark(mut self, path: impl Into<String>) -> Self {
        self.watermark_path = Some(path.into());
        self
    }

    /// Set the oldest-available path
    #[must_use]
    pub fn oldest(mut self, path: impl Into<String>) -> Self {
        self.oldest_path = Some(path.into());
        self
    }

    /// Accept records whose timestamp is missing or null
    #[must_use]
    pub fn position_optional(mut self) -> Self {
        self.position_optional = true;
        self
    }

    /// Decode a response body into a batch.
    ///
    /// Items are stably sorted by position, so records sharing a timestamp
    /// keep the order the server sent them in.
    pub fn decode(&self, body: &JsonValue) -> Result<FetchBatch> {
        let records = extract_records(body, self.records_path.as_deref())
            .map_err(|message| Error::schema(&self.endpoint, message))?;

        let mut items = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.decode_item(index, record))
            .collect::<Result<Vec<_>>>()?;
        items.sort_by_key(|item| item.position);

        let next_token = match self.token_path.as_deref().and_then(|p| lookup_path(body, p)) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.is_empty() => None,
            Some(JsonValue::String(s)) => Some(s),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(Error::schema(
                    &self.endpoint,
                    format!("continuation token is not a string: {other}"),
                ))
            }
        };

        Ok(FetchBatch {
            items,
            next_token,
            high_watermark: self.optional_position(body, self.watermark_path.as_deref())?,
            oldest_available: self.optional_position(body, self.oldest_path.as_deref())?,
        })
    }

    fn decode_item(&self, index: usize, record: JsonValue) -> Result<Item> {
        if !record.is_object() {
            return Err(Error::schema(
                &self.endpoint,
                format!("record {index} is not an object"),
            ));
        }

        let position = match lookup_path(&record, &self.position_path) {
            None | Some(JsonValue::Null) if self.position_optional => 0,
            None => {
                return Err(Error::schema(
                    &self.endpoint,
                    format!("record {index} has no '{}' field", self.position_path),
                ))
            }
            Some(raw) => self.position_format.to_millis(&raw).ok_or_else(|| {
                Error::schema(
                    &self.endpoint,
                    format!(
                        "record {index} has an unreadable '{}' value: {raw}",
                        self.position_path
                    ),
                )
            })?,
        };

        let id = self
            .id_path
            .as_deref()
            .and_then(|path| lookup_path(&record, path))
            .and_then(|value| match value {
                JsonValue::String(s) if !s.is_empty() => Some(s),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(Item {
            id,
            position,
            payload: record,
        })
    }

    fn optional_position(&self, body: &JsonValue, path: Option<&str>) -> Result<Option<i64>> {
        match path.and_then(|p| lookup_path(body, p)) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => self
                .position_format
                .to_millis(&value)
                .map(Some)
                .ok_or_else(|| {
                    Error::schema(&self.endpoint, format!("unreadable position value: {value}"))
                }),
        }
    }
}
