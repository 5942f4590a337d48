//! Endpoint catalog

use crate::decode::BatchDecoder;
use crate::types::CursorFormat;
use clap::ValueEnum;
use std::fmt;

/// Which audit log to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogKind {
    /// User access events
    Access,
    /// Administrative changes
    Admin,
}

impl LogKind {
    /// API path of this log
    pub fn path(self) -> &'static str {
        match self {
            LogKind::Access => "/api/v1/logs/access",
            LogKind::Admin => "/api/v1/logs/admin",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Access => write!(f, "access"),
            LogKind::Admin => write!(f, "admin"),
        }
    }
}

/// Listable catalog resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// TLS certificates
    Certificates,
    /// Published applications
    Apps,
    /// Identity providers
    Idps,
    /// User directories
    Directories,
    /// On-premises connectors
    Connectors,
}

impl Resource {
    /// API path of this resource
    pub fn path(self) -> &'static str {
        match self {
            Resource::Certificates => "/api/v1/certificates",
            Resource::Apps => "/api/v1/apps",
            Resource::Idps => "/api/v1/idp",
            Resource::Directories => "/api/v1/directories",
            Resource::Connectors => "/api/v1/connectors",
        }
    }

    /// Name used in messages
    pub fn name(self) -> &'static str {
        match self {
            Resource::Certificates => "certificates",
            Resource::Apps => "apps",
            Resource::Idps => "identity providers",
            Resource::Directories => "directories",
            Resource::Connectors => "connectors",
        }
    }
}

/// Layout of a log page.
///
/// ```text
/// {"data": [{"id": "...", "ts": 1700000000000, ...}],
///  "meta": {"next_cursor": "...", "high_watermark": ..., "oldest_available": ...}}
/// ```
pub fn log_decoder(kind: LogKind) -> BatchDecoder {
    BatchDecoder::new(kind.path(), "data", "ts")
        .id("id")
        .format(CursorFormat::UnixMs)
        .token("meta.next_cursor")
        .watermark("meta.high_watermark")
        .oldest("meta.oldest_available")
}

/// Layout of a connector status snapshot.
///
/// A connector is identified by its name across snapshots, so a changed
/// record is a new item while a repeated one is not. A connector that
/// never checked in sorts before everything else.
pub fn connector_decoder() -> BatchDecoder {
    BatchDecoder::new(Resource::Connectors.path(), "objects", "last_checkin")
        .id("name")
        .format(CursorFormat::Iso8601)
        .position_optional()
        .watermark("meta.server_time")
}
