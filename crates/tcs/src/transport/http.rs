//! HTTP transport for the TCS automation backend
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Each operation gets
//! its own timeout budget: sync runs drive a browser on the remote side and
//! may take minutes, format previews only render text.

use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::{RemoteError, SyncTransport};
use crate::config::TcsConfig;
use crate::models::{RangePreview, SyncOutcome};

#[derive(Serialize)]
struct AutoFillRequest {
    date: NaiveDate,
    dry_run: bool,
}

#[derive(Serialize)]
struct FormatRequest {
    date: NaiveDate,
}

#[derive(Serialize)]
struct FormatRangeRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

/// `SyncTransport` over the backend's `/api/tcs` endpoints
pub struct HttpTransport {
    agent: ureq::Agent,
    base: Url,
    sync_timeout: Duration,
    preview_timeout: Duration,
}

impl HttpTransport {
    const AUTO_FILL_PATH: &'static str = "api/tcs/auto-fill";
    const FORMAT_PATH: &'static str = "api/tcs/format";
    const FORMAT_RANGE_PATH: &'static str = "api/tcs/format/range";

    /// Create a transport from the client configuration
    pub fn new(config: &TcsConfig) -> anyhow::Result<Self> {
        // Non-2xx responses are read like any other so their `detail` survives
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            base: config.base()?,
            sync_timeout: config.sync_timeout(),
            preview_timeout: config.preview_timeout(),
        })
    }

    /// POST a JSON body and decode a JSON response within `timeout`
    fn post<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T, RemoteError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| RemoteError::network(format!("Invalid endpoint {path}: {e}")))?;

        debug!("POST {} (timeout {}ms)", url, timeout.as_millis());

        let mut response = self
            .agent
            .post(url.as_str())
            .config()
            .timeout_global(Some(timeout))
            .build()
            .send_json(body)
            .map_err(|e| map_transport_error(e, timeout))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| map_transport_error(e, timeout))?;

        if !(200..300).contains(&status) {
            warn!("TCS API error ({}): {}", status, text);
            return Err(RemoteError::from_response(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| RemoteError::decode(format!("Failed to parse {path} response: {e}")))
    }
}

impl SyncTransport for HttpTransport {
    fn trigger_sync(&self, date: NaiveDate, dry_run: bool) -> Result<SyncOutcome, RemoteError> {
        self.post(
            Self::AUTO_FILL_PATH,
            &AutoFillRequest { date, dry_run },
            self.sync_timeout,
        )
    }

    fn preview_format(&self, date: NaiveDate) -> Result<SyncOutcome, RemoteError> {
        self.post(Self::FORMAT_PATH, &FormatRequest { date }, self.preview_timeout)
    }

    fn preview_format_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangePreview, RemoteError> {
        self.post(
            Self::FORMAT_RANGE_PATH,
            &FormatRangeRequest {
                start_date: start,
                end_date: end,
            },
            self.preview_timeout,
        )
    }
}

/// Classify a ureq failure; both timer expiry and socket timeouts count as timeouts
fn map_transport_error(err: ureq::Error, budget: Duration) -> RemoteError {
    match err {
        ureq::Error::Timeout(_) => RemoteError::timeout(budget),
        ureq::Error::Io(ref io) if io.kind() == std::io::ErrorKind::TimedOut => {
            RemoteError::timeout(budget)
        }
        other => RemoteError::network(other.to_string()),
    }
}
