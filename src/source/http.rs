//! Blocking HTTP fetcher built on `ureq`

use super::Fetcher;
use crate::error::{CacheError, CacheResult};
use crate::ui::{DownloadProgress, UiContext};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body};

/// Default timeout for the download URL lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Longest response body quoted in an HTTP status error
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    download_url: String,
}

/// HTTP implementation of [`Fetcher`].
///
/// Only the lookup request has a timeout; archive transfers run as long as
/// they need.
pub struct HttpFetcher {
    lookup: Agent,
    transfer: Agent,
    ui: UiContext,
}

impl HttpFetcher {
    pub fn new(ui: UiContext, lookup_timeout: Duration) -> Self {
        let lookup: Agent = Agent::config_builder()
            .timeout_global(Some(lookup_timeout))
            .http_status_as_error(false)
            .build()
            .into();
        let transfer: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            lookup,
            transfer,
            ui,
        }
    }

    fn get(&self, agent: &Agent, url: &str) -> CacheResult<Response<Body>> {
        agent.get(url).call().map_err(|e| CacheError::http(url, e))
    }
}

/// Read a response body as text for error reporting
fn body_text(url: &str, response: &mut Response<Body>) -> CacheResult<String> {
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| CacheError::http(url, e))
}

/// Body of a rejected response, for the error message only
fn error_body(response: &mut Response<Body>) -> String {
    response
        .body_mut()
        .with_config()
        .limit(ERROR_BODY_LIMIT)
        .read_to_vec()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Archive transfers only accept a complete `200 OK` body
fn is_full_archive(status: u16) -> bool {
    status == 200
}

/// Parse the cache API answer into a download URL
fn parse_lookup(status: u16, body: &str) -> CacheResult<String> {
    if !(200..=202).contains(&status) {
        return Err(CacheError::CacheNotFound { status });
    }

    let response: LookupResponse =
        serde_json::from_str(body).map_err(|e| CacheError::LookupResponseInvalid {
            body: body.to_string(),
            reason: e.to_string(),
        })?;

    if response.download_url.is_empty() {
        return Err(CacheError::LookupResponseInvalid {
            body: body.to_string(),
            reason: "download URL not included in the response".to_string(),
        });
    }
    Ok(response.download_url)
}

impl Fetcher for HttpFetcher {
    fn resolve_download_url(&self, api_url: &str) -> CacheResult<String> {
        let mut response = self.get(&self.lookup, api_url)?;
        let status = response.status().as_u16();
        let body = body_text(api_url, &mut response)?;
        debug!("Cache API answered {}", status);
        parse_lookup(status, &body)
    }

    fn open(&self, url: &str) -> CacheResult<Box<dyn Read>> {
        let mut response = self.get(&self.transfer, url)?;
        let status = response.status().as_u16();
        if !is_full_archive(status) {
            let body = error_body(&mut response);
            return Err(CacheError::HttpStatus {
                url: url.to_string(),
                status,
                body,
            });
        }
        debug!(
            "Streaming archive, content length: {:?}",
            response.body().content_length()
        );
        Ok(Box::new(response.into_body().into_reader()))
    }

    fn download(&self, url: &str, dest: &Path) -> CacheResult<u64> {
        let mut response = self.get(&self.transfer, url)?;
        let status = response.status().as_u16();
        if !is_full_archive(status) {
            let body = error_body(&mut response);
            return Err(CacheError::HttpStatus {
                url: url.to_string(),
                status,
                body,
            });
        }

        let progress = DownloadProgress::new(&self.ui, response.body().content_length());
        let mut file = File::create(dest).map_err(|e| {
            CacheError::io(
                format!("opening the local cache file {} for write", dest.display()),
                e,
            )
        })?;
        let mut body = progress.wrap(response.into_body().into_reader());
        let written = io::copy(&mut body, &mut file)
            .map_err(|e| CacheError::io(format!("downloading {}", url), e))?;
        progress.finish();

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
