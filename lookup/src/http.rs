//! JSON-over-HTTP lookup client.
//!
//! `GET {base_url}/nodes/{type}/{id}` answers with a JSON [`RemoteRecord`].
//! Transport errors, non-2xx statuses, undecodable bodies and records for the
//! wrong id are all lookup failures. Nothing is retried.

use std::time::Duration;

use canopy_types::{NodeId, RemoteRecord};
use reqwest::Client;

use crate::{LookupError, RemoteLookup};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: Client,
    base_url: String,
}

impl HttpLookup {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, id: NodeId, kind: &str) -> String {
        format!("{}/nodes/{kind}/{id}", self.base_url)
    }
}

impl RemoteLookup for HttpLookup {
    async fn fetch(&self, id: NodeId, kind: &str) -> Result<RemoteRecord, LookupError> {
        let url = self.record_url(id, kind);
        tracing::debug!(%id, kind, url = %url, "Fetching record");

        let request_error = |source| LookupError::Request {
            id,
            kind: kind.to_string(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                id,
                kind: kind.to_string(),
                status,
            });
        }

        let record: RemoteRecord = response.json().await.map_err(request_error)?;
        if record.id != id {
            return Err(LookupError::IdMismatch {
                requested: id,
                returned: record.id,
            });
        }
        Ok(record)
    }
}
