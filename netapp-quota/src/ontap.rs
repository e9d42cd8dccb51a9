//! ONTAP REST API client
//!
//! Implements [`StorageClient`] against a NetApp controller's REST API.
//! Responses with an ONTAP error body are reported as `passed = false`
//! carrying the controller's message; anything else that goes wrong is a
//! [`ClientError`].

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::client::{
    ApiResults, ClientResult, QuotaEntry, QuotaQuery, QuotaStatusRecord, StorageClient, Volume,
};
use crate::config::OntapConfig;
use crate::error::{ClientError, QuotaError, Result};

/// Page size when listing volumes
const VOLUME_PAGE_SIZE: u32 = 500;

const VOLUMES_PATH: &str = "/api/storage/volumes";
const QUOTA_RULES_PATH: &str = "/api/storage/quota/rules";

/// Collection response (`records` plus pagination links)
#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
    #[serde(rename = "_links")]
    links: Option<Links>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            links: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<Href>,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct VolumeRecord {
    name: String,
    uuid: Option<String>,
    quota: Option<VolumeQuota>,
}

#[derive(Debug, Deserialize)]
struct VolumeQuota {
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotaRuleRecord {
    svm: Option<NamedRef>,
    volume: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    code: Option<String>,
}

/// Controller reply before decoding
enum Reply {
    Accepted(reqwest::Response),
    Rejected(String),
}

/// ONTAP REST client
pub struct OntapClient {
    base_url: String,
    user: String,
    password: String,
    client: reqwest::Client,
}

impl OntapClient {
    /// Create a client from connection settings
    pub fn new(config: &OntapConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| QuotaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Reply, ClientError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(Reply::Accepted(response));
        }

        let body = response.text().await?;
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) => {
                debug!(
                    "ONTAP rejected request: HTTP {} code={} {}",
                    status,
                    error.code.as_deref().unwrap_or("-"),
                    error.message
                );
                Ok(Reply::Rejected(error.message))
            }
            Err(_) => Err(ClientError::Status {
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T>
    where
        T: DeserializeOwned + Default,
    {
        debug!("GET {}", path);
        let request = self.client.get(self.url(path)).query(query);

        match self.send(request).await? {
            Reply::Accepted(response) => {
                let data = response
                    .json::<T>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(ApiResults::passed(data))
            }
            Reply::Rejected(reason) => Ok(ApiResults::failed(reason)),
        }
    }

    async fn patch(&self, path: &str, body: serde_json::Value) -> ClientResult<()> {
        debug!("PATCH {}", path);
        let request = self.client.patch(self.url(path)).json(&body);

        match self.send(request).await? {
            Reply::Accepted(_) => Ok(ApiResults::passed(())),
            Reply::Rejected(reason) => Ok(ApiResults::failed(reason)),
        }
    }

    /// Look up a single volume by name within a scope server
    async fn find_volume(
        &self,
        svm: &str,
        volume: &str,
        fields: &str,
    ) -> std::result::Result<std::result::Result<VolumeRecord, String>, ClientError> {
        let results: ApiResults<Collection<VolumeRecord>> = self
            .get(
                VOLUMES_PATH,
                &[("name", volume), ("svm.name", svm), ("fields", fields)],
            )
            .await?;

        if !results.passed {
            return Ok(Err(results
                .reason
                .unwrap_or_else(|| "volume lookup failed".to_string())));
        }

        Ok(results
            .data
            .records
            .into_iter()
            .next()
            .ok_or_else(|| format!("Volume {} not found in vserver {}", volume, svm)))
    }

    async fn switch_quota(&self, svm: &str, volume: &str, enabled: bool) -> ClientResult<()> {
        let record = match self.find_volume(svm, volume, "uuid").await? {
            Ok(record) => record,
            Err(reason) => return Ok(ApiResults::failed(reason)),
        };

        let uuid = record
            .uuid
            .ok_or_else(|| ClientError::Decode(format!("volume {} has no uuid", volume)))?;

        self.patch(
            &format!("{}/{}", VOLUMES_PATH, uuid),
            json!({ "quota": { "enabled": enabled } }),
        )
        .await
    }
}

#[async_trait::async_trait]
impl StorageClient for OntapClient {
    async fn list_volumes(&self) -> ClientResult<Vec<Volume>> {
        let page_size = VOLUME_PAGE_SIZE.to_string();
        let mut volumes = Vec::new();

        let mut page: ApiResults<Collection<VolumeRecord>> = self
            .get(
                VOLUMES_PATH,
                &[("fields", "name,svm.name"), ("max_records", page_size.as_str())],
            )
            .await?;

        loop {
            if !page.passed {
                return Ok(ApiResults {
                    passed: false,
                    reason: page.reason,
                    data: Vec::new(),
                });
            }

            volumes.extend(page.data.records.into_iter().map(|r| Volume::new(r.name)));

            match page.data.links.and_then(|l| l.next) {
                Some(next) => page = self.get(&next.href, &[]).await?,
                None => break,
            }
        }

        Ok(ApiResults::passed(volumes))
    }

    async fn quota_status(&self, svm: &str, volume: &str) -> ClientResult<QuotaStatusRecord> {
        let record = match self.find_volume(svm, volume, "quota.state").await? {
            Ok(record) => record,
            Err(reason) => return Ok(ApiResults::failed(reason)),
        };

        match record.quota.and_then(|q| q.state) {
            Some(status) => Ok(ApiResults::passed(QuotaStatusRecord { status })),
            None => Ok(ApiResults::failed(format!(
                "No quota state reported for volume {}",
                volume
            ))),
        }
    }

    async fn list_quota_entries(&self, query: &QuotaQuery) -> ClientResult<Vec<QuotaEntry>> {
        let max_records = query.max_records.to_string();

        let results: ApiResults<Collection<QuotaRuleRecord>> = self
            .get(
                QUOTA_RULES_PATH,
                &[
                    ("svm.name", query.svm.as_str()),
                    ("volume.name", query.volume.as_str()),
                    ("max_records", max_records.as_str()),
                    ("fields", "svm.name,volume.name"),
                ],
            )
            .await?;

        if !results.passed {
            return Ok(ApiResults {
                passed: false,
                reason: results.reason,
                data: Vec::new(),
            });
        }

        let entries = results
            .data
            .records
            .into_iter()
            .map(|rule| QuotaEntry {
                svm: rule.svm.map(|s| s.name).unwrap_or_else(|| query.svm.clone()),
                volume: rule.volume.map(|v| v.name).unwrap_or_default(),
            })
            .collect();

        Ok(ApiResults::passed(entries))
    }

    async fn quota_on(&self, svm: &str, volume: &str) -> ClientResult<()> {
        self.switch_quota(svm, volume, true).await
    }

    async fn quota_off(&self, svm: &str, volume: &str) -> ClientResult<()> {
        self.switch_quota(svm, volume, false).await
    }
}
