//! dbt Cloud v2 API client

use super::{JobError, JobService, JobSummary, RunStatus};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Endpoint used when `DBT_CLOUD_HOST` is unset
pub const DEFAULT_HOST: &str = "cloud.getdbt.com";

const ACCOUNT_ID_VAR: &str = "DBT_CLOUD_ACCOUNT_ID";
const API_KEY_VAR: &str = "DBT_CLOUD_API_KEY";
const HOST_VAR: &str = "DBT_CLOUD_HOST";

/// Credentials for the remote job service
///
/// Missing account id or API key is fatal at construction time, before any
/// network call.
#[derive(Clone)]
pub struct Credentials {
    pub account_id: String,
    api_key: String,
    pub host: String,
}

// No Debug derive: the API key must never end up in logs or error output.

impl Credentials {
    pub fn new(
        account_id: impl Into<String>,
        api_key: impl Into<String>,
        host: Option<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            api_key: api_key.into(),
            host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        }
    }

    /// Read credentials from the environment
    pub fn from_env() -> Result<Self, JobError> {
        let account_id =
            std::env::var(ACCOUNT_ID_VAR).map_err(|_| JobError::MissingCredential(ACCOUNT_ID_VAR))?;
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| JobError::MissingCredential(API_KEY_VAR))?;
        let host = std::env::var(HOST_VAR).ok();
        Ok(Self::new(account_id, api_key, host))
    }
}

/// HTTP client for the dbt Cloud v2 jobs API
///
/// All endpoints share the `{ "data": ... }` response envelope.
pub struct DbtCloudClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RunData {
    id: u64,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    status_humanized: Option<String>,
}

impl DbtCloudClient {
    pub fn new(credentials: Credentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        let base_url = format!(
            "https://{}/api/v2/accounts/{}",
            credentials.host, credentials.account_id
        );

        Self {
            client,
            api_key: credentials.api_key,
            base_url,
        }
    }

    /// Override the base URL (useful for testing or proxies)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, JobError> {
        let response = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/json")
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, JobError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, JobError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JobError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl JobService for DbtCloudClient {
    async fn trigger_job(&self, job_id: u64, cause: &str) -> Result<u64, JobError> {
        let run: RunData = self
            .post(&format!("/jobs/{}/run/", job_id), json!({ "cause": cause }))
            .await?;
        Ok(run.id)
    }

    async fn run_status(&self, run_id: u64) -> Result<RunStatus, JobError> {
        let run: RunData = self.get(&format!("/runs/{}/", run_id)).await?;

        // The service leaves status_message empty for healthy runs; fall back
        // to the humanized status.
        let message = run
            .status_message
            .filter(|m| !m.is_empty())
            .or(run.status_humanized)
            .unwrap_or_default();

        Ok(RunStatus {
            code: run.status,
            message,
        })
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, JobError> {
        self.get("/jobs/").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_host_applied() {
        let creds = Credentials::new("1001", "token", None);
        assert_eq!(creds.host, DEFAULT_HOST);

        let creds = Credentials::new("1001", "token", Some("dbt.example.com".to_string()));
        assert_eq!(creds.host, "dbt.example.com");
    }

    #[test]
    fn test_base_url_includes_account() {
        let client = DbtCloudClient::new(Credentials::new("1001", "token", None));
        assert_eq!(
            client.url("/jobs/"),
            "https://cloud.getdbt.com/api/v2/accounts/1001/jobs/"
        );
    }

    #[test]
    fn test_base_url_override() {
        let client = DbtCloudClient::new(Credentials::new("1001", "token", None))
            .with_base_url("http://127.0.0.1:8080".to_string());
        assert_eq!(client.url("/runs/5/"), "http://127.0.0.1:8080/runs/5/");
    }
}
