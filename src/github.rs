use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::AUTHORIZATION;

use crate::config::AppConfig;
use crate::models::DirectoryItem;

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Bound on a single blob retrieval. Directory listings have no explicit
/// timeout and inherit the transport default.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of remote directory listings for the collector. Implemented by
/// [`GithubClient`] against the live API and by in-memory fakes in tests.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Lists the immediate children of one remote folder. Any failure is
    /// reported as `None`; callers treat it as an empty folder.
    async fn list_directory(&self, path: &str) -> Option<Vec<DirectoryItem>>;

    /// Fully-qualified URL under which the file at `path` can be fetched.
    fn raw_url(&self, path: &str) -> String;
}

/// Client for the repository contents API and the raw-content host.
pub struct GithubClient {
    http: reqwest::Client,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("docportal/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            http,
            owner: config.github_owner.clone(),
            repo: config.repo_name.clone(),
            branch: config.branch.clone(),
            token: config.github_token.clone(),
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            API_BASE,
            self.owner,
            self.repo,
            encode_path(path),
            self.branch
        )
    }

    /// Streaming GET on the raw blob URL. The response body is relayed by
    /// the caller; only the 10-second timeout is enforced here.
    pub async fn fetch_raw(&self, path: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .get(self.raw_url(path))
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
    }
}

#[async_trait]
impl DirectoryLister for GithubClient {
    async fn list_directory(&self, path: &str) -> Option<Vec<DirectoryItem>> {
        let url = self.contents_url(path);
        debug!("Listing remote folder '{}'", path);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Request failed for '{}': {}", path, e);
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            error!("Erreur {} pour {}", response.status().as_u16(), path);
            return None;
        }

        match response.json::<Vec<DirectoryItem>>().await {
            Ok(items) => Some(items),
            Err(e) => {
                error!("Malformed listing for '{}': {}", path, e);
                None
            }
        }
    }

    fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            RAW_BASE,
            self.owner,
            self.repo,
            self.branch,
            encode_path(path)
        )
    }
}

/// Percent-encodes every path segment while keeping the separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            github_owner: "owner".to_string(),
            repo_name: "docs".to_string(),
            branch: "main".to_string(),
            github_token: None,
            secret_key: "secret".to_string(),
            admin_password: "a".to_string(),
            tech_password: "t".to_string(),
        }
    }

    #[test]
    fn encode_path_keeps_separators() {
        assert_eq!(
            encode_path("Gammes operatoires/sub/notes.PDF"),
            "Gammes%20operatoires/sub/notes.PDF"
        );
        assert_eq!(encode_path("REX"), "REX");
    }

    #[test]
    fn contents_url_includes_branch_ref() {
        let client = GithubClient::new(&test_config());
        assert_eq!(
            client.contents_url("Gammes operatoires"),
            "https://api.github.com/repos/owner/docs/contents/Gammes%20operatoires?ref=main"
        );
    }

    #[test]
    fn raw_url_is_fully_qualified() {
        let client = GithubClient::new(&test_config());
        assert_eq!(
            client.raw_url("Gammes operatoires/manual.pdf"),
            "https://raw.githubusercontent.com/owner/docs/main/Gammes%20operatoires/manual.pdf"
        );
    }
}
