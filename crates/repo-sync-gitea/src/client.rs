use repo_sync::SyncError;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Authenticated HTTP client for the Gitea/Forgejo REST API.
///
/// A thin transport wrapper: it builds URLs, attaches credentials, and
/// turns non-2xx responses into [`SyncError::Api`]. Endpoint knowledge
/// lives with the callers.
#[derive(Clone)]
pub struct GiteaClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GiteaClient {
    /// `base_url` is the API root, e.g. `https://gitea.example.com/api/v1`.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        }
    }

    fn build_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method, &url)
            .header("User-Agent", "repo-sync")
            .header("Accept", "application/json");

        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {token}"));
        }

        req
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, SyncError> {
        let response = req
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|m| m.message)
            .unwrap_or(body);

        debug!(status = status.as_u16(), %message, "request rejected");

        Err(SyncError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        self.send(self.build_request(Method::GET, path))
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, SyncError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.build_request(Method::POST, path).json(body))
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, SyncError> {
        let bytes = self
            .send(self.build_request(Method::GET, path))
            .await?
            .bytes()
            .await
            .map_err(|e| SyncError::Network(format!("failed to read response body: {e}")))?;

        Ok(bytes.to_vec())
    }
}

#[derive(serde::Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

/// Percent-encode each `/`-separated segment of `path`.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
