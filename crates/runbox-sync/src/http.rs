use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use runbox_crypto::Fingerprint;
use runbox_types::{endpoints, FileSet, ReadKey, StoreResponse, WriteKey};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::transport::StoreTransport;

/// [`StoreTransport`] over HTTP.
///
/// Paths are resolved relative to `base`, so a gateway mounted under a prefix
/// (e.g. `https://host/api/`) works the same as one at the root.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: &str) -> SyncResult<Self> {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: &str) -> SyncResult<Self> {
        let mut base = Url::parse(base).map_err(|e| SyncError::InvalidUrl(format!("{base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> SyncResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| SyncError::InvalidUrl(e.to_string()))
    }

    /// Link that imports `files` deterministically, plus the read key the
    /// server will redirect it to.
    pub fn import_link(&self, files: &FileSet) -> SyncResult<(Url, ReadKey)> {
        let payload = serde_json::to_string(&files.files)?;
        let read_key = Fingerprint::of(payload.as_bytes()).read_key();
        let mut url = self.url(endpoints::IMPORT)?;
        url.query_pairs_mut()
            .append_pair(endpoints::FILES_PARAM, &payload);
        Ok((url, read_key))
    }

    async fn post_json(&self, url: Url, body: &str) -> SyncResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await?;
        check(response).await
    }
}

/// Turn a non-2xx response into [`SyncError::Status`] carrying the body text.
async fn check(response: reqwest::Response) -> SyncResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl StoreTransport for HttpTransport {
    async fn fetch(&self, read_key: &ReadKey) -> SyncResult<Option<FileSet>> {
        let url = self.url(&endpoints::store_path(read_key))?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%read_key, "sandbox not found");
            return Ok(None);
        }
        let bytes = check(response).await?.bytes().await?;
        Ok(Some(FileSet::from_json(&bytes)?))
    }

    async fn create_new(&self, body: &str) -> SyncResult<StoreResponse> {
        let url = self.url(&format!("{}/{}", endpoints::STORE, endpoints::STORE_NEW_SEGMENT))?;
        let response = self.post_json(url, body).await?;
        response
            .json::<StoreResponse>()
            .await
            .map_err(|e| SyncError::InvalidResponse(e.to_string()))
    }

    async fn update(&self, read_key: &ReadKey, write_key: &WriteKey, body: &str) -> SyncResult<()> {
        let mut url = self.url(&endpoints::store_path(read_key))?;
        url.query_pairs_mut()
            .append_pair(endpoints::WRITE_KEY_PARAM, write_key.as_str());
        self.post_json(url, body).await?;
        Ok(())
    }
}
