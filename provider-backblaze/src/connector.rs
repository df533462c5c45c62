//! Backblaze B2 connector implementation
//!
//! Implements the `ObjectStore` trait for the B2 native API v2.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{DigestAlgorithm, FileSystemAccess, ObjectStore, RemoteObject};
use core_runtime::config::RemoteStoreConfig;
use core_runtime::logging::mask_secret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{B2Error, Result};
use crate::types::{
    AuthorizeAccountResponse, B2File, BucketRequest, DeleteFileVersionRequest,
    GetUploadUrlResponse, ListBucketsRequest, ListBucketsResponse, ListFileNamesRequest,
    ListFileNamesResponse,
};

/// B2 account authorization endpoint host
const DEFAULT_API_BASE: &str = "https://api.backblazeb2.com";

/// Maximum results per `b2_list_file_names` page (API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Attempts per upload, each with a fresh upload URL
const MAX_UPLOAD_ATTEMPTS: u32 = 3;

const API_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// An authorized account session bound to the configured bucket
#[derive(Debug, Clone)]
struct Session {
    api_url: String,
    authorization_token: String,
    bucket_id: String,
}

/// Backblaze B2 API connector
///
/// Implements `ObjectStore` for one bucket.
///
/// # Features
///
/// - Account authorization on first use, cached for the connector's lifetime
/// - Transparent re-authorization when the session token expires
/// - Paginated file listing
/// - Upload URL pool, one URL per concurrent upload
/// - SHA-1 content hashes, matching what B2 reports
///
/// # Example
///
/// ```ignore
/// use provider_backblaze::B2Connector;
/// use bridge_traits::storage::ObjectStore;
///
/// let connector = B2Connector::new(http_client, fs, remote_config);
/// let objects = connector.list().await?;
/// ```
pub struct B2Connector {
    http_client: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    credentials: RemoteStoreConfig,
    api_base: String,
    session: Mutex<Option<Session>>,
    upload_targets: Mutex<Vec<GetUploadUrlResponse>>,
}

impl B2Connector {
    /// Create a new B2 connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `fs` - filesystem used to read files for upload
    /// * `credentials` - application key id, key and bucket name
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        credentials: RemoteStoreConfig,
    ) -> Self {
        Self {
            http_client,
            fs,
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            session: Mutex::new(None),
            upload_targets: Mutex::new(Vec::new()),
        }
    }

    /// Override the authorization host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn basic_auth(&self) -> String {
        let raw = format!(
            "{}:{}",
            self.credentials.key_id, self.credentials.application_key
        );
        format!("Basic {}", BASE64.encode(raw))
    }

    /// Strip the `unverified:` prefix; `"none"` means no hash is known.
    fn normalize_sha1(sha1: Option<String>) -> Option<String> {
        let sha1 = sha1?;
        let sha1 = sha1.strip_prefix("unverified:").unwrap_or(&sha1);
        if sha1.is_empty() || sha1 == "none" {
            None
        } else {
            Some(sha1.to_ascii_lowercase())
        }
    }

    /// Percent-encode each path segment, keeping `/` separators.
    fn encode_file_name(name: &str) -> String {
        name.split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn convert_file(file: B2File) -> RemoteObject {
        RemoteObject {
            id: file.file_id,
            name: file.file_name,
            content_hash: Self::normalize_sha1(file.content_sha1),
            size: file.content_length,
        }
    }

    fn parse<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| B2Error::ParseError(format!("Failed to parse {}: {}", what, e)))
    }

    fn check(response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(B2Error::from_status(response.status, &response.body))
        }
    }

    /// Cached session, authorizing first if needed
    async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.authorize().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        self.session.lock().await.take();
        self.upload_targets.lock().await.clear();
    }

    #[instrument(skip(self), fields(bucket = %self.credentials.bucket_name))]
    async fn authorize(&self) -> Result<Session> {
        let url = format!("{}/b2api/v2/b2_authorize_account", self.api_base);
        let request = HttpRequest::new(HttpMethod::Get, url)
            .authorization(self.basic_auth())
            .timeout(API_TIMEOUT);

        let response = Self::check(self.http_client.execute(request).await?)?;
        let account: AuthorizeAccountResponse = Self::parse(&response, "authorize response")?;

        let bucket_id = self.resolve_bucket_id(&account).await?;
        info!(
            key_id = %mask_secret(&self.credentials.key_id),
            account = %mask_secret(&account.account_id),
            "Authorized B2 account"
        );

        Ok(Session {
            api_url: account.api_url.trim_end_matches('/').to_string(),
            authorization_token: account.authorization_token,
            bucket_id,
        })
    }

    /// Restricted keys report their bucket directly; otherwise look it up.
    async fn resolve_bucket_id(&self, account: &AuthorizeAccountResponse) -> Result<String> {
        let bucket_name = &self.credentials.bucket_name;

        if let Some(allowed) = &account.allowed {
            if let (Some(id), Some(name)) = (&allowed.bucket_id, &allowed.bucket_name) {
                if name == bucket_name {
                    return Ok(id.clone());
                }
                return Err(B2Error::Unauthorized(format!(
                    "application key is restricted to bucket {}",
                    name
                )));
            }
        }

        let url = format!(
            "{}/b2api/v2/b2_list_buckets",
            account.api_url.trim_end_matches('/')
        );
        let request = HttpRequest::new(HttpMethod::Post, url)
            .authorization(account.authorization_token.clone())
            .timeout(API_TIMEOUT)
            .json(&ListBucketsRequest {
                account_id: &account.account_id,
                bucket_name,
            })?;

        let response = Self::check(self.http_client.execute(request).await?)?;
        let buckets: ListBucketsResponse = Self::parse(&response, "bucket list")?;

        buckets
            .buckets
            .into_iter()
            .find(|bucket| &bucket.bucket_name == bucket_name)
            .map(|bucket| bucket.bucket_id)
            .ok_or_else(|| B2Error::BucketNotFound(bucket_name.clone()))
    }

    /// POST a JSON body to `/b2api/v2/<operation>`, re-authorizing once if
    /// the session expired.
    async fn api_call<B, T>(&self, operation: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut reauthorized = false;
        loop {
            let session = self.session().await?;
            let request = HttpRequest::new(
                HttpMethod::Post,
                format!("{}/b2api/v2/{}", session.api_url, operation),
            )
            .authorization(session.authorization_token)
            .timeout(API_TIMEOUT)
            .json(body)?;

            let response = self.http_client.execute(request).await?;
            match Self::check(response) {
                Ok(response) => return Self::parse(&response, operation),
                Err(B2Error::ExpiredToken) if !reauthorized => {
                    debug!(operation, "Session expired, re-authorizing");
                    self.invalidate_session().await;
                    reauthorized = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_file_names(&self) -> Result<Vec<RemoteObject>> {
        let bucket_id = self.session().await?.bucket_id;
        let mut objects = Vec::new();
        let mut start_file_name: Option<String> = None;

        loop {
            let page: ListFileNamesResponse = self
                .api_call(
                    "b2_list_file_names",
                    &ListFileNamesRequest {
                        bucket_id: &bucket_id,
                        start_file_name: start_file_name.as_deref(),
                        max_file_count: MAX_PAGE_SIZE,
                    },
                )
                .await?;

            objects.extend(
                page.files
                    .into_iter()
                    .filter(|file| file.action.as_deref().unwrap_or("upload") == "upload")
                    .map(Self::convert_file),
            );

            match page.next_file_name {
                Some(next) => start_file_name = Some(next),
                None => break,
            }
        }

        Ok(objects)
    }

    async fn take_upload_target(&self) -> Result<GetUploadUrlResponse> {
        if let Some(target) = self.upload_targets.lock().await.pop() {
            return Ok(target);
        }

        let bucket_id = self.session().await?.bucket_id;
        let target: GetUploadUrlResponse = self
            .api_call(
                "b2_get_upload_url",
                &BucketRequest {
                    bucket_id: &bucket_id,
                },
            )
            .await?;
        debug!(
            token = %mask_secret(&target.authorization_token),
            "Fetched upload URL"
        );
        Ok(target)
    }

    async fn upload_once(
        &self,
        target: &GetUploadUrlResponse,
        name: &str,
        data: bytes::Bytes,
        sha1: &str,
    ) -> Result<B2File> {
        let request = HttpRequest::new(HttpMethod::Post, target.upload_url.clone())
            .authorization(target.authorization_token.clone())
            .header("X-Bz-File-Name", Self::encode_file_name(name))
            .header("X-Bz-Content-Sha1", sha1)
            .header("Content-Type", "b2/x-auto")
            .timeout(UPLOAD_TIMEOUT)
            .body(data);

        let response = Self::check(self.http_client.execute(request).await?)?;
        Self::parse(&response, "upload response")
    }
}

#[async_trait]
impl ObjectStore for B2Connector {
    #[instrument(skip(self), fields(bucket = %self.credentials.bucket_name))]
    async fn list(&self) -> BridgeResult<Vec<RemoteObject>> {
        let objects = self.list_file_names().await?;
        info!("Listed {} objects from B2", objects.len());
        Ok(objects)
    }

    #[instrument(skip(self, local_path), fields(name = %name))]
    async fn upload(&self, local_path: &Path, name: &str) -> BridgeResult<RemoteObject> {
        let data = self.fs.read_file(local_path).await?;
        let sha1 = DigestAlgorithm::Sha1.hex_digest(&data);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let target = self.take_upload_target().await?;

            match self.upload_once(&target, name, data.clone(), &sha1).await {
                Ok(file) => {
                    self.upload_targets.lock().await.push(target);
                    debug!(bytes = data.len(), "Uploaded object");
                    return Ok(Self::convert_file(file));
                }
                Err(e) if e.is_retryable_upload() && attempt < MAX_UPLOAD_ATTEMPTS => {
                    // The failed upload URL is discarded
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        "Upload failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, MAX_UPLOAD_ATTEMPTS, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn delete(&self, id: &str, name: &str) -> BridgeResult<()> {
        let _: serde_json::Value = self
            .api_call(
                "b2_delete_file_version",
                &DeleteFileVersionRequest {
                    file_name: name,
                    file_id: id,
                },
            )
            .await?;
        debug!("Deleted object version");
        Ok(())
    }

    fn digest_algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha1
    }
}
