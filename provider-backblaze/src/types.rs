//! Backblaze B2 native API types
//!
//! Request and response bodies for the subset of the B2 v2 API used by the
//! connector.

use serde::{Deserialize, Serialize};

/// `b2_authorize_account` response
///
/// See: https://www.backblaze.com/apidocs/b2-authorize-account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeAccountResponse {
    pub account_id: String,

    /// Token for every subsequent API call
    pub authorization_token: String,

    /// Base URL for API calls
    pub api_url: String,

    /// Restrictions of the application key, if any
    #[serde(default)]
    pub allowed: Option<Allowed>,
}

/// Key restrictions reported by `b2_authorize_account`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allowed {
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBucketsRequest<'a> {
    pub account_id: &'a str,
    pub bucket_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBucketsResponse {
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub bucket_id: String,
    pub bucket_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileNamesRequest<'a> {
    pub bucket_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_name: Option<&'a str>,
    pub max_file_count: u32,
}

/// `b2_list_file_names` response
///
/// See: https://www.backblaze.com/apidocs/b2-list-file-names
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileNamesResponse {
    pub files: Vec<B2File>,

    /// First name of the next page, absent on the last page
    #[serde(default)]
    pub next_file_name: Option<String>,
}

/// A file version as reported by list and upload calls
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2File {
    pub file_id: String,
    pub file_name: String,

    /// `"none"` for large files; may carry an `unverified:` prefix
    #[serde(default)]
    pub content_sha1: Option<String>,

    #[serde(default)]
    pub content_length: Option<u64>,

    /// `upload`, `hide`, `start` or `folder`
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRequest<'a> {
    pub bucket_id: &'a str,
}

/// `b2_get_upload_url` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUploadUrlResponse {
    pub upload_url: String,
    pub authorization_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileVersionRequest<'a> {
    pub file_name: &'a str,
    pub file_id: &'a str,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
