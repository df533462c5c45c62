use bridge_traits::error::BridgeError;
use core_media::MediaError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read source {path}: {message}")]
    SourceRead { path: String, message: String },

    #[error("Transcode failed for {path}: {message}")]
    Transcode { path: String, message: String },

    #[error("Fingerprint store I/O failed: {0}")]
    StoreIo(String),

    #[error("Remote operation failed: {0}")]
    RemoteTransient(String),

    #[error("Remote store rejected credentials: {0}")]
    RemoteAuth(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Scope a transcode adapter failure to the asset at `path`.
    pub fn from_media(path: &Path, err: MediaError) -> Self {
        let path = path.display().to_string();
        match err {
            MediaError::SourceRead { message, .. } => SyncError::SourceRead { path, message },
            other => SyncError::Transcode {
                path,
                message: other.to_string(),
            },
        }
    }

    /// Classify a remote store failure: credential rejection is pass-fatal.
    pub fn from_remote(err: BridgeError) -> Self {
        match err {
            BridgeError::Unauthorized(message) => SyncError::RemoteAuth(message),
            other => SyncError::RemoteTransient(other.to_string()),
        }
    }

    pub fn is_remote_auth(&self) -> bool {
        matches!(self, SyncError::RemoteAuth(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_media_errors_are_scoped_to_asset() {
        let err = SyncError::from_media(
            Path::new("p1/a.png"),
            MediaError::SourceRead {
                path: PathBuf::from("p1/a.png"),
                message: "permission denied".to_string(),
            },
        );
        assert!(matches!(err, SyncError::SourceRead { .. }));

        let err = SyncError::from_media(
            Path::new("p1/b.gif"),
            MediaError::UnsupportedKind(PathBuf::from("p1/b.gif")),
        );
        assert!(matches!(err, SyncError::Transcode { .. }));
    }

    #[test]
    fn test_remote_classification() {
        assert!(
            SyncError::from_remote(BridgeError::Unauthorized("expired".to_string()))
                .is_remote_auth()
        );
        assert!(matches!(
            SyncError::from_remote(BridgeError::OperationFailed("HTTP 503".to_string())),
            SyncError::RemoteTransient(_)
        ));
    }
}
