//! OAuth access token lookup.
//!
//! The consent and refresh flow lives outside this service; it keeps the
//! token file current and this module re-reads it before every request.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("cannot read token file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid token file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("token file {0} has no access token")]
    Missing(PathBuf),
}

/// Stored credentials as written by the Google auth libraries.
#[derive(Deserialize)]
struct StoredToken {
    token: Option<String>,
    access_token: Option<String>,
}

/// Where the bearer token comes from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A fixed token (e.g. `GOOGLE_ACCESS_TOKEN`).
    Static(String),
    /// An authorized-user JSON file such as `token.json`.
    File(PathBuf),
}

impl TokenSource {
    pub async fn access_token(&self) -> Result<String, TokenError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| TokenError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let stored: StoredToken =
                    serde_json::from_str(&raw).map_err(|source| TokenError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                stored
                    .token
                    .or(stored.access_token)
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| TokenError::Missing(path.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn token_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_authorized_user_file() {
        let file = token_file(r#"{"token": "ya29.abc", "refresh_token": "1//x", "scopes": []}"#);
        let source = TokenSource::File(file.path().to_path_buf());

        assert_eq!(source.access_token().await.unwrap(), "ya29.abc");
    }

    #[tokio::test]
    async fn test_accepts_access_token_key() {
        let file = token_file(r#"{"access_token": "ya29.def"}"#);
        let source = TokenSource::File(file.path().to_path_buf());

        assert_eq!(source.access_token().await.unwrap(), "ya29.def");
    }

    #[tokio::test]
    async fn test_empty_token_is_missing() {
        let file = token_file(r#"{"token": ""}"#);
        let source = TokenSource::File(file.path().to_path_buf());

        assert!(matches!(
            source.access_token().await,
            Err(TokenError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_file_is_parse_error() {
        let file = token_file("not json");
        let source = TokenSource::File(file.path().to_path_buf());

        assert!(matches!(
            source.access_token().await,
            Err(TokenError::Parse { .. })
        ));
    }
}
