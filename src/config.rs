//! Configuration management for the depot server

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Bucket holding content-addressed blobs (`blobs/...` keys).
    pub content_bucket: String,
    /// Bucket holding metadata records (`files/...` keys). May be the same
    /// bucket as `content_bucket`; the key prefixes keep the namespaces
    /// apart.
    pub metadata_bucket: String,
    /// Externally-addressable base URL for redirect targets. Defaults to the
    /// endpoint (path-style addressing).
    pub public_url: Option<String>,
}

impl StorageConfig {
    /// Base URL clients are redirected to, without a trailing slash.
    pub fn public_base(&self) -> String {
        self.public_url
            .as_ref()
            .unwrap_or(&self.endpoint)
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                access_key: "admin".to_string(),
                secret_key: "password123".to_string(),
                region: Some("us-east-1".to_string()),
                content_bucket: "depot".to_string(),
                metadata_bucket: "depot".to_string(),
                public_url: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let content_bucket = env::var("S3_CONTENT_BUCKET")?;
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            storage: StorageConfig {
                endpoint: env::var("S3_ENDPOINT")?,
                access_key: env::var("S3_ACCESS_KEY")?,
                secret_key: env::var("S3_SECRET_KEY")?,
                region: env::var("S3_REGION").ok(),
                metadata_bucket: env::var("S3_METADATA_BUCKET")
                    .unwrap_or_else(|_| content_bucket.clone()),
                content_bucket,
                public_url: env::var("S3_PUBLIC_URL").ok(),
            },
        })
    }
}
