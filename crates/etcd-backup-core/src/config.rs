//! Run configuration.

use std::fmt;
use std::path::PathBuf;

use crate::credentials::TlsOverrides;
use crate::error::{BackupError, BackupResult};
use crate::helper::{DEFAULT_MC_PATH, DEFAULT_MC_URL};
use crate::paths::validate_cluster;

pub const DEFAULT_ENDPOINTS: &str = "https://127.0.0.1:2379";
pub const DEFAULT_PREFIX: &str = "etcd-backups";
pub const DEFAULT_BUCKET: &str = "pg-conny-backups";
pub const DEFAULT_BACKUP_DIR: &str = "./etcd-backups";
pub const DEFAULT_ETCDCTL: &str = "/opt/bin/etcdctl";
pub const DEFAULT_S3_ENDPOINT: &str = "https://s3.eu-west-1.amazonaws.com";
pub const DEFAULT_ALIAS: &str = "s3";

/// Remote object storage settings.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub alias: String,
    pub bucket: String,
    pub prefix: String,
    pub access_key: String,
    pub secret_key: String,
}

impl RemoteConfig {
    /// Object path below the bucket for a derived remote key.
    pub fn object_path(&self, remote_key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            remote_key.to_string()
        } else {
            format!("{prefix}/{remote_key}")
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("alias", &self.alias)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Everything one backup run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub cluster_name: String,
    pub endpoints: String,
    pub tls: TlsOverrides,
    /// Host whose TLS layout is used; defaults to the local hostname.
    pub server_name: Option<String>,
    pub backup_dir: PathBuf,
    pub remote: RemoteConfig,
    pub etcdctl: PathBuf,
    pub mc_path: PathBuf,
    pub mc_url: String,
}

impl BackupConfig {
    /// Config with every optional setting at its default.
    pub fn new(
        cluster_name: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            endpoints: DEFAULT_ENDPOINTS.to_string(),
            tls: TlsOverrides::default(),
            server_name: None,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            remote: RemoteConfig {
                endpoint: DEFAULT_S3_ENDPOINT.to_string(),
                alias: DEFAULT_ALIAS.to_string(),
                bucket: DEFAULT_BUCKET.to_string(),
                prefix: DEFAULT_PREFIX.to_string(),
                access_key: access_key.into(),
                secret_key: secret_key.into(),
            },
            etcdctl: PathBuf::from(DEFAULT_ETCDCTL),
            mc_path: PathBuf::from(DEFAULT_MC_PATH),
            mc_url: DEFAULT_MC_URL.to_string(),
        }
    }

    pub fn validate(&self) -> BackupResult<()> {
        validate_cluster(&self.cluster_name)?;

        let required = [
            ("--endpoints", self.endpoints.as_str()),
            ("--s3-access", self.remote.access_key.as_str()),
            ("--s3-secret", self.remote.secret_key.as_str()),
            ("--bucket", self.remote.bucket.as_str()),
            ("--alias", self.remote.alias.as_str()),
            ("--s3-endpoint", self.remote.endpoint.as_str()),
        ];
        for (flag, value) in required {
            if value.trim().is_empty() {
                return Err(BackupError::config(format!("{flag} must not be empty")));
            }
        }
        if self.remote.alias.contains('/') {
            return Err(BackupError::config("--alias must not contain '/'"));
        }
        Ok(())
    }
}
