//! The `mc` upload helper: provisioning and the invocations built on it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{BackupError, BackupResult};
use crate::runner::Invocation;

/// Release the helper is fetched from when it is not already on disk.
pub const DEFAULT_MC_URL: &str = "https://dl.minio.io/client/mc/release/linux-amd64/mc";
/// Where the helper lives, relative to the working directory.
pub const DEFAULT_MC_PATH: &str = "./mc";

const USER_AGENT_VALUE: &str = concat!("etcd-backup/", env!("CARGO_PKG_VERSION"));
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Outcome of [`McHelper::ensure_present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Handle on the local `mc` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McHelper {
    path: PathBuf,
}

impl McHelper {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download the helper from `url` unless a file already exists at the
    /// helper path. Presence is the only check; an existing file is never
    /// replaced.
    pub async fn ensure_present(&self, url: &str) -> BackupResult<Provisioned> {
        if self.path.is_file() {
            debug!(path = %self.path.display(), "upload helper already present");
            return Ok(Provisioned::AlreadyPresent);
        }

        info!(url, path = %self.path.display(), "downloading upload helper");
        let body = fetch(url).await?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&self.path, &body)
            .await
            .map_err(|source| self.io_error(source))?;
        make_executable(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        Ok(Provisioned::Downloaded {
            bytes: body.len() as u64,
        })
    }

    /// `mc alias set <alias> <url> <access> <secret>`
    pub fn alias_set(&self, alias: &str, url: &str, access: &str, secret: &str) -> Invocation {
        Invocation::new(&self.path)
            .args(["alias", "set", alias, url, access])
            .secret_arg(secret)
    }

    /// `mc cp <src> <alias>/<bucket>/<dest>`
    pub fn copy(&self, src: &Path, alias: &str, bucket: &str, dest: &str) -> Invocation {
        Invocation::new(&self.path)
            .arg("cp")
            .arg(src.display().to_string())
            .arg(format!("{alias}/{bucket}/{dest}"))
    }

    fn io_error(&self, source: std::io::Error) -> BackupError {
        BackupError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

async fn fetch(url: &str) -> BackupResult<Vec<u8>> {
    let download_error = |message: String| BackupError::Download {
        url: url.to_string(),
        message,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .user_agent(USER_AGENT_VALUE)
        .build()
        .map_err(|e| download_error(format!("failed to create HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(download_error(format!("HTTP {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(format!("failed to read response body: {e}")))?;
    Ok(bytes.to_vec())
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn alias_set_hides_secret() {
        let mc = McHelper::new("./mc");
        let inv = mc.alias_set("s3", "https://s3.eu-west-1.amazonaws.com", "AK", "SK");
        assert_eq!(
            inv.args,
            vec!["alias", "set", "s3", "https://s3.eu-west-1.amazonaws.com", "AK", "SK"]
        );
        assert!(!inv.to_string().contains("SK"));
    }

    #[test]
    fn copy_targets_alias_bucket_and_key() {
        let mc = McHelper::new("./mc");
        let inv = mc.copy(
            Path::new("etcd-backups/prod/prod-snapshot-1-2.db"),
            "s3",
            "backups",
            "etcd-backups/prod/2024/3/x.db",
        );
        assert_eq!(
            inv.args,
            vec![
                "cp",
                "etcd-backups/prod/prod-snapshot-1-2.db",
                "s3/backups/etcd-backups/prod/2024/3/x.db"
            ]
        );
    }

    #[tokio::test]
    async fn downloads_once_and_marks_executable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"#!/bin/sh\n".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let helper = McHelper::new(tmp.path().join("bin/mc"));
        let url = format!("{}/mc", server.uri());

        let first = helper.ensure_present(&url).await.unwrap();
        assert_eq!(first, Provisioned::Downloaded { bytes: 10 });
        let second = helper.ensure_present(&url).await.unwrap();
        assert_eq!(second, Provisioned::AlreadyPresent);

        assert_eq!(std::fs::read(helper.path()).unwrap(), b"#!/bin/sh\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(helper.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn existing_file_is_never_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let existing = tmp.path().join("mc");
        std::fs::write(&existing, b"old").unwrap();

        let helper = McHelper::new(&existing);
        let outcome = helper
            .ensure_present(&format!("{}/mc", server.uri()))
            .await
            .unwrap();
        assert_eq!(outcome, Provisioned::AlreadyPresent);
        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
    }

    #[tokio::test]
    async fn http_failure_is_a_download_error_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let helper = McHelper::new(tmp.path().join("mc"));
        let err = helper
            .ensure_present(&format!("{}/mc", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Download { .. }), "got {err:?}");
        assert_eq!(err.exit_code(), 4);
        assert!(!helper.path().exists());
    }
}
