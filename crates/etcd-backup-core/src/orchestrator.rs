//! Sequencing of one backup run.
//!
//! Steps run strictly in order and the first failure ends the run:
//!
//! 1. resolve TLS material into a fresh [`CredentialContext`]
//! 2. make sure the upload helper exists and register the remote alias
//! 3. capture the instant and derive local/remote paths
//! 4. `etcdctl snapshot save` into the local slot
//! 5. `mc cp` the slot file to the remote key
//!
//! Nothing is retried and nothing is rolled back. A snapshot that was written
//! but not uploaded stays in its local slot until a later run reuses it.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::BackupConfig;
use crate::credentials::{CredentialContext, TlsMaterials};
use crate::error::BackupResult;
use crate::helper::McHelper;
use crate::paths::{derive_paths, Clock, SlotIndex, SnapshotInstant, SystemClock};
use crate::runner::{CommandRunner, Invocation};

pub const STEP_ALIAS: &str = "alias";
pub const STEP_SNAPSHOT: &str = "snapshot";
pub const STEP_UPLOAD: &str = "upload";

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub instant: SnapshotInstant,
    pub slot: SlotIndex,
    pub local_path: PathBuf,
    /// `alias/bucket/prefix/remote_key`
    pub remote_object: String,
}

/// `etcdctl --endpoints=.. --cert=.. --cacert=.. --key=.. snapshot save <dest>`
pub fn snapshot_save(etcdctl: &Path, endpoints: &str, tls: &TlsMaterials, dest: &Path) -> Invocation {
    Invocation::new(etcdctl).args([
        format!("--endpoints={endpoints}"),
        format!("--cert={}", tls.cert.display()),
        format!("--cacert={}", tls.ca.display()),
        format!("--key={}", tls.key.display()),
        "snapshot".to_string(),
        "save".to_string(),
        dest.display().to_string(),
    ])
}

pub struct Orchestrator<R, C = SystemClock> {
    config: BackupConfig,
    runner: R,
    clock: C,
}

impl<R: CommandRunner> Orchestrator<R, SystemClock> {
    pub fn new(config: BackupConfig, runner: R) -> Self {
        Self::with_clock(config, runner, SystemClock)
    }
}

impl<R: CommandRunner, C: Clock> Orchestrator<R, C> {
    pub fn with_clock(config: BackupConfig, runner: R, clock: C) -> Self {
        Self {
            config,
            runner,
            clock,
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute the full run.
    pub async fn run(&self) -> BackupResult<BackupReport> {
        let cfg = &self.config;
        cfg.validate()?;

        let credentials = CredentialContext::resolve(&cfg.tls, cfg.server_name.as_deref())?;
        info!(
            cluster = %cfg.cluster_name,
            key = %credentials.tls.key.display(),
            cert = %credentials.tls.cert.display(),
            ca = %credentials.tls.ca.display(),
            "resolved TLS client material"
        );

        let mc = McHelper::new(&cfg.mc_path);
        mc.ensure_present(&cfg.mc_url).await?;
        let alias = mc
            .alias_set(
                &cfg.remote.alias,
                &cfg.remote.endpoint,
                &cfg.remote.access_key,
                &cfg.remote.secret_key,
            )
            .with_credentials(&credentials);
        self.runner.run(STEP_ALIAS, &alias).await?;

        let instant = self.clock.now();
        let paths = derive_paths(&cfg.cluster_name, &cfg.backup_dir, &instant)?;
        info!(
            slot = %paths.slot,
            local = %paths.local.display(),
            remote_key = %paths.remote_key,
            "derived snapshot paths"
        );

        let snapshot = snapshot_save(&cfg.etcdctl, &cfg.endpoints, &credentials.tls, &paths.local)
            .with_credentials(&credentials);
        self.runner.run(STEP_SNAPSHOT, &snapshot).await?;
        info!(local = %paths.local.display(), "snapshot saved");

        let object_path = cfg.remote.object_path(&paths.remote_key);
        let upload = mc
            .copy(&paths.local, &cfg.remote.alias, &cfg.remote.bucket, &object_path)
            .with_credentials(&credentials);
        if let Err(err) = self.runner.run(STEP_UPLOAD, &upload).await {
            warn!(
                local = %paths.local.display(),
                slot = %paths.slot,
                "upload failed; snapshot kept locally until its slot is reused"
            );
            return Err(err);
        }

        let remote_object = format!("{}/{}/{}", cfg.remote.alias, cfg.remote.bucket, object_path);
        info!(remote = %remote_object, "snapshot uploaded");

        Ok(BackupReport {
            instant,
            slot: paths.slot,
            local_path: paths.local,
            remote_object,
        })
    }
}
