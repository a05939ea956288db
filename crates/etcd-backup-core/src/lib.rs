//! Scheduled etcd snapshot-and-upload.
//!
//! One run takes an `etcdctl` snapshot of a single cluster, writes it into a
//! bounded set of local rotation slots and copies it to S3-compatible storage
//! under a per-run key.
//!
//! - Local: `<backup-dir>/<cluster>/<cluster>-snapshot-<day%2>-<hour%3>.db`
//!   (six slots per cluster, overwritten in rotation)
//! - Remote: `<alias>/<bucket>/<prefix>/<cluster>/<Y>/<M>/<cluster>-<date>_<time>-snapshot.db`
//!   (never reused, never pruned)
//!
//! # Quick Start
//!
//! ```no_run
//! use etcd_backup_core::{BackupConfig, Orchestrator, SystemRunner};
//!
//! # async fn example() -> Result<(), etcd_backup_core::BackupError> {
//! let config = BackupConfig::new("prod", "ACCESS", "SECRET");
//! let report = Orchestrator::new(config, SystemRunner).run().await?;
//! println!("uploaded {}", report.remote_object);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod helper;
pub mod orchestrator;
pub mod paths;
pub mod runner;

pub use config::{BackupConfig, RemoteConfig};
pub use credentials::{CredentialContext, TlsMaterials, TlsOverrides};
pub use error::{BackupError, BackupResult};
pub use helper::{McHelper, Provisioned};
pub use orchestrator::{BackupReport, Orchestrator, STEP_ALIAS, STEP_SNAPSHOT, STEP_UPLOAD};
pub use paths::{
    derive_paths, local_snapshot_path, remote_object_key, Clock, FixedClock, SlotIndex,
    SnapshotInstant, SnapshotPaths, SystemClock,
};
pub use runner::{CommandRunner, Invocation, SystemRunner};
