use std::path::PathBuf;

use clap::Parser;
use etcd_backup_core::config::{
    DEFAULT_ALIAS, DEFAULT_BACKUP_DIR, DEFAULT_BUCKET, DEFAULT_ENDPOINTS, DEFAULT_ETCDCTL,
    DEFAULT_PREFIX, DEFAULT_S3_ENDPOINT,
};
use etcd_backup_core::helper::{DEFAULT_MC_PATH, DEFAULT_MC_URL};
use etcd_backup_core::{BackupConfig, RemoteConfig, TlsOverrides};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "etcd-backup",
    version,
    about = "Backup etcd and upload to s3"
)]
pub struct Cli {
    /// etcd endpoints to backup
    #[arg(long, default_value = DEFAULT_ENDPOINTS)]
    pub endpoints: String,

    /// s3 prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// s3 bucket
    #[arg(long, default_value = DEFAULT_BUCKET)]
    pub bucket: String,

    /// etcd-cluster name
    #[arg(long)]
    pub cluster_name: String,

    /// Local directory holding the rotating snapshot slots
    #[arg(long, default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,

    /// etcd cert client key
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// path to etcd cert
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// path to etcd CA cert
    #[arg(long)]
    pub ca: Option<PathBuf>,

    /// Host whose /etc/etcd/ssl/<host>/ layout supplies default TLS paths
    /// (defaults to this machine's hostname)
    #[arg(long)]
    pub server_name: Option<String>,

    /// AWS-S3 access key
    #[arg(long, env = "ETCD_BACKUP_S3_ACCESS", hide_env_values = true)]
    pub s3_access: String,

    /// AWS-S3 Secret
    #[arg(long, env = "ETCD_BACKUP_S3_SECRET", hide_env_values = true)]
    pub s3_secret: String,

    /// S3-compatible endpoint registered under the mc alias
    #[arg(long, default_value = DEFAULT_S3_ENDPOINT)]
    pub s3_endpoint: String,

    /// mc alias name
    #[arg(long, default_value = DEFAULT_ALIAS)]
    pub alias: String,

    /// etcdctl binary
    #[arg(long, default_value = DEFAULT_ETCDCTL)]
    pub etcdctl: PathBuf,

    /// Local path of the mc binary; downloaded from --mc-url when missing
    #[arg(long, default_value = DEFAULT_MC_PATH)]
    pub mc_path: PathBuf,

    #[arg(long, default_value = DEFAULT_MC_URL)]
    pub mc_url: String,
}

impl Cli {
    pub fn into_config(self) -> BackupConfig {
        BackupConfig {
            cluster_name: self.cluster_name,
            endpoints: self.endpoints,
            tls: TlsOverrides {
                key: self.key,
                cert: self.cert,
                ca: self.ca,
            },
            server_name: self.server_name,
            backup_dir: self.backup_dir,
            remote: RemoteConfig {
                endpoint: self.s3_endpoint,
                alias: self.alias,
                bucket: self.bucket,
                prefix: self.prefix,
                access_key: self.s3_access,
                secret_key: self.s3_secret,
            },
            etcdctl: self.etcdctl,
            mc_path: self.mc_path,
            mc_url: self.mc_url,
        }
    }
}
