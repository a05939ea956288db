//! TLS client material for etcdctl and the per-run credential context.

use std::path::{Path, PathBuf};

use sysinfo::System;

use crate::error::{BackupError, BackupResult};

/// Root of the per-host TLS layout.
pub const ETCD_SSL_ROOT: &str = "/etc/etcd/ssl";

/// Environment variables etcdctl reads credentials from. Stripped from every
/// child so values left over in the operator's shell cannot override the
/// explicit flags.
pub const ETCDCTL_CREDENTIAL_VARS: [&str; 3] = ["ETCDCTL_KEY", "ETCDCTL_CERT", "ETCDCTL_CACERT"];

/// Caller-supplied TLS paths; any field left `None` falls back to the host template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOverrides {
    pub key: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub ca: Option<PathBuf>,
}

/// Resolved client key, certificate and CA for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterials {
    pub key: PathBuf,
    pub cert: PathBuf,
    pub ca: PathBuf,
}

impl TlsMaterials {
    /// Default layout for `host` under [`ETCD_SSL_ROOT`].
    pub fn for_host(host: &str) -> Self {
        let dir = Path::new(ETCD_SSL_ROOT).join(host);
        Self {
            key: dir.join(format!("{host}-client-key.pem")),
            cert: dir.join(format!("{host}-client.pem")),
            ca: dir.join("client-ca.pem"),
        }
    }

    /// Apply overrides on top of the template for `host`.
    pub fn resolve(overrides: &TlsOverrides, host: &str) -> Self {
        let defaults = Self::for_host(host);
        Self {
            key: overrides.key.clone().unwrap_or(defaults.key),
            cert: overrides.cert.clone().unwrap_or(defaults.cert),
            ca: overrides.ca.clone().unwrap_or(defaults.ca),
        }
    }
}

/// Hostname of this machine, used to locate the default TLS material.
pub fn local_hostname() -> BackupResult<String> {
    System::host_name()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| BackupError::config("could not determine local hostname; pass --server-name"))
}

/// Credentials scoped to a single run.
///
/// Built fresh for every run and handed to each external invocation. Nothing
/// here touches the parent process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialContext {
    pub tls: TlsMaterials,
    cleared_env: Vec<String>,
}

impl CredentialContext {
    pub fn new(tls: TlsMaterials) -> Self {
        Self {
            tls,
            cleared_env: ETCDCTL_CREDENTIAL_VARS
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }

    /// Resolve TLS paths for `server_name`, or for the local host when absent.
    pub fn resolve(overrides: &TlsOverrides, server_name: Option<&str>) -> BackupResult<Self> {
        let host = match server_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if overrides.key.is_some() && overrides.cert.is_some() && overrides.ca.is_some() => {
                // Every path is explicit; the hostname is never consulted.
                String::new()
            }
            _ => local_hostname()?,
        };
        Ok(Self::new(TlsMaterials::resolve(overrides, &host)))
    }

    /// Variables to remove from the environment of spawned tools.
    pub fn cleared_env(&self) -> &[String] {
        &self.cleared_env
    }
}
