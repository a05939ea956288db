pub mod args;

use anyhow::Context;
use etcd_backup_core::{BackupError, Orchestrator, SystemRunner};
use tracing::info;

use crate::exit_codes;
use args::Cli;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config();
    let cluster = config.cluster_name.clone();

    let report = Orchestrator::new(config, SystemRunner)
        .run()
        .await
        .with_context(|| format!("backup of cluster {cluster:?} failed"))?;

    info!(
        cluster = %cluster,
        slot = %report.slot,
        local = %report.local_path.display(),
        "backup complete"
    );
    println!("{}", report.remote_object);
    Ok(())
}

pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BackupError>()
        .map(BackupError::exit_code)
        .unwrap_or(exit_codes::COMMAND_FAILED)
}
