//! Process exit codes.
//! Backup failures map through `BackupError::exit_code`: a failing etcdctl or
//! mc propagates its own status, config errors exit 2, local path errors 3,
//! helper download errors 4.

pub const SUCCESS: i32 = 0;
pub const COMMAND_FAILED: i32 = 1; // Any failure that is not a BackupError
