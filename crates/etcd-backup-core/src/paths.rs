//! Local slot rotation and remote object key derivation.
//!
//! A run writes its snapshot into one of six local slots chosen from the
//! captured instant (`day % 2`, `hour % 3`), so local disk usage stays
//! bounded however often the job runs. The remote key embeds the full
//! timestamp and is unique per run.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, SubsecRound, Timelike, Utc};

use crate::error::{BackupError, BackupResult};

/// Number of distinct day buckets.
pub const DAY_BUCKETS: u8 = 2;
/// Number of distinct hour buckets.
pub const HOUR_BUCKETS: u8 = 3;

/// The single wall-clock instant a run derives all of its paths from.
///
/// Held at microsecond precision: every distinct instant renders to a
/// distinct remote key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotInstant(DateTime<Utc>);

impl SnapshotInstant {
    /// Capture the current time.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(6))
    }

    pub fn as_utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// `HH:MM:SS`, followed by `.ffffff` when the microsecond part is non-zero.
    fn render_time(&self) -> String {
        let hms = self.0.format("%H:%M:%S").to_string();
        match self.0.timestamp_subsec_micros() {
            0 => hms,
            micros => format!("{hms}.{micros:06}"),
        }
    }
}

impl From<DateTime<Utc>> for SnapshotInstant {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_utc(at)
    }
}

/// Source of the run's instant. Sampled exactly once per run.
pub trait Clock: Send + Sync {
    fn now(&self) -> SnapshotInstant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SnapshotInstant {
        SnapshotInstant::now()
    }
}

/// Clock pinned to one instant, for replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SnapshotInstant);

impl Clock for FixedClock {
    fn now(&self) -> SnapshotInstant {
        self.0
    }
}

/// A local generation slot: `(day % 2, hour % 3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex {
    pub day: u8,
    pub hour: u8,
}

impl SlotIndex {
    pub fn of(instant: &SnapshotInstant) -> Self {
        let at = instant.as_utc();
        Self {
            day: (at.day() % u32::from(DAY_BUCKETS)) as u8,
            hour: (at.hour() % u32::from(HOUR_BUCKETS)) as u8,
        }
    }

    /// Every slot a cluster can ever occupy.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..DAY_BUCKETS).flat_map(|day| (0..HOUR_BUCKETS).map(move |hour| SlotIndex { day, hour }))
    }

    pub fn file_name(&self, cluster: &str) -> String {
        format!("{cluster}-snapshot-{}-{}.db", self.day, self.hour)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.day, self.hour)
    }
}

/// Where one run's snapshot goes, locally and remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub local: PathBuf,
    pub remote_key: String,
    pub slot: SlotIndex,
}

/// Reject cluster names that would escape or collapse the per-cluster directory.
pub fn validate_cluster(cluster: &str) -> BackupResult<()> {
    if cluster.is_empty() {
        return Err(BackupError::config("cluster name must not be empty"));
    }
    if cluster == "." || cluster == ".." || cluster.contains(['/', '\\']) {
        return Err(BackupError::config(format!(
            "cluster name {cluster:?} must be a single path component"
        )));
    }
    Ok(())
}

/// `base_dir/cluster/cluster-snapshot-{day}-{hour}.db`. No I/O.
pub fn local_snapshot_path(cluster: &str, base_dir: &Path, instant: &SnapshotInstant) -> PathBuf {
    base_dir
        .join(cluster)
        .join(SlotIndex::of(instant).file_name(cluster))
}

/// `cluster/Y/M/cluster-YYYY-MM-DD_HH:MM:SS[.ffffff]-snapshot.db`. No I/O.
pub fn remote_object_key(cluster: &str, instant: &SnapshotInstant) -> String {
    let at = instant.as_utc();
    format!(
        "{cluster}/{year}/{month}/{cluster}-{date}_{time}-snapshot.db",
        year = at.year(),
        month = at.month(),
        date = at.format("%Y-%m-%d"),
        time = instant.render_time(),
    )
}

/// Compute both paths for a run and make sure the local directory exists.
///
/// Creating the directory is idempotent; an existing directory is not an error.
pub fn derive_paths(
    cluster: &str,
    base_dir: &Path,
    instant: &SnapshotInstant,
) -> BackupResult<SnapshotPaths> {
    validate_cluster(cluster)?;

    let dir = base_dir.join(cluster);
    std::fs::create_dir_all(&dir).map_err(|source| BackupError::Path {
        path: dir.clone(),
        source,
    })?;

    Ok(SnapshotPaths {
        local: local_snapshot_path(cluster, base_dir, instant),
        remote_key: remote_object_key(cluster, instant),
        slot: SlotIndex::of(instant),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> SnapshotInstant {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().into()
    }

    #[test]
    fn reference_instant_derives_expected_paths() {
        let instant = at(2024, 3, 15, 14, 22, 7);
        assert_eq!(
            local_snapshot_path("prod", Path::new("etcd-backups"), &instant),
            PathBuf::from("etcd-backups/prod/prod-snapshot-1-2.db")
        );
        assert_eq!(
            remote_object_key("prod", &instant),
            "prod/2024/3/prod-2024-03-15_14:22:07-snapshot.db"
        );
    }

    #[test]
    fn remote_key_includes_microseconds_when_present() {
        let instant = SnapshotInstant::from_utc(
            Utc.with_ymd_and_hms(2024, 11, 2, 3, 4, 5).unwrap()
                + chrono::Duration::microseconds(1_250),
        );
        assert_eq!(
            remote_object_key("dev", &instant),
            "dev/2024/11/dev-2024-11-02_03:04:05.001250-snapshot.db"
        );
    }

    #[test]
    fn sub_microsecond_precision_is_dropped_at_capture() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = SnapshotInstant::from_utc(base + chrono::Duration::nanoseconds(10));
        let b = SnapshotInstant::from_utc(base);
        assert_eq!(a, b);
    }

    #[test]
    fn six_slots_exist() {
        let slots: BTreeSet<_> = SlotIndex::all().collect();
        assert_eq!(slots.len(), 6);
        let names: BTreeSet<_> = slots.iter().map(|s| s.file_name("prod")).collect();
        assert!(names.contains("prod-snapshot-0-0.db"));
        assert!(names.contains("prod-snapshot-1-2.db"));
    }

    #[test]
    fn same_window_reuses_slot_and_different_window_does_not() {
        let base = Path::new("b");
        let first = at(2024, 3, 15, 14, 0, 1);
        let later_same_window = at(2024, 3, 15, 14, 59, 59);
        // hour 15 -> bucket 0
        let next_window = at(2024, 3, 15, 15, 0, 0);

        assert_eq!(
            local_snapshot_path("c", base, &first),
            local_snapshot_path("c", base, &later_same_window)
        );
        assert_ne!(
            local_snapshot_path("c", base, &first),
            local_snapshot_path("c", base, &next_window)
        );
        assert_ne!(
            remote_object_key("c", &first),
            remote_object_key("c", &later_same_window)
        );
    }

    #[test]
    fn derive_creates_directory_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let instant = at(2024, 3, 15, 14, 22, 7);

        let first = derive_paths("prod", tmp.path(), &instant).unwrap();
        assert!(tmp.path().join("prod").is_dir());
        let second = derive_paths("prod", tmp.path(), &instant).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.slot, SlotIndex { day: 1, hour: 2 });
        assert_eq!(first.local, tmp.path().join("prod/prod-snapshot-1-2.db"));
    }

    #[test]
    fn derive_fails_with_path_error_when_base_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let err = derive_paths("prod", &file, &at(2024, 3, 15, 14, 22, 7)).unwrap_err();
        assert!(matches!(err, BackupError::Path { .. }), "got {err:?}");
    }

    #[test]
    fn cluster_names_are_validated() {
        assert!(validate_cluster("prod-eu").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(
                matches!(validate_cluster(bad), Err(BackupError::Config { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    fn instant_strategy() -> impl Strategy<Value = SnapshotInstant> {
        // 2000-01-01 .. 2100-01-01
        (946_684_800i64..4_102_444_800i64, 0u32..1_000_000u32).prop_map(|(secs, micros)| {
            SnapshotInstant::from_utc(Utc.timestamp_opt(secs, micros * 1_000).unwrap())
        })
    }

    proptest! {
        #[test]
        fn slot_is_always_one_of_six(instant in instant_strategy()) {
            let slot = SlotIndex::of(&instant);
            prop_assert!(slot.day < DAY_BUCKETS);
            prop_assert!(slot.hour < HOUR_BUCKETS);
            let path = local_snapshot_path("prod", Path::new("etcd-backups"), &instant);
            let allowed: Vec<PathBuf> = SlotIndex::all()
                .map(|s| Path::new("etcd-backups/prod").join(s.file_name("prod")))
                .collect();
            prop_assert!(allowed.contains(&path));
        }

        #[test]
        fn distinct_instants_never_share_a_remote_key(
            a in instant_strategy(),
            b in instant_strategy(),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(remote_object_key("prod", &a), remote_object_key("prod", &b));
        }

        #[test]
        fn derivation_is_deterministic(instant in instant_strategy()) {
            prop_assert_eq!(
                remote_object_key("prod", &instant),
                remote_object_key("prod", &instant)
            );
            prop_assert_eq!(
                local_snapshot_path("prod", Path::new("x"), &instant),
                local_snapshot_path("prod", Path::new("x"), &instant)
            );
        }
    }
}
