//! Size-based log file rotation
//!
//! [`RotatingFileWriter`] appends to a single log file and, once the next
//! write would take it past the size limit, renames it to a timestamped
//! backup and starts a fresh file. After each rotation the backups are
//! reconciled:
//! - only the newest `max_backups` are kept
//! - backups older than `max_age` are deleted
//! - remaining plain backups are gzip-compressed
//!
//! Backup names look like `crowdsec-custom-bouncer-2024-05-01T13-45-10.123.log`
//! (UTC), with a `.gz` suffix once compressed.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::models::logging_plan::RotationPolicy;

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

/// Log file writer with size, count and age based retention
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    file: File,
    size: u64,
    /// Maximum file size in bytes before rotation
    max_bytes: u64,
    /// Backups kept, 0 keeps all
    max_backups: usize,
    /// Age after which backups are removed, zero keeps forever
    max_age: Duration,
    compress: bool,
    last_backup: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Backup {
    path: PathBuf,
    timestamp: DateTime<Utc>,
    compressed: bool,
}

impl RotatingFileWriter {
    /// Open `path` for appending with the limits of `policy`
    pub fn open(path: impl Into<PathBuf>, policy: &RotationPolicy) -> io::Result<Self> {
        Self::with_limits(
            path,
            policy.max_size_bytes(),
            policy.max_backups,
            policy.max_age(),
            policy.compress,
        )
    }

    /// Open `path` for appending with explicit limits
    ///
    /// Missing parent directories are created.
    pub fn with_limits(
        path: impl Into<PathBuf>,
        max_bytes: u64,
        max_backups: usize,
        max_age: Duration,
        compress: bool,
    ) -> io::Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            size,
            max_bytes,
            max_backups,
            max_age,
            compress,
            last_backup: None,
        })
    }

    /// Path of the live log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes currently in the live log file
    pub const fn size(&self) -> u64 {
        self.size
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        self.size.saturating_add(incoming) > self.max_bytes
    }

    /// Move the live file to a backup and start a new one
    pub fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let backup = self.next_backup_path(Utc::now());
        fs::rename(&self.path, &backup)?;

        self.file = open_append(&self.path)?;
        self.size = 0;

        // retention failures do not fail the write; this is the log sink, so stderr
        if let Err(err) = self.reconcile_backups() {
            eprintln!(
                "failed to clean up rotated logs for {}: {err}",
                self.path.display()
            );
        }

        Ok(())
    }

    fn file_name_parts(&self) -> (String, Option<String>) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|s| s.to_string_lossy().into_owned());
        (stem, ext)
    }

    fn backup_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        let (stem, ext) = self.file_name_parts();
        let stamp = timestamp.format(BACKUP_TIMESTAMP_FORMAT);
        let name = match ext {
            Some(ext) => format!("{stem}-{stamp}.{ext}"),
            None => format!("{stem}-{stamp}"),
        };
        self.path.with_file_name(name)
    }

    /// Backup path for `now`, strictly newer than the previous backup and
    /// not colliding with an existing file
    fn next_backup_path(&mut self, now: DateTime<Utc>) -> PathBuf {
        let mut timestamp = now.trunc_subsecs(3);
        if let Some(last) = self.last_backup {
            if timestamp <= last {
                timestamp = last + TimeDelta::milliseconds(1);
            }
        }

        loop {
            let candidate = self.backup_path(timestamp);
            if !candidate.exists() && !gz_path(&candidate).exists() {
                self.last_backup = Some(timestamp);
                return candidate;
            }
            timestamp += TimeDelta::milliseconds(1);
        }
    }

    fn parse_backup_name(&self, name: &str) -> Option<(DateTime<Utc>, bool)> {
        let (stem, ext) = self.file_name_parts();

        let (name, compressed) = match name.strip_suffix(COMPRESS_SUFFIX) {
            Some(rest) => (rest, true),
            None => (name, false),
        };

        let rest = name.strip_prefix(&format!("{stem}-"))?;
        let stamp = match ext {
            Some(ext) => rest.strip_suffix(&format!(".{ext}"))?,
            None => rest,
        };

        NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT)
            .ok()
            .map(|ts| (ts.and_utc(), compressed))
    }

    /// Rotated files next to the live log, newest first
    fn backups(&self) -> io::Result<Vec<Backup>> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };

        let mut backups = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some((timestamp, compressed)) = self.parse_backup_name(name) {
                backups.push(Backup {
                    path: entry.path(),
                    timestamp,
                    compressed,
                });
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    fn reconcile_backups(&self) -> io::Result<()> {
        let mut backups = self.backups()?;
        let mut remove = Vec::new();

        if self.max_backups > 0 {
            // a plain file and its .gz twin count as one backup
            let mut preserved = HashSet::new();
            let mut remaining = Vec::new();
            for backup in backups {
                preserved.insert(backup.timestamp);
                if preserved.len() > self.max_backups {
                    remove.push(backup);
                } else {
                    remaining.push(backup);
                }
            }
            backups = remaining;
        }

        if !self.max_age.is_zero() {
            let now = Utc::now();
            let (expired, remaining): (Vec<_>, Vec<_>) =
                backups.into_iter().partition(|backup| {
                    now.signed_duration_since(backup.timestamp)
                        .to_std()
                        .is_ok_and(|age| age > self.max_age)
                });
            remove.extend(expired);
            backups = remaining;
        }

        for backup in &remove {
            fs::remove_file(&backup.path)?;
        }

        if self.compress {
            for backup in backups.iter().filter(|b| !b.compressed) {
                compress_file(&backup.path)?;
            }
        }

        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let incoming = u64::try_from(buf.len()).unwrap_or(u64::MAX);

        if incoming > self.max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {incoming} exceeds maximum file size {}",
                    self.max_bytes
                ),
            ));
        }

        if self.should_rotate(incoming) {
            self.rotate()?;
        }

        let written = self.file.write(buf)?;
        self.size += u64::try_from(written).unwrap_or(u64::MAX);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}

/// Gzip `path` into `path.gz` and remove the original
fn compress_file(path: &Path) -> io::Result<()> {
    let mut source = File::open(path)?;
    let target = File::create(gz_path(path))?;

    let mut encoder = GzEncoder::new(target, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?.sync_all()?;

    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn backup_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("app-"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested/dir/app.log");

        let writer = RotatingFileWriter::open(&log_path, &RotationPolicy::default()).unwrap();

        assert!(log_path.exists());
        assert_eq!(writer.path(), log_path);
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");
        fs::write(&log_path, b"existing\n").unwrap();

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 1024, 3, Duration::ZERO, false).unwrap();
        assert_eq!(writer.size(), 9);

        writer.write_all(b"more\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&log_path).unwrap(), "existing\nmore\n");
        assert_eq!(writer.size(), 14);
    }

    #[test]
    fn test_rotates_when_limit_exceeded() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 10, 3, Duration::ZERO, false).unwrap();
        writer.write_all(b"0123456789").unwrap();
        writer.write_all(b"abc").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&log_path).unwrap(), "abc");

        let backups = backup_names(temp_dir.path());
        assert_eq!(backups.len(), 1);
        assert!(backups[0].ends_with(".log"));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(&backups[0])).unwrap(),
            "0123456789"
        );
    }

    #[test]
    fn test_does_not_rotate_below_limit() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 1024, 3, Duration::ZERO, false).unwrap();
        writer.write_all(b"small content").unwrap();

        assert!(backup_names(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_rejects_write_larger_than_limit() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 4, 3, Duration::ZERO, false).unwrap();
        let err = writer.write(b"too long").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(backup_names(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_keeps_at_most_max_backups() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 8, 2, Duration::ZERO, false).unwrap();
        for i in 0..6 {
            writer.write_all(format!("line {i}\n").as_bytes()).unwrap();
        }

        let backups = backup_names(temp_dir.path());
        assert_eq!(backups.len(), 2);
        // newest backups survive
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(&backups[1])).unwrap(),
            "line 4\n"
        );
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "line 5\n");
    }

    #[test]
    fn test_unlimited_backups_when_zero() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 8, 0, Duration::ZERO, false).unwrap();
        for i in 0..5 {
            writer.write_all(format!("line {i}\n").as_bytes()).unwrap();
        }

        assert_eq!(backup_names(temp_dir.path()).len(), 4);
    }

    #[test]
    fn test_removes_expired_backups() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");
        let stale = temp_dir.path().join("app-2000-01-01T00-00-00.000.log");
        let stale_gz = temp_dir.path().join("app-2001-01-01T00-00-00.000.log.gz");
        fs::write(&stale, b"old").unwrap();
        fs::write(&stale_gz, b"old").unwrap();

        let mut writer = RotatingFileWriter::with_limits(
            &log_path,
            8,
            10,
            Duration::from_secs(86_400),
            false,
        )
        .unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();

        assert!(!stale.exists());
        assert!(!stale_gz.exists());
        assert_eq!(backup_names(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_compresses_backups() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 8, 3, Duration::ZERO, true).unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();

        let backups = backup_names(temp_dir.path());
        assert_eq!(backups.len(), 1);
        assert!(backups[0].ends_with(".log.gz"));

        let mut decoder = GzDecoder::new(File::open(temp_dir.path().join(&backups[0])).unwrap());
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "first\n");
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("app.log");
        fs::write(temp_dir.path().join("data.txt"), b"text").unwrap();
        fs::write(temp_dir.path().join("app-notadate.log"), b"log").unwrap();
        fs::write(temp_dir.path().join("other-2000-01-01T00-00-00.000.log"), b"log").unwrap();

        let mut writer =
            RotatingFileWriter::with_limits(&log_path, 8, 1, Duration::from_secs(60), true)
                .unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();

        assert!(temp_dir.path().join("data.txt").exists());
        assert!(temp_dir.path().join("app-notadate.log").exists());
        assert!(temp_dir
            .path()
            .join("other-2000-01-01T00-00-00.000.log")
            .exists());
    }

    #[test]
    fn test_backup_name_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let writer = RotatingFileWriter::open(
            temp_dir.path().join("crowdsec-custom-bouncer.log"),
            &RotationPolicy::default(),
        )
        .unwrap();

        let timestamp = NaiveDateTime::parse_from_str(
            "2024-05-01T13-45-10.123",
            BACKUP_TIMESTAMP_FORMAT,
        )
        .unwrap()
        .and_utc();
        let backup = writer.backup_path(timestamp);
        let name = backup.file_name().unwrap().to_str().unwrap();

        assert_eq!(name, "crowdsec-custom-bouncer-2024-05-01T13-45-10.123.log");
        assert_eq!(writer.parse_backup_name(name), Some((timestamp, false)));
        assert_eq!(
            writer.parse_backup_name(&format!("{name}.gz")),
            Some((timestamp, true))
        );
        assert_eq!(writer.parse_backup_name("crowdsec-custom-bouncer.log"), None);
    }
}
