//! Logging setup
//!
//! `tracing` output goes to stderr and to a per-day log directory. The file
//! is rotated by size within a day; past days are gzipped and directories
//! older than the retention window are removed by a background task.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Size at which the current log file is rotated (10 MB)
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Days of logs kept on disk
const RETENTION_DAYS: i64 = 7;
const LOG_BASE_NAME: &str = "picshelf.log";
const DATE_FORMAT: &str = "%Y-%m-%d";

struct LogFileState {
    logs_root: PathBuf,
    current_date: String,
    file: Option<File>,
    written_bytes: u64,
    max_file_size: u64,
}

impl LogFileState {
    fn today() -> String {
        chrono::Local::now().format(DATE_FORMAT).to_string()
    }

    fn day_dir(&self, date: &str) -> PathBuf {
        self.logs_root.join(date)
    }

    /// Open today's file, switching directories when the date changes.
    fn current_file(&mut self) -> io::Result<&mut File> {
        let today = Self::today();
        if self.current_date != today {
            self.file = None;
        }

        if self.file.is_none() {
            let dir = self.day_dir(&today);
            fs::create_dir_all(&dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_BASE_NAME))?;
            self.written_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
            self.current_date = today;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))
    }

    /// Shift `picshelf.log.N` to `.N+1` and start a fresh `picshelf.log`.
    fn rotate_if_needed(&mut self) {
        if self.file.is_none() || self.written_bytes < self.max_file_size {
            return;
        }
        self.file = None;

        let dir = self.day_dir(&self.current_date);
        let prefix = format!("{}.", LOG_BASE_NAME);
        let highest = fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|e| {
                        e.file_name()
                            .to_string_lossy()
                            .strip_prefix(&prefix)
                            .and_then(|n| n.parse::<u32>().ok())
                    })
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        for i in (1..=highest).rev() {
            let _ = fs::rename(
                dir.join(format!("{}{}", prefix, i)),
                dir.join(format!("{}{}", prefix, i + 1)),
            );
        }
        let _ = fs::rename(dir.join(LOG_BASE_NAME), dir.join(format!("{}1", prefix)));
        self.written_bytes = 0;
    }
}

/// A `MakeWriter` that appends to `<logs_root>/<date>/picshelf.log`.
#[derive(Clone)]
pub struct DailyRotatingWriter {
    state: Arc<Mutex<LogFileState>>,
}

impl DailyRotatingWriter {
    pub fn new(logs_root: PathBuf) -> Self {
        Self::with_max_size(logs_root, MAX_FILE_SIZE)
    }

    fn with_max_size(logs_root: PathBuf, max_file_size: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LogFileState {
                logs_root,
                current_date: String::new(),
                file: None,
                written_bytes: 0,
                max_file_size,
            })),
        }
    }
}

pub struct LogFileHandle {
    state: Arc<Mutex<LogFileState>>,
}

impl Write for LogFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.rotate_if_needed();
        let n = state.current_file()?.write(buf)?;
        state.written_bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.file {
            Some(ref mut f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for DailyRotatingWriter {
    type Writer = LogFileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Install the global subscriber: a plain-text file layer and a coloured
/// stderr layer, both filtered by `RUST_LOG`.
pub fn init_logging(logs_root: &Path) -> DailyRotatingWriter {
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    let _ = fs::create_dir_all(logs_root);
    let writer = DailyRotatingWriter::new(logs_root.to_path_buf());

    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer.clone())
        .with_filter(filter());

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    writer
}

/// Compress and prune old log directories now and then every night.
pub fn spawn_maintenance_task(logs_root: PathBuf) {
    tokio::spawn(async move {
        run_maintenance(&logs_root);

        loop {
            tokio::time::sleep(until_next_maintenance()).await;
            run_maintenance(&logs_root);
        }
    });
}

/// Time until 00:05 local time tomorrow, at least one minute.
fn until_next_maintenance() -> std::time::Duration {
    let now = chrono::Local::now();
    let next = (now.date_naive() + chrono::Duration::days(1))
        .and_hms_opt(0, 5, 0)
        .and_then(|t| t.and_local_timezone(chrono::Local).earliest());
    let secs = next
        .map(|t| (t - now).num_seconds())
        .unwrap_or(24 * 60 * 60)
        .max(60);
    std::time::Duration::from_secs(secs as u64)
}

fn run_maintenance(logs_root: &Path) {
    let today = chrono::Local::now().date_naive();
    let cutoff = today - chrono::Duration::days(RETENTION_DAYS);

    let entries = match fs::read_dir(logs_root) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let date = match chrono::NaiveDate::parse_from_str(&name, DATE_FORMAT) {
            Ok(d) => d,
            Err(_) => continue,
        };
        if date >= today {
            continue;
        }

        let dir = entry.path();
        if date < cutoff {
            tracing::info!("Removing old log directory: {}", name);
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!("Failed to remove {}: {}", dir.display(), e);
            }
            continue;
        }

        compress_day(&dir);
    }
}

fn is_uncompressed_log(file_name: &str) -> bool {
    file_name == LOG_BASE_NAME
        || (file_name.starts_with(&format!("{}.", LOG_BASE_NAME)) && !file_name.ends_with(".gz"))
}

fn compress_day(dir: &Path) {
    let Ok(files) = fs::read_dir(dir) else {
        return;
    };
    for file in files.flatten() {
        if !is_uncompressed_log(&file.file_name().to_string_lossy()) {
            continue;
        }
        let src = file.path();
        let mut dst = src.clone().into_os_string();
        dst.push(".gz");
        let dst = PathBuf::from(dst);

        match gzip_file(&src, &dst) {
            Ok(()) => {
                let _ = fs::remove_file(&src);
            }
            Err(e) => tracing::warn!("Failed to gzip {}: {}", src.display(), e),
        }
    }
}

fn gzip_file(src: &Path, dst: &Path) -> io::Result<()> {
    let input = fs::read(src)?;
    let mut encoder = GzEncoder::new(File::create(dst)?, Compression::default());
    encoder.write_all(&input)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn writes_into_todays_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DailyRotatingWriter::new(dir.path().to_path_buf());
        writer.make_writer().write_all(b"hello\n").unwrap();

        let path = dir.path().join(LogFileState::today()).join(LOG_BASE_NAME);
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
    }

    #[test]
    fn rotates_when_size_is_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DailyRotatingWriter::with_max_size(dir.path().to_path_buf(), 8);
        let mut handle = writer.make_writer();
        handle.write_all(b"first line\n").unwrap();
        handle.write_all(b"second line\n").unwrap();
        handle.write_all(b"third line\n").unwrap();

        let day = dir.path().join(LogFileState::today());
        assert_eq!(fs::read_to_string(day.join(LOG_BASE_NAME)).unwrap(), "third line\n");
        assert_eq!(
            fs::read_to_string(day.join(format!("{}.1", LOG_BASE_NAME))).unwrap(),
            "second line\n"
        );
        assert_eq!(
            fs::read_to_string(day.join(format!("{}.2", LOG_BASE_NAME))).unwrap(),
            "first line\n"
        );
    }

    #[test]
    fn maintenance_compresses_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let today = chrono::Local::now().date_naive();
        let fmt = |d: chrono::NaiveDate| d.format(DATE_FORMAT).to_string();

        let yesterday = dir.path().join(fmt(today - chrono::Duration::days(1)));
        let ancient = dir.path().join(fmt(today - chrono::Duration::days(30)));
        let current = dir.path().join(fmt(today));
        for d in [&yesterday, &ancient, &current] {
            fs::create_dir_all(d).unwrap();
            fs::write(d.join(LOG_BASE_NAME), b"log body").unwrap();
        }
        fs::write(yesterday.join(format!("{}.1", LOG_BASE_NAME)), b"older").unwrap();
        fs::create_dir_all(dir.path().join("not-a-date")).unwrap();

        run_maintenance(dir.path());

        assert!(!ancient.exists());
        assert!(current.join(LOG_BASE_NAME).exists());
        assert!(dir.path().join("not-a-date").exists());
        assert!(!yesterday.join(LOG_BASE_NAME).exists());

        let mut text = String::new();
        GzDecoder::new(File::open(yesterday.join("picshelf.log.gz")).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "log body");
        assert!(yesterday.join("picshelf.log.1.gz").exists());
    }

    #[test]
    fn next_maintenance_is_within_a_day() {
        let wait = until_next_maintenance();
        assert!(wait.as_secs() >= 60);
        assert!(wait.as_secs() <= 25 * 60 * 60);
    }
}
