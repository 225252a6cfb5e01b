//! Verified file downloads with a small worker pool

use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::logging::{log_download, log_warning};
use crate::task::TaskContext;
use crate::BoxError;

pub const USER_AGENT: &str = concat!("BarrieLauncher/", env!("CARGO_PKG_VERSION"));
pub const MAX_PARALLEL_DOWNLOADS: usize = 8;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub url: String,
    pub path: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            sha1: None,
            size: None,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1.filter(|s| !s.is_empty());
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    /// Whether the file on disk already satisfies this task
    pub fn is_satisfied(&self) -> bool {
        let Ok(meta) = fs::metadata(&self.path) else {
            return false;
        };
        if !meta.is_file() {
            return false;
        }
        match (&self.sha1, self.size) {
            (Some(expected), _) => matches!(file_sha1(&self.path), Ok(actual) if actual.eq_ignore_ascii_case(expected)),
            (None, Some(size)) => meta.len() == size,
            (None, None) => meta.len() > 0,
        }
    }
}

pub fn file_sha1(path: &Path) -> Result<String, std::io::Error> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 65536];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// GET a URL and decode the JSON body
pub fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, BoxError> {
    let response = ureq::get(url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(30))
        .call()?;
    Ok(response.into_json()?)
}

/// GET a URL and return the body as text
pub fn get_text(url: &str) -> Result<String, BoxError> {
    let response = ureq::get(url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(30))
        .call()?;
    Ok(response.into_string()?)
}

/// Download a single file, skipping it when the existing copy verifies
pub fn download_file(task: &DownloadTask) -> Result<bool, BoxError> {
    if task.is_satisfied() {
        return Ok(false);
    }

    let mut last_error: Option<BoxError> = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match try_download(task) {
            Ok(()) => return Ok(true),
            Err(e) => {
                log_warning(&format!(
                    "Download attempt {}/{} failed for {}: {}",
                    attempt, MAX_ATTEMPTS, task.url, e
                ));
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| format!("Failed to download {}", task.url).into()))
}

fn try_download(task: &DownloadTask) -> Result<(), BoxError> {
    if let Some(parent) = task.path.parent() {
        fs::create_dir_all(parent)?;
    }

    let part_path = part_path(&task.path);
    let response = ureq::get(&task.url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(120))
        .call()?;

    let result = write_verified(response.into_reader(), &part_path, task);
    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }
    result
}

/// Stream a body into `part_path` and move it into place once the hash matches
fn write_verified(mut reader: impl Read, part_path: &Path, task: &DownloadTask) -> Result<(), BoxError> {
    let mut file = fs::File::create(part_path)?;
    let mut buffer = [0u8; 65536];
    let mut hasher = Sha1::new();
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        file.write_all(&buffer[..n])?;
    }
    file.flush()?;
    drop(file);

    if let Some(expected) = &task.sha1 {
        let actual = format!("{:x}", hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(format!(
                "Checksum mismatch for {} (expected {}, got {})",
                task.path.display(),
                expected,
                actual
            )
            .into());
        }
    }

    fs::rename(part_path, &task.path)?;
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Download many files on a fixed pool of worker threads.
///
/// Progress is reported as completed / total. Failures are gathered and
/// reported together once the queue drains.
pub fn download_all(tasks: Vec<DownloadTask>, ctx: &TaskContext) -> Result<usize, BoxError> {
    let mut tasks = tasks;
    tasks.retain(|t| !t.url.is_empty());
    tasks.sort_by(|a, b| a.path.cmp(&b.path));
    tasks.dedup_by(|a, b| a.path == b.path);

    let total = tasks.len();
    if total == 0 {
        ctx.set_progress(1.0);
        return Ok(0);
    }

    let queue = Mutex::new(tasks);
    let completed = AtomicUsize::new(0);
    let fetched = AtomicUsize::new(0);
    let failures: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let workers = MAX_PARALLEL_DOWNLOADS.min(total);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if ctx.is_cancelled() {
                    break;
                }
                let Some(task) = queue.lock().pop() else {
                    break;
                };

                match download_file(&task) {
                    Ok(true) => {
                        fetched.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {}
                    Err(e) => failures
                        .lock()
                        .push(format!("{}: {}", task.path.display(), e)),
                }

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                ctx.set_progress(done as f32 / total as f32);
            });
        }
    });

    if ctx.is_cancelled() {
        return Err("Cancelled".into());
    }

    let failures = failures.into_inner();
    if !failures.is_empty() {
        for failure in &failures {
            ctx.log(format!("Download failed: {}", failure));
        }
        return Err(format!(
            "{} of {} downloads failed; first error: {}",
            failures.len(),
            total,
            failures[0]
        )
        .into());
    }

    let fetched = fetched.into_inner();
    if fetched > 0 {
        log_download(&format!("Fetched {} of {} files", fetched, total));
    }
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;

    /// Serve `body` over plain HTTP on every connection, announcing
    /// `declared_len` bytes. Returns the URL and a connection counter.
    fn serve(body: &'static [u8], declared_len: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/file.bin", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut byte = [0u8; 1];
                while !request.ends_with(b"\r\n\r\n") {
                    match stream.read(&mut byte) {
                        Ok(1) => request.push(byte[0]),
                        _ => break,
                    }
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    declared_len
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body);
            }
        });
        (url, hits)
    }

    // sha1("hello world")
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    #[test]
    fn test_file_sha1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, "hello world").unwrap();
        assert_eq!(file_sha1(&path).unwrap(), HELLO_SHA1);
    }

    #[test]
    fn test_is_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");

        let task = DownloadTask::new("https://example.invalid/hello", &path)
            .with_sha1(Some(HELLO_SHA1.to_uppercase()));
        assert!(!task.is_satisfied());

        fs::write(&path, "hello world").unwrap();
        assert!(task.is_satisfied());

        let wrong = DownloadTask::new("https://example.invalid/hello", &path)
            .with_sha1(Some("0000".to_string()));
        assert!(!wrong.is_satisfied());

        let sized = DownloadTask::new("https://example.invalid/hello", &path).with_size(Some(11));
        assert!(sized.is_satisfied());
        let sized = DownloadTask::new("https://example.invalid/hello", &path).with_size(Some(12));
        assert!(!sized.is_satisfied());
    }

    #[test]
    fn test_download_all_skips_verified_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, "hello world").unwrap();

        let tasks = vec![
            DownloadTask::new("https://example.invalid/hello", &path).with_sha1(Some(HELLO_SHA1.to_string())),
            DownloadTask::new("", dir.path().join("ignored")),
        ];
        let fetched = download_all(tasks, &TaskContext::silent()).unwrap();
        assert_eq!(fetched, 0);
    }

    #[test]
    fn test_download_all_respects_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = TaskContext::silent();
        ctx.cancel();
        let tasks = vec![DownloadTask::new("https://example.invalid/x", dir.path().join("x"))];
        assert!(download_all(tasks, &ctx).is_err());
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(part_path(Path::new("/a/b/c.jar")), PathBuf::from("/a/b/c.jar.part"));
    }

    #[test]
    fn test_download_verifies_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libs").join("hello.txt");
        let (url, hits) = serve(b"hello world", 11);

        let task = DownloadTask::new(url, &path).with_sha1(Some(HELLO_SHA1.to_string()));
        assert!(download_file(&task).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
        assert!(!part_path(&path).exists());

        // Already verified on disk, so no second request
        assert!(!download_file(&task).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_checksum_mismatch_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        let (url, hits) = serve(b"hello world", 11);

        let task = DownloadTask::new(url, &path).with_sha1(Some("0".repeat(40)));
        let err = download_file(&task).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }

    #[test]
    fn test_truncated_body_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        // Connection closes after 5 of the 100 announced bytes
        let (url, _hits) = serve(b"hello", 100);

        assert!(download_file(&DownloadTask::new(url, &path)).is_err());
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }
}
