//! Shared test infrastructure for CLI integration tests.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Nothing listens on the discard port, so lookups fail fast.
pub const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9";

/// Scratch directory holding a dataset, a config file, and run outputs.
pub struct TestFixture {
    dir: TempDir,
}

impl TestFixture {
    pub fn setup() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Config pointing lookups at an endpoint that refuses connections.
    pub fn write_offline_config(&self) -> PathBuf {
        self.write(
            "config.json",
            &format!(
                r#"{{"schema_version": 1, "endpoint": "{UNREACHABLE_ENDPOINT}", "timeout_secs": 5}}"#
            ),
        )
    }

    /// Config pointing lookups at a local stand-in service.
    pub fn write_config_for(&self, endpoint: &str) -> PathBuf {
        self.write(
            "config.json",
            &format!(r#"{{"schema_version": 1, "endpoint": "{endpoint}", "timeout_secs": 5}}"#),
        )
    }

    /// Run `cenrich` with `--config` and no inherited API key.
    pub fn cenrich(&self, config: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cenrich"))
            .args(args)
            .arg("--config")
            .arg(config)
            .env_remove("GEMINI_API_KEY")
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path())
            .output()
            .expect("spawn cenrich")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Parse a CSV into header and rows, the way a spreadsheet user would read it.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.expect("record").iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

/// Local HTTP server that answers every request with one canned
/// `generateContent` reply and counts the requests it served.
pub struct CannedService {
    endpoint: String,
    requests: Arc<AtomicUsize>,
}

impl CannedService {
    pub fn start(reply_text: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind canned service");
        let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));
        let body = serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": reply_text}]}}]
        })
        .to_string();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                counter.fetch_add(1, Ordering::SeqCst);
                respond(stream, &body);
            }
        });
        Self { endpoint, requests }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn respond(stream: TcpStream, body: &str) {
    let mut reader = BufReader::new(stream);
    let mut content_length = 0usize;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("transfer-encoding") {
                chunked = value.trim().eq_ignore_ascii_case("chunked");
            }
        }
    }
    let drained = if chunked {
        drain_chunked(&mut reader)
    } else {
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).is_ok()
    };
    if !drained {
        return;
    }
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn drain_chunked(reader: &mut BufReader<TcpStream>) -> bool {
    loop {
        let mut size_line = String::new();
        if reader.read_line(&mut size_line).unwrap_or(0) == 0 {
            return false;
        }
        let size_hex = size_line.trim().split(';').next().unwrap_or("0");
        let Ok(size) = usize::from_str_radix(size_hex, 16) else {
            return false;
        };
        // chunk data plus its trailing CRLF; the last chunk is followed by an empty line
        let mut chunk = vec![0u8; size + 2];
        if reader.read_exact(&mut chunk).is_err() {
            return false;
        }
        if size == 0 {
            return true;
        }
    }
}
