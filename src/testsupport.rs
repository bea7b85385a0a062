//! Test doubles shared by unit tests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;

use crate::api::{DocumentBackend, Endpoint};
use crate::error::ApiError;
use crate::models::{BackendStatus, WorkoutPayload};
use crate::submit::DownloadSink;

/// Serve exactly one HTTP response on a loopback port.
///
/// Returns the base URL and a handle yielding the raw request text.
pub fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).expect("write head");
        stream.write_all(&body).expect("write body");
        stream.flush().expect("flush");
        request
    });
    (format!("http://{addr}"), handle)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).expect("read");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let body_len = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

#[derive(Clone, Debug)]
pub enum Scripted {
    Body(Vec<u8>),
    Fail(u16, String),
}

/// In-memory backend answering from a fixed script and recording calls.
#[derive(Default)]
pub struct ScriptedBackend {
    pub templates: Vec<String>,
    pub status: BackendStatus,
    responses: HashMap<Endpoint, Scripted>,
    calls: Mutex<Vec<Endpoint>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, endpoint: Endpoint, body: &[u8]) -> Self {
        self.responses.insert(endpoint, Scripted::Body(body.to_vec()));
        self
    }

    pub fn fail(mut self, endpoint: Endpoint, status: u16, detail: &str) -> Self {
        self.responses
            .insert(endpoint, Scripted::Fail(status, detail.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl DocumentBackend for ScriptedBackend {
    fn list_templates(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.templates.clone())
    }

    fn status(&self) -> Result<BackendStatus, ApiError> {
        Ok(self.status.clone())
    }

    fn post(&self, endpoint: Endpoint, _payload: &WorkoutPayload) -> Result<Vec<u8>, ApiError> {
        self.calls.lock().expect("calls lock").push(endpoint);
        match self.responses.get(&endpoint) {
            Some(Scripted::Body(bytes)) => Ok(bytes.clone()),
            Some(Scripted::Fail(status, detail)) => Err(ApiError::Backend {
                status: *status,
                detail: detail.clone(),
            }),
            None => Err(ApiError::Backend {
                status: 404,
                detail: "Not Found".to_string(),
            }),
        }
    }
}

/// Download sink that keeps saved files in memory.
#[derive(Default)]
pub struct MemorySink {
    pub saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl DownloadSink for MemorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        self.saved
            .lock()
            .expect("saved lock")
            .push((filename.to_string(), bytes.to_vec()));
        Ok(PathBuf::from("/downloads").join(filename))
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gymlog-test-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
