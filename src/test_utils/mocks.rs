//! In-memory stand-ins for the network-facing traits.

use crate::catalog::{CatalogEntry, RemoteCatalog};
use crate::core::{Result, UpdateError};
use crate::transport::Transport;
use crate::utils::progress::{ProgressEvent, ProgressSink};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Script {
    bodies: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    calls: Vec<String>,
}

/// Transport answering from a URL → body table.
///
/// Unknown URLs and URLs marked with [`fail`](Self::fail) produce
/// [`UpdateError::TransferFailure`]. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> &Self {
        self.lock().bodies.insert(url.into(), body.into());
        self
    }

    pub fn fail(&self, url: impl Into<String>) -> &Self {
        self.lock().failing.insert(url.into());
        self
    }

    /// URLs requested so far, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>> {
        let mut script = self.lock();
        script.calls.push(url.to_string());
        if script.failing.contains(url) {
            return Err(UpdateError::TransferFailure {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        script.bodies.get(url).cloned().ok_or_else(|| UpdateError::TransferFailure {
            url: url.to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        })
    }
}

impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let body = self.respond(url)?;
        tokio::fs::write(dest, body).await.map_err(|e| UpdateError::io("Writing download", dest, e))
    }

    async fn fetch_archive(&self, url: &str, dest: &Path, progress: &dyn ProgressSink) -> Result<()> {
        let body = self.respond(url)?;
        tokio::fs::write(dest, body).await.map_err(|e| UpdateError::io("Writing download", dest, e))?;
        progress.emit(ProgressEvent::Archive {
            percent: 100,
        });
        Ok(())
    }
}

/// Catalog with a fixed listing per ref.
///
/// Raw URLs are `mock://files/{ref}/{path}`; the archive URL, when enabled, is
/// `mock://archive/{ref}`.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    trees: HashMap<String, Vec<CatalogEntry>>,
    with_archive: bool,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds blobs `(path, hash)` to the listing of `git_ref`.
    #[must_use]
    pub fn with_files(mut self, git_ref: &str, files: &[(&str, &str)]) -> Self {
        let tree = self.trees.entry(git_ref.to_string()).or_default();
        tree.extend(files.iter().map(|(path, hash)| CatalogEntry::blob(*path, *hash)));
        self
    }

    #[must_use]
    pub fn with_archive(mut self, enabled: bool) -> Self {
        self.with_archive = enabled;
        self
    }
}

impl RemoteCatalog for StaticCatalog {
    async fn get_tree(&self, git_ref: &str) -> Result<Vec<CatalogEntry>> {
        self.trees.get(git_ref).cloned().ok_or_else(|| UpdateError::Catalog {
            git_ref: git_ref.to_string(),
            reason: "no such ref".to_string(),
        })
    }

    fn raw_url(&self, git_ref: &str, path: &str) -> String {
        format!("mock://files/{git_ref}/{path}")
    }

    fn archive_url(&self, git_ref: &str) -> Option<String> {
        self.with_archive.then(|| format!("mock://archive/{git_ref}"))
    }
}

/// Serves `body` as `application/json` to every request on a loopback port.
///
/// Returns the base URL (`http://127.0.0.1:<port>`). The server lives until
/// the test runtime shuts down.
pub async fn serve_json(body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}
