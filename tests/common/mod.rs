#![allow(dead_code)]

use repodiagram::harvest::{GitHubHarvester, HarvestOptions};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OWNER: &str = "acme";
pub const REPO: &str = "widgets";

pub mod test_helpers {
    use super::*;

    pub fn setup_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// Git Trees API body for `(path, type)` pairs
    pub fn tree_json(entries: &[(&str, &str)]) -> Value {
        let tree: Vec<Value> = entries
            .iter()
            .map(|(path, kind)| json!({ "path": path, "type": kind, "mode": "100644", "sha": "0000" }))
            .collect();
        json!({ "sha": "root", "tree": tree, "truncated": false })
    }

    /// Blob entries for every path
    pub fn blobs(paths: &[&str]) -> Value {
        let entries: Vec<(&str, &str)> = paths.iter().map(|p| (*p, "blob")).collect();
        tree_json(&entries)
    }

    pub fn tree_path(branch: &str) -> String {
        format!("/repos/{}/{}/git/trees/{}", OWNER, REPO, branch)
    }

    pub fn raw_path(branch: &str, file: &str) -> String {
        format!("/{}/{}/{}/{}", OWNER, REPO, branch, file)
    }

    pub fn repo_url() -> String {
        format!("https://github.com/{}/{}", OWNER, REPO)
    }

    pub async fn mount_tree(server: &MockServer, branch: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(tree_path(branch)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    pub async fn mount_raw(server: &MockServer, branch: &str, file: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(raw_path(branch, file)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    /// Harvester pointing both hosts at `server`
    pub fn harvester_for(server: &MockServer) -> GitHubHarvester {
        GitHubHarvester::with_base_urls(server.uri(), server.uri()).unwrap()
    }

    /// Options with a short file timeout so slow-response tests stay quick
    pub fn fast_options() -> HarvestOptions {
        HarvestOptions {
            file_timeout: Duration::from_millis(500),
            ..HarvestOptions::default()
        }
    }

    /// Serves `body` with chunked transfer encoding, so responses carry no
    /// `Content-Length`. Returns the base URL.
    pub async fn spawn_chunked_server(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }
}
