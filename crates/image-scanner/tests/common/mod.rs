//! 통합 테스트 공용 헬퍼
//!
//! - `MockRegistry` / `MockClair`: 호출을 기록하는 trait 기반 mock
//! - `StubServer`: 루프백 TCP 위에서 고정 응답을 돌려주는 최소 HTTP/1.1 서버

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use yair_core::types::{Severity, Vulnerability};
use yair_image_scanner::manifest::{FsLayer, LayerDescriptor};
use yair_image_scanner::{
    ClairClient, CleanupOutcome, FetchedManifest, ImageReference, ImageScanError, Manifest,
    RegistryClient, ScanRequest,
};

pub const MANIFEST_URL: &str = "http://registry.test:80/v2/library/app/manifests/1.0";

// --- manifests & findings ---

pub fn v1_manifest(blob_sums: &[&str]) -> Manifest {
    Manifest {
        schema_version: 1,
        fs_layers: blob_sums
            .iter()
            .map(|s| FsLayer {
                blob_sum: (*s).to_owned(),
            })
            .collect(),
        ..Default::default()
    }
}

pub fn v2_manifest(digests: &[&str]) -> Manifest {
    Manifest {
        schema_version: 2,
        media_type: Some(yair_image_scanner::manifest::MEDIA_TYPE_DOCKER_V2.to_owned()),
        layers: digests
            .iter()
            .map(|d| LayerDescriptor {
                digest: (*d).to_owned(),
                media_type: None,
                size: 1,
            })
            .collect(),
        ..Default::default()
    }
}

pub fn finding(id: &str, severity: Severity, score: f64) -> Vulnerability {
    Vulnerability {
        id: id.to_owned(),
        namespace: "debian:12".to_owned(),
        package: "openssl".to_owned(),
        version: "3.0.0".to_owned(),
        fixed_by: Some("3.0.1".to_owned()),
        severity,
        score,
        link: None,
    }
}

// --- registry mock ---

/// 매니페스트 조회 동작
#[derive(Clone)]
pub enum RegistryBehaviour {
    Serve(Manifest),
    NotFound,
    Status(u16),
}

pub struct MockRegistry {
    behaviour: RegistryBehaviour,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockRegistry {
    pub fn new(behaviour: RegistryBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn serving(manifest: Manifest) -> Self {
        Self::new(RegistryBehaviour::Serve(manifest))
    }
}

impl RegistryClient for MockRegistry {
    async fn fetch_manifest(
        &self,
        reference: &ImageReference,
    ) -> Result<FetchedManifest, ImageScanError> {
        self.calls.lock().await.push(reference.to_string());
        match &self.behaviour {
            RegistryBehaviour::Serve(manifest) => Ok(FetchedManifest {
                url: MANIFEST_URL.to_owned(),
                manifest: manifest.clone(),
            }),
            RegistryBehaviour::NotFound => Err(ImageScanError::RegistryNotFound {
                url: MANIFEST_URL.to_owned(),
            }),
            RegistryBehaviour::Status(status) => Err(ImageScanError::RegistryTransport {
                url: MANIFEST_URL.to_owned(),
                status: Some(*status),
                reason: format!("unexpected status {status}"),
            }),
        }
    }
}

// --- clair mock ---

/// 모든 Clair 호출을 순서대로 기록
#[derive(Debug, Clone, PartialEq)]
pub enum ClairCall {
    Submit(ScanRequest),
    Delete(String),
    Report(String),
}

pub struct MockClair {
    /// 이 위치(0부터)의 제출을 실패시킴
    pub fail_submit_at: Option<usize>,
    /// DELETE 결과
    pub cleanup: CleanupOutcome,
    /// 보고서 조회 실패 여부
    pub fail_report: bool,
    /// 보고서로 돌려줄 취약점
    pub findings: Vec<Vulnerability>,
    pub calls: Arc<Mutex<Vec<ClairCall>>>,
}

impl MockClair {
    pub fn new() -> Self {
        Self {
            fail_submit_at: None,
            cleanup: CleanupOutcome::NothingToClean,
            fail_report: false,
            findings: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn submissions(&self) -> Vec<ScanRequest> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                ClairCall::Submit(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn calls(&self) -> Vec<ClairCall> {
        self.calls.lock().await.clone()
    }
}

impl ClairClient for MockClair {
    async fn submit_layer(&self, request: &ScanRequest) -> Result<(), ImageScanError> {
        let mut calls = self.calls.lock().await;
        let index = calls
            .iter()
            .filter(|c| matches!(c, ClairCall::Submit(_)))
            .count();
        calls.push(ClairCall::Submit(request.clone()));
        if self.fail_submit_at == Some(index) {
            return Err(ImageScanError::ClairTransport {
                url: "http://clair.test:6060/v1/layers".to_owned(),
                status: Some(500),
                reason: "unexpected status 500".to_owned(),
            });
        }
        Ok(())
    }

    async fn delete_layer(&self, layer: &str) -> CleanupOutcome {
        self.calls
            .lock()
            .await
            .push(ClairCall::Delete(layer.to_owned()));
        self.cleanup.clone()
    }

    async fn layer_vulnerabilities(
        &self,
        layer: &str,
    ) -> Result<Vec<Vulnerability>, ImageScanError> {
        self.calls
            .lock()
            .await
            .push(ClairCall::Report(layer.to_owned()));
        if self.fail_report {
            return Err(ImageScanError::ClairTransport {
                url: format!("http://clair.test:6060/v1/layers/{layer}"),
                status: Some(404),
                reason: "unexpected status 404 Not Found".to_owned(),
            });
        }
        Ok(self.findings.clone())
    }
}

// --- loopback HTTP stub ---

/// 기록된 요청
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// `METHOD path` 에 대한 고정 응답
#[derive(Debug, Clone)]
pub struct StubRoute {
    pub method: &'static str,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl StubRoute {
    pub fn new(method: &'static str, path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            status,
            body: body.into(),
        }
    }
}

/// 최소 HTTP/1.1 스텁 서버. 요청마다 연결을 닫습니다.
pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl StubServer {
    pub async fn start(routes: Vec<StubRoute>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = handle(stream, &routes, &recorded).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port())
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    stream: TcpStream,
    routes: &[StubRoute],
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    recorded.lock().await.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, body) = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .map(|r| (r.status, r.body.clone()))
        .unwrap_or((404, String::new()));

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        reason_phrase(status),
        body.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
