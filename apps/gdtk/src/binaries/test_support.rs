//! Shared fixtures for tests that talk to a distribution server.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use flate2::Compression;
use flate2::write::GzEncoder;

#[derive(Clone)]
enum Payload {
    Sized(Vec<u8>),
    Chunked(Vec<u8>),
}

#[derive(Default)]
struct Shared {
    routes: Mutex<HashMap<String, Payload>>,
    requests: Mutex<Vec<String>>,
    hits: AtomicUsize,
}

/// An in-process HTTP server with mutable routes and a request counter.
pub(crate) struct StubServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl StubServer {
    pub(crate) async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .fallback(serve)
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, shared }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// Serves `body` at `path` with a `Content-Length` header.
    pub(crate) fn add_file(&self, path: &str, body: Vec<u8>) {
        self.insert(path, Payload::Sized(body));
    }

    /// Serves `body` at `path` as a chunked stream with no declared length.
    pub(crate) fn add_chunked_file(&self, path: &str, body: Vec<u8>) {
        self.insert(path, Payload::Chunked(body));
    }

    pub(crate) fn add_page(&self, path: &str, html: &str) {
        self.add_file(path, html.as_bytes().to_vec());
    }

    pub(crate) fn remove(&self, path: &str) {
        self.shared.routes.lock().unwrap().remove(path);
    }

    pub(crate) fn request_count(&self) -> usize {
        self.shared.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn requested_paths(&self) -> Vec<String> {
        self.shared.requests.lock().unwrap().clone()
    }

    fn insert(&self, path: &str, payload: Payload) {
        self.shared
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), payload);
    }
}

async fn serve(State(shared): State<Arc<Shared>>, uri: Uri) -> Response {
    shared.hits.fetch_add(1, Ordering::SeqCst);
    shared
        .requests
        .lock()
        .unwrap()
        .push(uri.path().to_string());

    let payload = shared.routes.lock().unwrap().get(uri.path()).cloned();
    match payload {
        Some(Payload::Sized(body)) => body.into_response(),
        Some(Payload::Chunked(body)) => {
            let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
                body.chunks(1024).map(|c| Ok(c.to_vec())).collect();
            Body::from_stream(futures_util::stream::iter(chunks)).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Builds a ZIP archive. Names ending in `/` become directory entries.
pub(crate) fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Builds a gzip-compressed tarball of regular files.
pub(crate) fn tar_gz_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
