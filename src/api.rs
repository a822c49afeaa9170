use std::path::Path;

use reqwest::{multipart, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only MIME type the backend accepts for conversion.
pub const PDF_MIME: &str = "application/pdf";

/// Message surfaced when a conversion fails without a usable `detail`.
pub const GENERIC_CONVERT_FAILURE: &str = "Conversion failed";

/// A selectable synthetic voice as listed by `GET /voices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub category: String,
}

/// Successful body of `POST /convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    #[serde(default)]
    pub playback_url: Option<String>,
    pub download_url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl ConversionResult {
    /// Source for the audio player. Falls back to the download URL.
    pub fn playback_source(&self) -> &str {
        self.playback_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.download_url)
    }

    /// File name to use when saving the audiobook locally.
    /// Only a bare final component is accepted, so the name can't leave the save directory.
    pub fn suggested_file_name(&self) -> String {
        self.filename
            .as_deref()
            .and_then(bare_file_name)
            .or_else(|| {
                self.download_url
                    .split(['?', '#'])
                    .next()
                    .and_then(bare_file_name)
            })
            .unwrap_or_else(|| "audiobook.mp3".to_string())
    }
}

fn bare_file_name(candidate: &str) -> Option<String> {
    Path::new(candidate)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Error body FastAPI-style backends attach to non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach backend: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend response was interrupted: {0}")]
    Body(#[source] reqwest::Error),
    #[error("backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("malformed response from {endpoint}: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Text shown to the user when a conversion fails with this error.
    pub fn conversion_message(&self) -> String {
        match self {
            ApiError::Status { detail, .. } => detail
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| GENERIC_CONVERT_FAILURE.to_string()),
            other => other.to_string(),
        }
    }
}

/// HTTP client for the conversion backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim();
        // A base without a trailing slash would lose its last path segment on join.
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        let base =
            Url::parse(&normalized).map_err(|_| ApiError::InvalidUrl(trimmed.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// Resolve a URL from a backend response against the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url, ApiError> {
        self.base
            .join(url)
            .map_err(|_| ApiError::InvalidUrl(url.to_string()))
    }

    /// `GET /voices`. Any non-2xx or shape mismatch is a total failure.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, ApiError> {
        let url = self.resolve("voices")?;
        log::info!("Fetching voices from {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await.map_err(ApiError::Body)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                detail: parse_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Malformed {
            endpoint: "/voices",
            source,
        })
    }

    /// `POST /convert` with the PDF bytes and the chosen voice id.
    pub async fn convert(
        &self,
        pdf: Vec<u8>,
        file_name: &str,
        voice_id: &str,
    ) -> Result<ConversionResult, ApiError> {
        let url = self.resolve("convert")?;

        let file_part = multipart::Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = multipart::Form::new()
            .part("file", file_part)
            .text("voice_id", voice_id.to_string());

        log::info!("Submitting {file_name} for conversion with voice {voice_id}");

        let resp = self.http.post(url).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.text().await.map_err(ApiError::Body)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                detail: parse_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Malformed {
            endpoint: "/convert",
            source,
        })
    }

    /// Stream a generated audiobook to `dest`.
    /// `on_progress(bytes_downloaded, total_bytes)`; total is 0 if unknown.
    pub async fn download<F>(&self, url: &str, dest: &Path, on_progress: F) -> Result<u64, ApiError>
    where
        F: Fn(u64, u64) + Send + 'static,
    {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let url = self.resolve(url)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status,
                detail: parse_detail(&body),
            });
        }

        if let Some(dir) = dest.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        // Stream into a sibling `.part` file; `dest` only appears once complete.
        let mut partial_name = dest.file_name().unwrap_or_default().to_os_string();
        partial_name.push(".part");
        let partial = dest.with_file_name(partial_name);

        let total = response.content_length().unwrap_or(0);
        let written = async {
            let mut downloaded: u64 = 0;
            let mut file = tokio::fs::File::create(&partial).await?;
            let mut stream = response.bytes_stream();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(ApiError::Body)?;
                file.write_all(&chunk).await?;
                downloaded += chunk.len() as u64;
                on_progress(downloaded, total);
            }

            file.flush().await?;
            Ok::<u64, ApiError>(downloaded)
        }
        .await;

        match written {
            Ok(downloaded) => {
                tokio::fs::rename(&partial, dest).await?;
                log::info!("Audiobook saved to {}", dest.display());
                Ok(downloaded)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&partial).await {
                    log::warn!("Could not remove {}: {rm}", partial.display());
                }
                Err(e)
            }
        }
    }
}

fn parse_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned response and hand back the raw request bytes.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        serve_raw_once(format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ))
        .await
    }

    /// Like `serve_once`, but writes `response` verbatim, headers included.
    async fn serve_raw_once(response: String) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(header_end) = find(&buf, b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());

            match content_length {
                Some(len) if buf.len() >= header_end + 4 + len => break,
                Some(_) => continue,
                None if headers.contains("transfer-encoding: chunked") => {
                    if buf.ends_with(b"0\r\n\r\n") {
                        break;
                    }
                }
                None => break,
            }
        }
        buf
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[tokio::test]
    async fn list_voices_preserves_order() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":"v1","category":"American Male"},{"id":"v2","category":"British Female"}]"#,
        )
        .await;
        let client = BackendClient::new(&base).unwrap();

        let voices = client.list_voices().await.unwrap();
        assert_eq!(
            voices,
            vec![
                Voice { id: "v1".into(), category: "American Male".into() },
                Voice { id: "v2".into(), category: "British Female".into() },
            ]
        );

        let request = String::from_utf8(server.await.unwrap()).unwrap();
        assert!(request.starts_with("GET /voices HTTP/1.1"));
    }

    #[tokio::test]
    async fn list_voices_rejects_wrong_shape() {
        let (base, _server) = serve_once("200 OK", r#"{"voices":[]}"#).await;
        let client = BackendClient::new(&base).unwrap();

        let err = client.list_voices().await.unwrap_err();
        assert!(matches!(err, ApiError::Malformed { endpoint: "/voices", .. }));
    }

    #[tokio::test]
    async fn list_voices_fails_on_server_error() {
        let (base, _server) = serve_once("500 Internal Server Error", "oops").await;
        let client = BackendClient::new(&base).unwrap();

        let err = client.list_voices().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn convert_sends_file_and_voice_id() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"status":"success","playback_url":"a.mp3","download_url":"a.mp3"}"#,
        )
        .await;
        let client = BackendClient::new(&base).unwrap();

        let result = client
            .convert(b"%PDF-1.4 fake".to_vec(), "book.pdf", "v2")
            .await
            .unwrap();
        assert_eq!(result.playback_source(), "a.mp3");
        assert_eq!(result.download_url, "a.mp3");

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.starts_with("POST /convert HTTP/1.1"));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains("name=\"voice_id\"\r\n\r\nv2"));
        assert!(request.contains("name=\"file\"; filename=\"book.pdf\""));
        assert!(request.contains("Content-Type: application/pdf"));
        assert!(request.contains("%PDF-1.4 fake"));
    }

    #[tokio::test]
    async fn convert_surfaces_backend_detail() {
        let (base, _server) = serve_once(
            "422 Unprocessable Entity",
            r#"{"detail":"Unsupported voice"}"#,
        )
        .await;
        let client = BackendClient::new(&base).unwrap();

        let err = client
            .convert(b"%PDF".to_vec(), "book.pdf", "v2")
            .await
            .unwrap_err();
        assert_eq!(err.conversion_message(), "Unsupported voice");
    }

    #[tokio::test]
    async fn convert_falls_back_to_generic_message() {
        let (base, _server) = serve_once("500 Internal Server Error", "<html>boom</html>").await;
        let client = BackendClient::new(&base).unwrap();

        let err = client
            .convert(b"%PDF".to_vec(), "book.pdf", "v1")
            .await
            .unwrap_err();
        assert_eq!(err.conversion_message(), GENERIC_CONVERT_FAILURE);
    }

    #[tokio::test]
    async fn convert_requires_download_url() {
        let (base, _server) = serve_once("200 OK", r#"{"playback_url":"a.mp3"}"#).await;
        let client = BackendClient::new(&base).unwrap();

        let err = client
            .convert(b"%PDF".to_vec(), "book.pdf", "v1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Malformed { endpoint: "/convert", .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BackendClient::new(&format!("http://{addr}")).unwrap();
        let err = client.list_voices().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn download_writes_body_to_disk() {
        let (base, _server) = serve_once("200 OK", "ID3-fake-mp3-bytes").await;
        let client = BackendClient::new(&base).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("book.mp3");

        let written = client
            .download("/download/book.mp3", &dest, |_, _| {})
            .await
            .unwrap();

        assert_eq!(written, 18);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3-fake-mp3-bytes");
        assert!(!dest.with_file_name("book.mp3.part").exists());
    }

    #[tokio::test]
    async fn truncated_download_leaves_no_file() {
        let (base, _server) = serve_raw_once(
            "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: 1000\r\nConnection: close\r\n\r\nID3-short!"
                .to_string(),
        )
        .await;
        let client = BackendClient::new(&base).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("book.mp3");

        let err = client
            .download("/download/book.mp3", &dest, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Body(_)), "got {err:?}");
        assert!(!dest.exists());
        assert!(!dir.path().join("book.mp3.part").exists());
    }

    #[tokio::test]
    async fn download_keeps_existing_file_on_failure() {
        let (base, _server) = serve_once("404 Not Found", r#"{"detail":"File not found"}"#).await;
        let client = BackendClient::new(&base).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("book.mp3");
        std::fs::write(&dest, b"older copy").unwrap();

        let err = client
            .download("/download/book.mp3", &dest, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Status { .. }));
        assert_eq!(std::fs::read(&dest).unwrap(), b"older copy");
    }

    #[test]
    fn suggested_file_name_stays_inside_save_dir() {
        let hostile = |filename: &str| ConversionResult {
            playback_url: None,
            download_url: "/download/audiobook_3.mp3".into(),
            filename: Some(filename.into()),
        };

        assert_eq!(hostile("../x").suggested_file_name(), "x");
        assert_eq!(hostile("/abs/x").suggested_file_name(), "x");
        assert_eq!(hostile("../../.bashrc").suggested_file_name(), ".bashrc");
        // Nothing usable in `filename`; fall back to the URL's last segment.
        assert_eq!(hostile("../..").suggested_file_name(), "audiobook_3.mp3");
        assert_eq!(hostile("/").suggested_file_name(), "audiobook_3.mp3");

        let dir = std::path::Path::new("/home/u/Audio");
        let dest = dir.join(hostile("/etc/cron.d/evil").suggested_file_name());
        assert_eq!(dest.parent(), Some(dir));

        let nothing = ConversionResult {
            playback_url: None,
            download_url: "/download/..".into(),
            filename: None,
        };
        assert_eq!(nothing.suggested_file_name(), "audiobook.mp3");
    }

    #[test]
    fn resolves_relative_and_absolute_paths() {
        let client = BackendClient::new("http://localhost:8000/api").unwrap();
        assert_eq!(
            client.resolve("voices").unwrap().as_str(),
            "http://localhost:8000/api/voices"
        );
        assert_eq!(
            client.resolve("/audio/x.mp3").unwrap().as_str(),
            "http://localhost:8000/audio/x.mp3"
        );
        assert_eq!(
            client.resolve("https://cdn.example.com/x.mp3").unwrap().as_str(),
            "https://cdn.example.com/x.mp3"
        );
    }

    #[test]
    fn rejects_garbage_base_url() {
        assert!(matches!(
            BackendClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn suggested_file_name_prefers_backend_filename() {
        let with_name = ConversionResult {
            playback_url: None,
            download_url: "/download/audiobook_1.mp3".into(),
            filename: Some("audiobook_1.mp3".into()),
        };
        assert_eq!(with_name.suggested_file_name(), "audiobook_1.mp3");

        let from_url = ConversionResult {
            playback_url: None,
            download_url: "/download/audiobook_2.mp3?x=1".into(),
            filename: None,
        };
        assert_eq!(from_url.suggested_file_name(), "audiobook_2.mp3");
        assert_eq!(from_url.playback_source(), "/download/audiobook_2.mp3?x=1");
    }
}
