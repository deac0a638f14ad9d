//! Image-generation service: the trait the pipeline calls and its HTTP client.
//!
//! The contract is deliberately small. A request carries a prompt and an
//! optional size hint; a response carries one image reference, either a
//! `data:` URI or a remote URL. Anything else is an [`ImageFetchError`],
//! which the imaging stage turns into "no image" for that scene.
//!
//! ```text
//! POST {endpoint}
//! Request:  {"prompt": "INT. KITCHEN - DAY", "size": "1024x1024"}
//! Response: {"image_url": "data:image/png;base64,..."}   ("" = no image)
//! ```

use crate::error::{ImageFetchError, StoryScriptError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One image request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    image_url: String,
}

/// Anything that can turn a prompt into an image reference.
///
/// Implementations must be `Send + Sync`: the imaging stage issues requests
/// for several scenes concurrently against one shared generator. `scene` is
/// the scene position, used only to label errors.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, scene: usize, request: &ImageRequest) -> Result<String, ImageFetchError>;
}

/// [`ImageGenerator`] backed by an HTTP endpoint.
pub struct HttpImageGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpImageGenerator {
    /// Build a client for `endpoint`. `timeout_secs` bounds each request at
    /// the transport level.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoryScriptError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoryScriptError::ImageServiceInit {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, scene: usize, request: &ImageRequest) -> Result<String, ImageFetchError> {
        debug!(
            "Scene {}: requesting image from {} ({} char prompt)",
            scene,
            self.endpoint,
            request.prompt.len()
        );

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ImageFetchError::Timeout {
                    scene,
                    secs: self.timeout_secs,
                }
            } else {
                ImageFetchError::Transport {
                    scene,
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::HttpStatus {
                scene,
                status: status.as_u16(),
            });
        }

        let body: ImageResponse =
            response
                .json()
                .await
                .map_err(|e| ImageFetchError::InvalidPayload {
                    scene,
                    detail: format!("unreadable response body: {e}"),
                })?;

        Ok(body.image_url)
    }
}

/// Check an image reference returned by a generator.
///
/// Accepts remote `http(s)` URLs as-is and `data:` URIs whose base64 payload
/// decodes to a recognisable image. Returns the trimmed reference.
pub fn validate_image_reference(scene: usize, reference: &str) -> Result<String, ImageFetchError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ImageFetchError::EmptyPayload { scene });
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.to_string());
    }

    let Some(rest) = reference.strip_prefix("data:") else {
        return Err(ImageFetchError::InvalidPayload {
            scene,
            detail: "not a data URI or http(s) URL".to_string(),
        });
    };

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageFetchError::InvalidPayload {
            scene,
            detail: "data URI has no payload separator".to_string(),
        })?;

    if !header.ends_with(";base64") {
        return Err(ImageFetchError::InvalidPayload {
            scene,
            detail: format!("data URI is not base64-encoded ({header})"),
        });
    }
    if payload.is_empty() {
        return Err(ImageFetchError::EmptyPayload { scene });
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ImageFetchError::InvalidPayload {
            scene,
            detail: format!("bad base64: {e}"),
        })?;

    image::guess_format(&bytes).map_err(|e| ImageFetchError::InvalidPayload {
        scene,
        detail: format!("payload is not an image: {e}"),
    })?;

    Ok(reference.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_data_uri() -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        format!("data:image/png;base64,{}", STANDARD.encode(&buf))
    }

    #[test]
    fn request_omits_missing_size() {
        let req = ImageRequest {
            prompt: "EXT. PIER - NIGHT".into(),
            size: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"prompt":"EXT. PIER - NIGHT"}"#);
    }

    #[test]
    fn response_without_field_is_empty() {
        let resp: ImageResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.image_url, "");
    }

    #[test]
    fn remote_url_accepted() {
        let url = validate_image_reference(0, " https://img.example.org/a.png ").unwrap();
        assert_eq!(url, "https://img.example.org/a.png");
    }

    #[test]
    fn empty_reference_is_empty_payload() {
        assert_eq!(
            validate_image_reference(3, "  "),
            Err(ImageFetchError::EmptyPayload { scene: 3 })
        );
        assert_eq!(
            validate_image_reference(3, "data:image/png;base64,"),
            Err(ImageFetchError::EmptyPayload { scene: 3 })
        );
    }

    #[test]
    fn png_data_uri_accepted() {
        let uri = png_data_uri();
        assert_eq!(validate_image_reference(0, &uri).unwrap(), uri);
    }

    #[test]
    fn garbage_data_uri_rejected() {
        let not_image = format!("data:image/png;base64,{}", STANDARD.encode(b"hello world"));
        assert!(matches!(
            validate_image_reference(1, &not_image),
            Err(ImageFetchError::InvalidPayload { scene: 1, .. })
        ));
        assert!(matches!(
            validate_image_reference(1, "data:image/png;base64,@@@"),
            Err(ImageFetchError::InvalidPayload { .. })
        ));
        assert!(matches!(
            validate_image_reference(1, "data:text/plain,hello"),
            Err(ImageFetchError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn relative_path_rejected() {
        assert!(matches!(
            validate_image_reference(2, "images/scene.png"),
            Err(ImageFetchError::InvalidPayload { scene: 2, .. })
        ));
    }

    #[test]
    fn client_builds_without_network() {
        let gen = HttpImageGenerator::new("http://127.0.0.1:9/images", None, 5).unwrap();
        assert_eq!(gen.endpoint(), "http://127.0.0.1:9/images");
    }

    // ── Wire tests against a one-shot local server ──────────────────────────

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned response; the handle yields the raw request.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/images", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (endpoint, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= length
    }

    fn scene_request() -> ImageRequest {
        ImageRequest {
            prompt: "INT. BAR - NIGHT".into(),
            size: Some("512x512".into()),
        }
    }

    #[tokio::test]
    async fn success_returns_reference_and_sends_prompt() {
        let (endpoint, server) = serve_once("200 OK", r#"{"image_url":"https://img.example.org/1.png"}"#).await;
        let gen = HttpImageGenerator::new(endpoint, None, 5).unwrap();

        let url = gen.generate(0, &scene_request()).await.unwrap();
        assert_eq!(url, "https://img.example.org/1.png");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /images"));
        assert!(request.contains(r#""prompt":"INT. BAR - NIGHT""#));
        assert!(request.contains(r#""size":"512x512""#));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn api_key_sent_as_bearer() {
        let (endpoint, server) = serve_once("200 OK", r#"{"image_url":"https://img.example.org/2.png"}"#).await;
        let gen = HttpImageGenerator::new(endpoint, Some("sk-test".into()), 5).unwrap();

        gen.generate(1, &scene_request()).await.unwrap();
        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn error_status_is_http_status() {
        let (endpoint, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let gen = HttpImageGenerator::new(endpoint, None, 5).unwrap();

        let err = gen.generate(2, &scene_request()).await.unwrap_err();
        assert_eq!(err, ImageFetchError::HttpStatus { scene: 2, status: 500 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn empty_reference_means_no_image() {
        let (endpoint, server) = serve_once("200 OK", r#"{"image_url":""}"#).await;
        let gen = HttpImageGenerator::new(endpoint, None, 5).unwrap();

        let reference = gen.generate(3, &scene_request()).await.unwrap();
        assert_eq!(reference, "");
        assert_eq!(
            validate_image_reference(3, &reference),
            Err(ImageFetchError::EmptyPayload { scene: 3 })
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_payload() {
        let (endpoint, server) = serve_once("200 OK", "not json").await;
        let gen = HttpImageGenerator::new(endpoint, None, 5).unwrap();

        let err = gen.generate(4, &scene_request()).await.unwrap_err();
        assert!(matches!(err, ImageFetchError::InvalidPayload { scene: 4, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/images", listener.local_addr().unwrap());
        drop(listener);
        let gen = HttpImageGenerator::new(endpoint, None, 5).unwrap();

        let err = gen.generate(5, &scene_request()).await.unwrap_err();
        assert!(matches!(err, ImageFetchError::Transport { scene: 5, .. }));
    }
}
