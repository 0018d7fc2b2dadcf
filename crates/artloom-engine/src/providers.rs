use std::collections::BTreeMap;
use std::fmt;
use std::thread;
use std::time::Duration;

use artloom_contracts::styles::ImageStyle;
use rand::Rng;
use reqwest::blocking::multipart::Form as MultipartForm;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;

use crate::config::DemoDelay;

pub const CLIPDROP_PROVIDER: &str = "clipdrop";
pub const DEMO_PROVIDER: &str = "demo";

const DEMO_IMAGE_SIZE: &str = "800x800";
const DEMO_KEYWORD_LIMIT: usize = 3;
const DEMO_DEFAULT_KEYWORD: &str = "art";

#[derive(Debug, Clone)]
pub struct ProviderGenerateRequest {
    /// User text exactly as typed.
    pub prompt: String,
    /// `prompt` plus the style suffix; what remote providers receive.
    pub enhanced_prompt: String,
    pub style: ImageStyle,
}

impl ProviderGenerateRequest {
    pub fn new(prompt: &str, style: &ImageStyle) -> Self {
        Self {
            prompt: prompt.to_string(),
            enhanced_prompt: style.enhance(prompt),
            style: style.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderImage {
    Bytes {
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
    Remote {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    HttpStatus { status: u16, body: String },
    Transport { message: String },
    InvalidResponse { message: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus { status, body } if body.is_empty() => {
                write!(f, "request failed ({status})")
            }
            Self::HttpStatus { status, body } => write!(f, "request failed ({status}): {body}"),
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::InvalidResponse { message } => write!(f, "invalid response: {message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderImage, ProviderError>;
}

#[derive(Default)]
pub struct ImageProviderRegistry {
    providers: BTreeMap<String, Box<dyn ImageProvider>>,
}

impl ImageProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: ImageProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ImageProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

/// Clipdrop text-to-image: multipart `prompt`, `x-api-key` header, raw
/// image bytes back.
pub struct ClipdropProvider {
    endpoint: String,
    api_key: String,
    http: HttpClient,
}

impl ClipdropProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            http: HttpClient::new(),
        }
    }
}

impl ImageProvider for ClipdropProvider {
    fn name(&self) -> &str {
        CLIPDROP_PROVIDER
    }

    fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderImage, ProviderError> {
        let form = MultipartForm::new().text("prompt", request.enhanced_prompt.clone());
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .map_err(|err| ProviderError::Transport {
                message: format!("{} ({err})", self.endpoint),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body: truncate_text(body.trim(), 512),
            });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase());
        let bytes = response
            .bytes()
            .map_err(|err| ProviderError::Transport {
                message: format!("failed reading image bytes ({err})"),
            })?
            .to_vec();
        if bytes.is_empty() {
            return Err(ProviderError::InvalidResponse {
                message: "empty image body".to_string(),
            });
        }
        Ok(ProviderImage::Bytes { bytes, mime_type })
    }
}

/// Placeholder images from a public image service, after a simulated wait.
pub struct DemoProvider {
    base: String,
    delay: DemoDelay,
}

impl DemoProvider {
    pub fn new(base: impl Into<String>, delay: DemoDelay) -> Self {
        Self {
            base: base.into(),
            delay,
        }
    }

}

impl ImageProvider for DemoProvider {
    fn name(&self) -> &str {
        DEMO_PROVIDER
    }

    /// Sleeps for the configured delay, then points at the demo service.
    fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderImage, ProviderError> {
        let wait = pick_delay(self.delay);
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        Ok(ProviderImage::Remote {
            url: demo_image_url(&self.base, &request.prompt, &request.style.id),
        })
    }
}

/// Lowercase, drop everything but ASCII letters, digits and whitespace,
/// keep the first three words.
pub fn prompt_keywords(prompt: &str) -> Vec<String> {
    let cleaned = prompt
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace())
        .collect::<String>();
    cleaned
        .split_whitespace()
        .take(DEMO_KEYWORD_LIMIT)
        .map(str::to_string)
        .collect()
}

pub fn demo_image_url(base: &str, prompt: &str, style_id: &str) -> String {
    let keywords = prompt_keywords(prompt);
    let keywords = if keywords.is_empty() {
        DEMO_DEFAULT_KEYWORD.to_string()
    } else {
        keywords.join(",")
    };
    format!(
        "{}/{DEMO_IMAGE_SIZE}/?{keywords},{style_id}",
        base.trim_end_matches('/')
    )
}

fn pick_delay(delay: DemoDelay) -> Duration {
    let (min, max) = (delay.min.as_millis() as u64, delay.max.as_millis() as u64);
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::thread;
    use std::time::Duration;

    use artloom_contracts::styles::StyleCatalog;

    use super::*;

    fn request(prompt: &str, style_id: &str) -> ProviderGenerateRequest {
        let catalog = StyleCatalog::default();
        ProviderGenerateRequest::new(prompt, &catalog.select(style_id).style)
    }

    #[test]
    fn keywords_are_cleaned_and_capped() {
        assert_eq!(
            prompt_keywords("A Majestic, DRAGON soaring! through clouds"),
            vec!["a", "majestic", "dragon"]
        );
        assert_eq!(prompt_keywords("   sunset   "), vec!["sunset"]);
        assert!(prompt_keywords("!!! ???").is_empty());
        assert_eq!(prompt_keywords("café 42"), vec!["caf", "42"]);
    }

    #[test]
    fn demo_url_is_deterministic() {
        let url = demo_image_url("https://source.unsplash.com/", "Sunset over the bay", "anime");
        assert_eq!(url, "https://source.unsplash.com/800x800/?sunset,over,the,anime");
        assert_eq!(
            url,
            demo_image_url("https://source.unsplash.com", "Sunset over the bay", "anime")
        );
        assert_eq!(
            demo_image_url("https://demo", "???", "oil"),
            "https://demo/800x800/?art,oil"
        );
    }

    #[test]
    fn request_carries_original_and_enhanced_prompt() {
        let req = request("a cat", "oil");
        assert_eq!(req.prompt, "a cat");
        assert_eq!(
            req.enhanced_prompt,
            "a cat, oil painting, classical art, renaissance style"
        );
    }

    #[test]
    fn pick_delay_stays_in_range() {
        let delay = DemoDelay {
            min: Duration::from_millis(5),
            max: Duration::from_millis(9),
        };
        for _ in 0..50 {
            let picked = pick_delay(delay);
            assert!(picked >= delay.min && picked <= delay.max);
        }
        assert_eq!(pick_delay(DemoDelay::none()), Duration::ZERO);
    }

    #[test]
    fn demo_provider_returns_remote_url() {
        let provider = DemoProvider::new("https://demo", DemoDelay::none());
        let image = provider.generate(&request("sunset", "anime"));
        assert_eq!(
            image,
            Ok(ProviderImage::Remote {
                url: "https://demo/800x800/?sunset,anime".to_string()
            })
        );
    }

    #[test]
    fn registry_lists_sorted_names() {
        let mut registry = ImageProviderRegistry::new();
        registry.register(DemoProvider::new("https://demo", DemoDelay::none()));
        registry.register(ClipdropProvider::new("http://127.0.0.1:9", "key"));
        assert_eq!(registry.names(), vec!["clipdrop", "demo"]);
        assert!(registry.get("clipdrop").is_some());
        assert!(registry.get("openai").is_none());
    }

    #[test]
    fn clipdrop_sends_key_and_multipart_prompt() -> anyhow::Result<()> {
        let server = tiny_http::Server::http("127.0.0.1:0")
            .map_err(|err| anyhow::anyhow!("bind failed: {err}"))?;
        let addr = server.server_addr().to_string();
        let handle = thread::spawn(move || -> (Option<String>, String) {
            let Ok(mut incoming) = server.recv() else {
                return (None, String::new());
            };
            let key = incoming
                .headers()
                .iter()
                .find(|header| header.field.equiv("x-api-key"))
                .map(|header| header.value.as_str().to_string());
            let mut body = String::new();
            let _ = incoming.as_reader().read_to_string(&mut body);
            let content_type =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"image/png"[..])
                    .expect("static header");
            let _ = incoming.respond(
                tiny_http::Response::from_data(b"\x89PNG fake".to_vec()).with_header(content_type),
            );
            (key, body)
        });

        let provider = ClipdropProvider::new(format!("http://{addr}/text-to-image/v1"), "secret");
        let image = provider.generate(&request("a cat", "anime"));
        let (key, body) = handle
            .join()
            .map_err(|_| anyhow::anyhow!("server thread panicked"))?;

        assert_eq!(key.as_deref(), Some("secret"));
        assert!(body.contains("name=\"prompt\""));
        assert!(body.contains("a cat, anime style, manga, japanese animation"));
        assert_eq!(
            image,
            Ok(ProviderImage::Bytes {
                bytes: b"\x89PNG fake".to_vec(),
                mime_type: Some("image/png".to_string()),
            })
        );
        Ok(())
    }

    #[test]
    fn clipdrop_maps_error_status() -> anyhow::Result<()> {
        let server = tiny_http::Server::http("127.0.0.1:0")
            .map_err(|err| anyhow::anyhow!("bind failed: {err}"))?;
        let addr = server.server_addr().to_string();
        let handle = thread::spawn(move || {
            if let Ok(mut incoming) = server.recv() {
                let mut body = Vec::new();
                let _ = incoming.as_reader().read_to_end(&mut body);
                let response = tiny_http::Response::from_string("quota exceeded")
                    .with_status_code(tiny_http::StatusCode(402));
                let _ = incoming.respond(response);
            }
        });

        let provider = ClipdropProvider::new(format!("http://{addr}/"), "secret");
        let result = provider.generate(&request("a cat", "anime"));
        let _ = handle.join();
        assert_eq!(
            result,
            Err(ProviderError::HttpStatus {
                status: 402,
                body: "quota exceeded".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn clipdrop_maps_connection_failure_to_transport() -> anyhow::Result<()> {
        let server = tiny_http::Server::http("127.0.0.1:0")
            .map_err(|err| anyhow::anyhow!("bind failed: {err}"))?;
        let addr = server.server_addr().to_string();
        drop(server);

        let provider = ClipdropProvider::new(format!("http://{addr}/"), "secret");
        let result = provider.generate(&request("a cat", "anime"));
        assert!(matches!(result, Err(ProviderError::Transport { .. })));
        Ok(())
    }
}
