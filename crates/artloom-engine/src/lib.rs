pub mod config;
pub mod download;
pub mod prompts;
pub mod providers;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use artloom_contracts::events::{map_object, EventLog};
use artloom_contracts::images::{new_image_id, now_millis, GeneratedImage};
use artloom_contracts::styles::{ImageStyle, StyleCatalog};
use serde_json::json;
use url::Url;

use crate::config::{CredentialStatus, EngineConfig};
use crate::providers::{
    demo_image_url, ClipdropProvider, DemoProvider, ImageProvider, ImageProviderRegistry,
    ProviderError, ProviderGenerateRequest, ProviderImage, CLIPDROP_PROVIDER, DEMO_PROVIDER,
};

/// Why a generation ended on the demo path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    MissingCredential,
    PlaceholderCredential,
    ProviderUnavailable { provider: String },
    Provider(ProviderError),
    Storage { message: String },
}

impl FallbackReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::PlaceholderCredential => "placeholder_credential",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::Provider(ProviderError::HttpStatus { .. }) => "http_status",
            Self::Provider(ProviderError::Transport { .. }) => "transport",
            Self::Provider(ProviderError::InvalidResponse { .. }) => "invalid_response",
            Self::Storage { .. } => "storage",
        }
    }

    /// Credential problems are expected demo mode, not failures.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::PlaceholderCredential)
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => f.write_str("Clipdrop API key not configured"),
            Self::PlaceholderCredential => f.write_str("Clipdrop API key is still the placeholder"),
            Self::ProviderUnavailable { provider } => {
                write!(f, "provider '{provider}' not registered")
            }
            Self::Provider(err) => write!(f, "Clipdrop {err}"),
            Self::Storage { message } => write!(f, "could not store image: {message}"),
        }
    }
}

/// Result of one generation. Both arms carry a usable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated {
        image: GeneratedImage,
    },
    Fallback {
        image: GeneratedImage,
        reason: FallbackReason,
    },
}

impl GenerationOutcome {
    pub fn image(&self) -> &GeneratedImage {
        match self {
            Self::Generated { image } | Self::Fallback { image, .. } => image,
        }
    }

    pub fn into_image(self) -> GeneratedImage {
        match self {
            Self::Generated { image } | Self::Fallback { image, .. } => image,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Generated { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason().is_some()
    }
}

pub struct GenerationPipeline {
    config: EngineConfig,
    catalog: StyleCatalog,
    providers: ImageProviderRegistry,
    events: EventLog,
}

impl GenerationPipeline {
    pub fn new(config: EngineConfig, events: EventLog) -> Self {
        let providers = default_provider_registry(&config);
        Self::with_providers(config, events, providers)
    }

    /// Uses `providers` as given, adding the demo provider when the
    /// registry has none.
    pub fn with_providers(
        config: EngineConfig,
        events: EventLog,
        mut providers: ImageProviderRegistry,
    ) -> Self {
        if providers.get(DEMO_PROVIDER).is_none() {
            providers.register(demo_provider(&config));
        }
        Self {
            config,
            catalog: StyleCatalog::default(),
            providers,
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn is_demo_mode(&self) -> bool {
        self.config.is_demo_mode()
    }

    /// Generates one image. Never fails: any credential, network or
    /// storage problem ends on the demo path with the reason attached.
    /// Prompt validation is the caller's job.
    pub fn generate(&self, prompt: &str, style_id: &str) -> GenerationOutcome {
        let selection = self.catalog.select(style_id);
        let style = selection.style;
        let request = ProviderGenerateRequest::new(prompt, &style);
        self.log(
            "generation_started",
            json!({
                "prompt": prompt,
                "style_id": style.id,
                "requested_style": selection.requested,
                "style_fallback": selection.fallback_reason,
                "demo_mode": self.is_demo_mode(),
            }),
        );

        let reason = match self.config.credential_status() {
            CredentialStatus::Missing => FallbackReason::MissingCredential,
            CredentialStatus::Placeholder => FallbackReason::PlaceholderCredential,
            CredentialStatus::Usable => match self.generate_remote(&request) {
                Ok(image) => {
                    self.log_created(&image, CLIPDROP_PROVIDER);
                    return GenerationOutcome::Generated { image };
                }
                Err(reason) => reason,
            },
        };

        self.log(
            "generation_fallback",
            json!({
                "reason": reason.code(),
                "detail": reason.to_string(),
                "expected": reason.is_expected(),
            }),
        );
        let image = self.generate_demo(&request);
        self.log_created(&image, DEMO_PROVIDER);
        GenerationOutcome::Fallback { image, reason }
    }

    fn generate_demo(&self, request: &ProviderGenerateRequest) -> GeneratedImage {
        let id = new_image_id();
        let url = self
            .providers
            .get(DEMO_PROVIDER)
            .ok_or_else(|| FallbackReason::ProviderUnavailable {
                provider: DEMO_PROVIDER.to_string(),
            })
            .and_then(|provider| provider.generate(request).map_err(FallbackReason::Provider))
            .and_then(|output| self.resolve_url(&id, output))
            .unwrap_or_else(|reason| {
                self.log(
                    "demo_provider_failed",
                    json!({ "reason": reason.code(), "detail": reason.to_string() }),
                );
                demo_image_url(&self.config.demo_image_base, &request.prompt, &request.style.id)
            });
        image_record(id, url, &request.prompt, &request.style)
    }

    fn generate_remote(
        &self,
        request: &ProviderGenerateRequest,
    ) -> std::result::Result<GeneratedImage, FallbackReason> {
        let Some(provider) = self.providers.get(CLIPDROP_PROVIDER) else {
            return Err(FallbackReason::ProviderUnavailable {
                provider: CLIPDROP_PROVIDER.to_string(),
            });
        };
        let id = new_image_id();
        let output = provider.generate(request).map_err(FallbackReason::Provider)?;
        let url = self.resolve_url(&id, output)?;
        Ok(image_record(id, url, &request.prompt, &request.style))
    }

    /// Remote outputs keep their url; byte outputs are written under the
    /// images dir and referenced by `file://` url.
    fn resolve_url(
        &self,
        id: &str,
        output: ProviderImage,
    ) -> std::result::Result<String, FallbackReason> {
        match output {
            ProviderImage::Remote { url } => Ok(url),
            ProviderImage::Bytes { bytes, mime_type } => {
                store_image_bytes(&self.config.images_dir(), id, &bytes, mime_type.as_deref())
                    .and_then(|path| file_url(&path))
                    .map_err(|err| FallbackReason::Storage {
                        message: format!("{err:#}"),
                    })
            }
        }
    }

    fn log_created(&self, image: &GeneratedImage, provider: &str) {
        self.log(
            "image_created",
            json!({
                "id": image.id,
                "url": image.url,
                "style": image.style,
                "provider": provider,
            }),
        );
    }

    // Diagnostics must not turn a usable result into an error.
    fn log(&self, event_type: &str, payload: serde_json::Value) {
        if let Err(err) = self.events.emit(event_type, map_object(payload)) {
            eprintln!("artloom: event log write failed: {err:#}");
        }
    }
}

fn default_provider_registry(config: &EngineConfig) -> ImageProviderRegistry {
    let mut providers = ImageProviderRegistry::new();
    providers.register(demo_provider(config));
    if let (CredentialStatus::Usable, Some(api_key)) =
        (config.credential_status(), config.api_key.as_deref())
    {
        providers.register(ClipdropProvider::new(config.api_url.clone(), api_key.trim()));
    }
    providers
}

fn demo_provider(config: &EngineConfig) -> DemoProvider {
    DemoProvider::new(config.demo_image_base.clone(), config.demo_delay)
}

fn image_record(id: String, url: String, prompt: &str, style: &ImageStyle) -> GeneratedImage {
    GeneratedImage::with_id(id, url, prompt, style.name.clone(), now_millis())
}

/// Writes provider bytes to `<dir>/<id>.<ext>` and returns the absolute path.
fn store_image_bytes(dir: &Path, id: &str, bytes: &[u8], mime: Option<&str>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let ext = image_extension(mime, bytes);
    let path = dir.join(format!("{id}.{ext}"));
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    fs::canonicalize(&path).with_context(|| format!("failed to resolve {}", path.display()))
}

fn file_url(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|_| anyhow::anyhow!("not an absolute path: {}", path.display()))
}

fn image_extension(mime: Option<&str>, bytes: &[u8]) -> &'static str {
    if let Some(mime) = mime {
        let lowered = mime.to_ascii_lowercase();
        if lowered.contains("jpeg") || lowered.contains("jpg") {
            return "jpg";
        }
        if lowered.contains("webp") {
            return "webp";
        }
        if lowered.contains("png") {
            return "png";
        }
    }
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}
