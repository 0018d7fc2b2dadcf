use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use artloom_contracts::collection::{CollectionStore, LocalStorage};
use artloom_contracts::commands::{StudioCommand, STUDIO_HELP_COMMANDS};
use artloom_contracts::events::{map_object, EventLog};
use artloom_contracts::images::GeneratedImage;
use artloom_contracts::styles::DEFAULT_STYLE_ID;
use artloom_engine::config::EngineConfig;
use artloom_engine::download::{default_download_name, download_image};
use artloom_engine::prompts::{random_surprise_prompt, validate_prompt};
use artloom_engine::{GenerationOutcome, GenerationPipeline};
use chrono::{DateTime, Local};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

const SHORT_ID_CHARS: usize = 8;

/// One CLI session: the pipeline, the persisted collections and the
/// currently selected style.
pub struct Studio {
    pipeline: GenerationPipeline,
    store: CollectionStore,
    events: EventLog,
    http: HttpClient,
    style_id: String,
    suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IdMatch {
    Found(String),
    Missing,
    Ambiguous(usize),
}

impl Studio {
    pub fn open(config: EngineConfig, events: EventLog) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = CollectionStore::load(LocalStorage::new(&config.data_dir));
        log_event(
            &events,
            "session_started",
            json!({
                "data_dir": config.data_dir.to_string_lossy().to_string(),
                "demo_mode": config.is_demo_mode(),
                "history": store.history_len(),
                "favorites": store.favorites_len(),
                "warnings": config.warnings,
            }),
        );
        let pipeline = GenerationPipeline::new(config, events.clone());
        Ok(Self {
            pipeline,
            store,
            events,
            http: HttpClient::new(),
            style_id: DEFAULT_STYLE_ID.to_string(),
            suggestion: None,
        })
    }

    #[cfg(test)]
    pub fn from_parts(pipeline: GenerationPipeline, store: CollectionStore) -> Self {
        let events = pipeline.events().clone();
        Self {
            pipeline,
            store,
            events,
            http: HttpClient::new(),
            style_id: DEFAULT_STYLE_ID.to_string(),
            suggestion: None,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn style_id(&self) -> &str {
        &self.style_id
    }

    /// Runs one parsed studio line. Returns `false` once the user quits.
    pub fn handle(&mut self, command: &StudioCommand, out: &mut dyn Write) -> Result<bool> {
        let id = command.arg_str("id").unwrap_or_default().to_string();
        match command.action.as_str() {
            "noop" => {
                // An empty line accepts a pending /surprise suggestion.
                if let Some(prompt) = self.suggestion.take() {
                    self.generate(&prompt, None, out)?;
                }
            }
            "generate" => {
                self.suggestion = None;
                let prompt = command.prompt.clone().unwrap_or_default();
                self.generate(&prompt, None, out)?;
            }
            "set_style" => {
                let style = command.arg_str("style").unwrap_or_default().to_string();
                self.set_style(&style, out)?;
            }
            "list_styles" => self.list_styles(out)?,
            "surprise" => {
                let prompt = self.surprise(out)?;
                writeln!(out, "Press Enter to generate it, or type another prompt.")?;
                self.suggestion = Some(prompt.to_string());
            }
            "history" => self.history(out)?,
            "favorites" => self.favorites(out)?,
            "toggle_favorite" => self.toggle_favorite(&id, out)?,
            "delete" => self.delete(&id, out)?,
            "regenerate" => {
                self.regenerate(&id, out)?;
            }
            "download" => {
                let dest = command.arg_str("path").map(PathBuf::from);
                self.download(&id, dest.as_deref(), out)?;
            }
            "clear_history" => self.clear_history(out)?,
            "clear_favorites" => self.clear_favorites(out)?,
            "status" => self.status(out)?,
            "help" => writeln!(out, "Commands: {}", STUDIO_HELP_COMMANDS.join(" "))?,
            "quit" => return Ok(false),
            _ => {
                let name = command.arg_str("command").unwrap_or(command.raw.as_str());
                writeln!(out, "Unknown command: /{name}. Type /help for commands.")?;
            }
        }
        Ok(true)
    }

    pub fn set_style(&mut self, style_id: &str, out: &mut dyn Write) -> Result<()> {
        match self.pipeline.catalog().get(style_id) {
            Some(style) => {
                self.style_id = style.id.clone();
                writeln!(out, "Style set to {} ({})", style.name, style.id)?;
            }
            None => writeln!(
                out,
                "Unknown style '{style_id}'. Use /styles to list the presets."
            )?,
        }
        Ok(())
    }

    pub fn list_styles(&self, out: &mut dyn Write) -> Result<()> {
        for style in self.pipeline.catalog().list() {
            let marker = if style.id == self.style_id { "*" } else { " " };
            writeln!(
                out,
                "{marker} {:<11} {:<13} {}",
                style.id, style.name, style.description
            )?;
        }
        Ok(())
    }

    /// Validates, generates with `style_id` (or the current style) and
    /// prepends the result to history. Returns `None` when the prompt was
    /// rejected.
    pub fn generate(
        &mut self,
        prompt: &str,
        style_id: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<Option<GeneratedImage>> {
        if let Err(err) = validate_prompt(prompt) {
            writeln!(out, "{err}")?;
            return Ok(None);
        }
        if self.pipeline.is_demo_mode() {
            writeln!(
                out,
                "Demo mode: set CLIPDROP_API_KEY to use real AI generation. Using placeholder images."
            )?;
        }
        let style_id = style_id.unwrap_or(&self.style_id).to_string();
        writeln!(out, "Generating...")?;
        let outcome = self.pipeline.generate(prompt, &style_id);
        if let GenerationOutcome::Fallback { reason, .. } = &outcome {
            if !reason.is_expected() {
                writeln!(out, "Generation service unavailable ({reason}); showing a demo image.")?;
            }
        }
        let image = outcome.into_image();
        self.store.add(image.clone())?;
        self.record("add", &image.id);
        write_image(out, &image)?;
        Ok(Some(image))
    }

    pub fn surprise(&self, out: &mut dyn Write) -> Result<&'static str> {
        let prompt = random_surprise_prompt();
        writeln!(out, "{prompt}")?;
        Ok(prompt)
    }

    pub fn regenerate(&mut self, id: &str, out: &mut dyn Write) -> Result<Option<GeneratedImage>> {
        let Some(id) = self.resolve_id(id, out)? else {
            return Ok(None);
        };
        let Some(source) = self.store.get(&id) else {
            return Ok(None);
        };
        let style_id = self
            .pipeline
            .catalog()
            .select_by_name(&source.style)
            .id
            .clone();
        self.generate(&source.prompt, Some(&style_id), out)
    }

    pub fn history(&self, out: &mut dyn Write) -> Result<()> {
        let view = self.store.view_with_favorite_status();
        if view.is_empty() {
            writeln!(out, "No images yet.")?;
            return Ok(());
        }
        writeln!(out, "All generated images ({})", view.len())?;
        for image in &view {
            write_image(out, image)?;
        }
        Ok(())
    }

    pub fn favorites(&self, out: &mut dyn Write) -> Result<()> {
        let favorites = self.store.favorites();
        if favorites.is_empty() {
            writeln!(out, "No favorites yet.")?;
            return Ok(());
        }
        writeln!(out, "Your favorites ({})", favorites.len())?;
        for image in favorites {
            write_image(out, image)?;
        }
        Ok(())
    }

    pub fn toggle_favorite(&mut self, id: &str, out: &mut dyn Write) -> Result<()> {
        let Some(id) = self.resolve_id(id, out)? else {
            return Ok(());
        };
        match self.store.toggle_favorite(&id)? {
            Some(true) => {
                self.record("favorite", &id);
                writeln!(out, "Added {} to favorites", short_id(&id))?;
            }
            Some(false) => {
                self.record("unfavorite", &id);
                writeln!(out, "Removed {} from favorites", short_id(&id))?;
            }
            None => writeln!(
                out,
                "{} is no longer in history; only history images can be favorited",
                short_id(&id)
            )?,
        }
        Ok(())
    }

    pub fn delete(&mut self, id: &str, out: &mut dyn Write) -> Result<()> {
        let Some(id) = self.resolve_id(id, out)? else {
            return Ok(());
        };
        if self.store.delete(&id)? {
            self.record("delete", &id);
            writeln!(out, "Deleted {}", short_id(&id))?;
        }
        Ok(())
    }

    pub fn clear_history(&mut self, out: &mut dyn Write) -> Result<()> {
        let count = self.store.history_len();
        self.store.clear_history()?;
        self.record("clear_history", "");
        writeln!(out, "Cleared {count} images from history")?;
        Ok(())
    }

    pub fn clear_favorites(&mut self, out: &mut dyn Write) -> Result<()> {
        let count = self.store.favorites_len();
        self.store.clear_favorites()?;
        self.record("clear_favorites", "");
        writeln!(out, "Cleared {count} favorites")?;
        Ok(())
    }

    pub fn download(&mut self, id: &str, dest: Option<&Path>, out: &mut dyn Write) -> Result<()> {
        let Some(id) = self.resolve_id(id, out)? else {
            return Ok(());
        };
        let Some(image) = self.store.get(&id) else {
            return Ok(());
        };
        let dest = dest
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_download_name(&image.id));
        match download_image(&self.http, &image.url, &dest) {
            Ok(bytes) => {
                log_event(
                    &self.events,
                    "download_finished",
                    json!({
                        "id": image.id,
                        "path": dest.to_string_lossy().to_string(),
                        "bytes": bytes,
                    }),
                );
                writeln!(out, "Saved {} ({bytes} bytes)", dest.display())?;
            }
            Err(err) => {
                log_event(
                    &self.events,
                    "download_failed",
                    json!({
                        "id": image.id,
                        "error": format!("{err:#}"),
                    }),
                );
                writeln!(out, "Download failed: {err:#}")?;
            }
        }
        Ok(())
    }

    pub fn status(&self, out: &mut dyn Write) -> Result<()> {
        let config = self.pipeline.config();
        writeln!(
            out,
            "Mode: {}",
            if config.is_demo_mode() { "demo" } else { "clipdrop" }
        )?;
        writeln!(out, "Style: {}", self.style_id)?;
        writeln!(out, "History: {}", self.store.history_len())?;
        writeln!(out, "Favorites: {}", self.store.favorites_len())?;
        writeln!(out, "Data: {}", config.data_dir.display())?;
        writeln!(out, "Events: {}", self.events.path().display())?;
        writeln!(out, "Session: {}", self.events.session_id())?;
        for warning in &config.warnings {
            writeln!(out, "Warning: {warning}")?;
        }
        Ok(())
    }

    /// Accepts a full id or a unique prefix of one.
    fn resolve_id(&self, raw: &str, out: &mut dyn Write) -> Result<Option<String>> {
        let raw = raw.trim();
        if raw.is_empty() {
            writeln!(out, "An image id is required")?;
            return Ok(None);
        }
        match self.match_id(raw) {
            IdMatch::Found(id) => Ok(Some(id)),
            IdMatch::Missing => {
                writeln!(out, "No image with id '{raw}'")?;
                Ok(None)
            }
            IdMatch::Ambiguous(count) => {
                writeln!(out, "'{raw}' matches {count} images; use more characters")?;
                Ok(None)
            }
        }
    }

    fn match_id(&self, raw: &str) -> IdMatch {
        let mut candidates = self
            .store
            .history()
            .iter()
            .chain(self.store.favorites().iter())
            .map(|image| image.id.as_str())
            .filter(|id| id.starts_with(raw))
            .collect::<Vec<&str>>();
        if candidates.contains(&raw) {
            return IdMatch::Found(raw.to_string());
        }
        candidates.sort_unstable();
        candidates.dedup();
        match candidates.as_slice() {
            [] => IdMatch::Missing,
            [only] => IdMatch::Found((*only).to_string()),
            many => IdMatch::Ambiguous(many.len()),
        }
    }

    fn record(&self, action: &str, id: &str) {
        let id = Some(id).filter(|id| !id.is_empty());
        log_event(
            &self.events,
            "collection_updated",
            json!({
                "action": action,
                "id": id,
                "history": self.store.history_len(),
                "favorites": self.store.favorites_len(),
            }),
        );
    }
}

// The collection is already saved; a broken log must not report failure.
fn log_event(events: &EventLog, event_type: &str, payload: Value) {
    if let Err(err) = events.emit(event_type, map_object(payload)) {
        eprintln!("artloom: event log write failed: {err:#}");
    }
}

pub fn default_events_path(config: &EngineConfig, events: Option<PathBuf>) -> PathBuf {
    events.unwrap_or_else(|| config.events_path())
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_CHARS).unwrap_or(id)
}

fn format_created(created_at: i64) -> String {
    DateTime::from_timestamp_millis(created_at)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| created_at.to_string())
}

fn write_image(out: &mut dyn Write, image: &GeneratedImage) -> Result<()> {
    let heart = if image.is_favorite() { "♥" } else { " " };
    writeln!(
        out,
        "{heart} {}  {:<12} {}  {}",
        short_id(&image.id),
        image.style,
        format_created(image.created_at),
        image.prompt
    )?;
    writeln!(out, "    {}", image.url)?;
    Ok(())
}
