use super::catalog::{ImageStyle, StyleCatalog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSelection {
    pub style: ImageStyle,
    pub requested: String,
    pub fallback_reason: Option<String>,
}

impl StyleCatalog {
    /// Resolves a style id, falling back to the first entry for unknown ids.
    pub fn select(&self, requested: &str) -> StyleSelection {
        if let Some(style) = self.get(requested) {
            return StyleSelection {
                style: style.clone(),
                requested: requested.to_string(),
                fallback_reason: None,
            };
        }
        let fallback = self.first().clone();
        StyleSelection {
            fallback_reason: Some(format!(
                "Requested style '{requested}' unknown; using '{}'.",
                fallback.id
            )),
            style: fallback,
            requested: requested.to_string(),
        }
    }

    /// Maps a stored display name back to its preset, defaulting to the
    /// first entry.
    pub fn select_by_name(&self, name: &str) -> &ImageStyle {
        self.by_name(name).unwrap_or_else(|| self.first())
    }
}
