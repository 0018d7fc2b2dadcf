use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated image as stored in history and favorites.
///
/// Field names on disk follow the `generated-images` / `favorite-images`
/// layout (`createdAt`, `isFavorite`). The favorite flag is a projection of
/// favorites membership; only the collection store sets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub prompt: String,
    pub style: String,
    pub created_at: i64,
    #[serde(default)]
    is_favorite: bool,
}

impl GeneratedImage {
    /// Builds a fresh record with a new id and the current timestamp.
    pub fn new(
        url: impl Into<String>,
        prompt: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        Self::with_id(new_image_id(), url, prompt, style, now_millis())
    }

    pub fn with_id(
        id: impl Into<String>,
        url: impl Into<String>,
        prompt: impl Into<String>,
        style: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            prompt: prompt.into(),
            style: style.into(),
            created_at,
            is_favorite: false,
        }
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub(crate) fn annotated(&self, is_favorite: bool) -> Self {
        let mut image = self.clone();
        image.is_favorite = is_favorite;
        image
    }

    pub(crate) fn set_favorite(&mut self, is_favorite: bool) {
        self.is_favorite = is_favorite;
    }
}

pub fn new_image_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
