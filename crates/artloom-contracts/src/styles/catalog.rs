use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STYLE_ID: &str = "realistic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStyle {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prompt_suffix: String,
}

impl ImageStyle {
    /// Prompt sent to the provider: the user text with this style's suffix.
    pub fn enhance(&self, prompt: &str) -> String {
        format!("{prompt}{}", self.prompt_suffix)
    }
}

/// Ordered, id-keyed set of style presets. The first entry is the fallback
/// for unknown ids.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    styles: IndexMap<String, ImageStyle>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StyleCatalog {
    pub fn new(styles: Option<IndexMap<String, ImageStyle>>) -> Self {
        Self {
            styles: styles
                .filter(|styles| !styles.is_empty())
                .unwrap_or_else(default_styles),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ImageStyle> {
        self.styles.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &ImageStyle> {
        self.styles.values()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn first(&self) -> &ImageStyle {
        // `new` never stores an empty map.
        &self.styles[0]
    }

    pub fn by_name(&self, name: &str) -> Option<&ImageStyle> {
        self.styles.values().find(|style| style.name == name)
    }
}

fn default_styles() -> IndexMap<String, ImageStyle> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, name: &str, description: &str, prompt_suffix: &str| {
        map.insert(
            id.to_string(),
            ImageStyle {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                prompt_suffix: prompt_suffix.to_string(),
            },
        );
    };

    insert(
        "realistic",
        "Realistic",
        "Photorealistic images",
        ", photorealistic, high quality, detailed",
    );
    insert(
        "3d",
        "3D Render",
        "3D rendered style",
        ", 3D render, cinema4d, octane render",
    );
    insert(
        "anime",
        "Anime",
        "Japanese anime style",
        ", anime style, manga, japanese animation",
    );
    insert(
        "digital",
        "Digital Art",
        "Digital artwork style",
        ", digital art, concept art, artstation",
    );
    insert(
        "oil",
        "Oil Painting",
        "Classic oil painting",
        ", oil painting, classical art, renaissance style",
    );
    insert(
        "watercolor",
        "Watercolor",
        "Watercolor painting style",
        ", watercolor painting, soft colors, artistic",
    );
    insert(
        "cyberpunk",
        "Cyberpunk",
        "Futuristic cyberpunk",
        ", cyberpunk, neon lights, futuristic, sci-fi",
    );
    insert(
        "fantasy",
        "Fantasy",
        "Fantasy art style",
        ", fantasy art, magical, ethereal, mystical",
    );

    map
}
