use serde_json::Value;

use super::storage::LocalStorage;
use crate::images::GeneratedImage;

pub const HISTORY_KEY: &str = "generated-images";
pub const FAVORITES_KEY: &str = "favorite-images";

/// History (newest first) plus the favorites subset, loaded once and saved
/// after every mutation.
///
/// Favorites membership is the source of truth for the favorite flag. The
/// flag stored on history entries is kept in step for on-disk
/// compatibility but is never read back; use
/// [`CollectionStore::view_with_favorite_status`] for display.
#[derive(Debug)]
pub struct CollectionStore {
    storage: LocalStorage,
    history: Vec<GeneratedImage>,
    favorites: Vec<GeneratedImage>,
}

impl CollectionStore {
    pub fn load(storage: LocalStorage) -> Self {
        let history = read_images(&storage, HISTORY_KEY);
        let mut favorites = read_images(&storage, FAVORITES_KEY);
        for image in &mut favorites {
            image.set_favorite(true);
        }
        Self {
            storage,
            history,
            favorites,
        }
    }

    pub fn history(&self) -> &[GeneratedImage] {
        &self.history
    }

    pub fn favorites(&self) -> &[GeneratedImage] {
        &self.favorites
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn favorites_len(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|favorite| favorite.id == id)
    }

    /// Annotated lookup: history first, then favorites.
    pub fn get(&self, id: &str) -> Option<GeneratedImage> {
        self.history
            .iter()
            .chain(self.favorites.iter())
            .find(|image| image.id == id)
            .map(|image| image.annotated(self.is_favorite(id)))
    }

    pub fn add(&mut self, image: GeneratedImage) -> anyhow::Result<()> {
        let favorite = self.is_favorite(&image.id);
        self.history.insert(0, image.annotated(favorite));
        self.save_history()
    }

    /// Returns the new membership, or `None` when `id` is not in history.
    pub fn toggle_favorite(&mut self, id: &str) -> anyhow::Result<Option<bool>> {
        let Some(position) = self.history.iter().position(|image| image.id == id) else {
            return Ok(None);
        };

        let now_favorite = if self.is_favorite(id) {
            self.favorites.retain(|favorite| favorite.id != id);
            self.history[position].set_favorite(false);
            false
        } else {
            self.history[position].set_favorite(true);
            let copy = self.history[position].clone();
            self.favorites.insert(0, copy);
            true
        };

        self.save_all()?;
        Ok(Some(now_favorite))
    }

    /// Removes `id` from both collections; returns whether anything went.
    pub fn delete(&mut self, id: &str) -> anyhow::Result<bool> {
        let before = self.history.len() + self.favorites.len();
        self.history.retain(|image| image.id != id);
        self.favorites.retain(|favorite| favorite.id != id);
        let removed = before != self.history.len() + self.favorites.len();
        self.save_all()?;
        Ok(removed)
    }

    pub fn clear_history(&mut self) -> anyhow::Result<()> {
        self.history.clear();
        self.save_history()
    }

    pub fn clear_favorites(&mut self) -> anyhow::Result<()> {
        self.favorites.clear();
        for image in &mut self.history {
            image.set_favorite(false);
        }
        self.save_all()
    }

    /// History with every flag recomputed from favorites membership.
    pub fn view_with_favorite_status(&self) -> Vec<GeneratedImage> {
        self.history
            .iter()
            .map(|image| image.annotated(self.is_favorite(&image.id)))
            .collect()
    }

    fn save_history(&self) -> anyhow::Result<()> {
        write_images(&self.storage, HISTORY_KEY, &self.history)
    }

    fn save_all(&self) -> anyhow::Result<()> {
        self.save_history()?;
        write_images(&self.storage, FAVORITES_KEY, &self.favorites)
    }
}

fn read_images(storage: &LocalStorage, key: &str) -> Vec<GeneratedImage> {
    let Some(Value::Array(rows)) = storage.read(key) else {
        return Vec::new();
    };
    rows.into_iter()
        .filter_map(|row| serde_json::from_value::<GeneratedImage>(row).ok())
        .collect()
}

fn write_images(
    storage: &LocalStorage,
    key: &str,
    images: &[GeneratedImage],
) -> anyhow::Result<()> {
    storage.write(key, &serde_json::to_value(images)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CollectionStore, FAVORITES_KEY, HISTORY_KEY};
    use crate::collection::LocalStorage;
    use crate::images::GeneratedImage;

    fn image(id: &str) -> GeneratedImage {
        GeneratedImage::with_id(id, format!("https://img/{id}"), "a cat", "Realistic", 1)
    }

    fn assert_flags_match_membership(store: &CollectionStore) {
        for entry in store.view_with_favorite_status() {
            assert_eq!(
                entry.is_favorite(),
                store.favorites().iter().any(|fav| fav.id == entry.id),
                "flag mismatch for {}",
                entry.id
            );
        }
    }

    #[test]
    fn add_then_toggle_twice() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));

        store.add(image("a1"))?;
        assert_eq!(store.history_len(), 1);
        assert_eq!(store.favorites_len(), 0);

        assert_eq!(store.toggle_favorite("a1")?, Some(true));
        assert_eq!(store.favorites().len(), 1);
        assert_eq!(store.favorites()[0].id, "a1");
        assert!(store.favorites()[0].is_favorite());
        assert!(store.view_with_favorite_status()[0].is_favorite());

        assert_eq!(store.toggle_favorite("a1")?, Some(false));
        assert!(store.favorites().is_empty());
        assert!(!store.view_with_favorite_status()[0].is_favorite());
        Ok(())
    }

    #[test]
    fn history_is_newest_first() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        store.add(image("a1"))?;
        store.add(image("a2"))?;
        store.add(image("a3"))?;
        let ids = store
            .history()
            .iter()
            .map(|entry| entry.id.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(ids, vec!["a3", "a2", "a1"]);
        Ok(())
    }

    #[test]
    fn toggle_unknown_id_is_noop() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        store.add(image("a1"))?;
        assert_eq!(store.toggle_favorite("missing")?, None);
        assert!(store.favorites().is_empty());
        Ok(())
    }

    #[test]
    fn clear_favorites_resets_every_flag() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        store.add(image("a2"))?;
        store.add(image("a1"))?;
        store.toggle_favorite("a1")?;

        store.clear_favorites()?;
        assert!(store.favorites().is_empty());
        assert!(store.history().iter().all(|entry| !entry.is_favorite()));
        assert!(store
            .view_with_favorite_status()
            .iter()
            .all(|entry| !entry.is_favorite()));
        assert_eq!(store.history_len(), 2);
        Ok(())
    }

    #[test]
    fn delete_removes_from_both_collections() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        store.add(image("a2"))?;
        store.add(image("a1"))?;
        store.toggle_favorite("a1")?;
        store.toggle_favorite("a2")?;

        assert!(store.delete("a1")?);
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].id, "a2");
        assert_eq!(store.favorites().len(), 1);
        assert_eq!(store.favorites()[0].id, "a2");

        assert!(!store.delete("a1")?);
        Ok(())
    }

    #[test]
    fn clear_history_keeps_favorites() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        store.add(image("a1"))?;
        store.toggle_favorite("a1")?;
        store.clear_history()?;
        assert!(store.history().is_empty());
        assert_eq!(store.favorites_len(), 1);
        assert!(store.get("a1").map(|img| img.is_favorite()).unwrap_or(false));
        Ok(())
    }

    #[test]
    fn view_is_idempotent() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        store.add(image("a1"))?;
        store.add(image("a2"))?;
        store.toggle_favorite("a2")?;
        assert_eq!(
            store.view_with_favorite_status(),
            store.view_with_favorite_status()
        );
        Ok(())
    }

    #[test]
    fn flags_track_membership_across_mixed_operations() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
        for id in ["a1", "a2", "a3", "a4"] {
            store.add(image(id))?;
        }

        store.toggle_favorite("a1")?;
        assert_flags_match_membership(&store);
        store.toggle_favorite("a3")?;
        assert_flags_match_membership(&store);
        store.delete("a3")?;
        assert_flags_match_membership(&store);
        store.toggle_favorite("a1")?;
        assert_flags_match_membership(&store);
        store.toggle_favorite("a2")?;
        store.toggle_favorite("a4")?;
        assert_flags_match_membership(&store);
        store.clear_favorites()?;
        assert_flags_match_membership(&store);
        store.toggle_favorite("a4")?;
        store.delete("missing")?;
        assert_flags_match_membership(&store);
        Ok(())
    }

    #[test]
    fn stale_stored_flags_are_ignored_by_view() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = LocalStorage::new(temp.path());
        storage.write(
            HISTORY_KEY,
            &json!([
                {"id": "a1", "url": "u", "prompt": "p", "style": "Anime", "createdAt": 1, "isFavorite": true},
                {"id": "a2", "url": "u", "prompt": "p", "style": "Anime", "createdAt": 2, "isFavorite": false}
            ]),
        )?;
        storage.write(
            FAVORITES_KEY,
            &json!([
                {"id": "a2", "url": "u", "prompt": "p", "style": "Anime", "createdAt": 2}
            ]),
        )?;

        let store = CollectionStore::load(storage);
        let view = store.view_with_favorite_status();
        assert!(!view[0].is_favorite());
        assert!(view[1].is_favorite());
        assert!(store.favorites()[0].is_favorite());
        Ok(())
    }

    #[test]
    fn mutations_persist_across_reload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        {
            let mut store = CollectionStore::load(LocalStorage::new(temp.path()));
            store.add(image("a1"))?;
            store.add(image("a2"))?;
            store.toggle_favorite("a1")?;
        }
        let store = CollectionStore::load(LocalStorage::new(temp.path()));
        assert_eq!(store.history_len(), 2);
        assert_eq!(store.history()[0].id, "a2");
        assert!(store.is_favorite("a1"));
        assert!(!store.is_favorite("a2"));
        Ok(())
    }

    #[test]
    fn incompatible_stored_shape_reads_as_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = LocalStorage::new(temp.path());
        storage.write(HISTORY_KEY, &json!({"images": []}))?;
        storage.write(
            FAVORITES_KEY,
            &json!([{"id": 3}, {"id": "ok", "url": "u", "prompt": "p", "style": "s", "createdAt": 5}]),
        )?;
        std::fs::write(storage.path_for("other"), "garbage")?;

        let store = CollectionStore::load(storage);
        assert!(store.history().is_empty());
        assert_eq!(store.favorites_len(), 1);
        assert_eq!(store.favorites()[0].id, "ok");
        Ok(())
    }
}
