mod storage;
mod store;

pub use storage::LocalStorage;
pub use store::{CollectionStore, FAVORITES_KEY, HISTORY_KEY};
