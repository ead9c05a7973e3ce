//storage.rs
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::models::Block;

/// Fixed key the whole tree lives under, mirroring the browser original's
/// single localStorage entry.
pub const STORE_KEY: &str = "blocks";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory-backed key-value store. One key, one JSON file holding the
/// complete Block array; every save rewrites it wholesale.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Storage { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        PathBuf::from("data")
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read the tree back, or start empty when the file is missing or
    /// unreadable. A corrupt store is logged, never fatal.
    pub fn load(&self) -> Vec<Block> {
        let path = self.key_path(STORE_KEY);
        let Ok(text) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match serde_json::from_str(&text) {
            Ok(blocks) => blocks,
            Err(err) => {
                log::warn!(
                    "stored tree at {} is unreadable, starting empty: {err}",
                    path.display()
                );
                Vec::new()
            }
        }
    }

    pub fn save(&self, blocks: &[Block]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(blocks)?;
        fs::write(self.key_path(STORE_KEY), json)?;
        Ok(())
    }
}

/// Write the tree as pretty-printed (2-space) JSON for sharing.
pub fn export_blocks(path: &Path, blocks: &[Block]) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, blocks)?;
    Ok(())
}

/// Parse a user-picked file as the Block-array schema. Any read or parse
/// failure comes back as an error and the caller keeps its current tree.
pub fn import_blocks(path: &Path) -> Result<Vec<Block>, StorageError> {
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NumField};
    use pretty_assertions::assert_eq;

    fn sample_tree() -> Vec<Block> {
        vec![Block {
            id: 1700000000000,
            name: "Push day".to_string(),
            categories: vec![Category {
                id: 1700000000001,
                name: "Bench".to_string(),
                value: NumField::new(80),
                extra_value: NumField(None),
                timer: "2".to_string(),
                timer_running: false,
                remaining_time: 0,
                is_collapsed: false,
                sub_categories: Vec::new(),
            }],
        }]
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());

        storage.save(&sample_tree()).unwrap();
        assert_eq!(storage.load(), sample_tree());
    }

    #[test]
    fn missing_store_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("never-written"));
        assert_eq!(storage.load(), Vec::new());
    }

    #[test]
    fn corrupt_store_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        fs::write(dir.path().join("blocks.json"), "{not json").unwrap();
        assert_eq!(storage.load(), Vec::new());
    }

    #[test]
    fn export_import_is_the_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        export_blocks(&path, &sample_tree()).unwrap();
        assert_eq!(import_blocks(&path).unwrap(), sample_tree());
    }

    #[test]
    fn export_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        export_blocks(&path, &sample_tree()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {"), "expected 2-space indentation");
        assert!(text.contains("\"extraValue\": null"));
    }

    #[test]
    fn malformed_import_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"id\": ").unwrap();

        assert!(matches!(
            import_blocks(&path),
            Err(StorageError::Json(_))
        ));
        assert!(matches!(
            import_blocks(&dir.path().join("absent.json")),
            Err(StorageError::Io(_))
        ));
    }
}
