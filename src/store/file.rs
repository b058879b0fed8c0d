use super::{KeyValueStore, StoreError, KEY_PREFIX};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// One JSON file per key in a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", KEY_PREFIX, key))
    }
}

impl KeyValueStore for FileStore {
    fn save(&self, key: &str, blob: &Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, blob)?;
            file.flush()?;
        }
        fs::rename(&tmp, &path)?;
        log::debug!("saved {} to {}", key, path.display());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) => {
                log::error!("ignoring malformed {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            // includes temp files left by an interrupted save
            let ours = name.ends_with(".json") || name.ends_with(".json.tmp");
            if name.starts_with(KEY_PREFIX) && ours {
                fs::remove_file(entry.path())?;
            }
        }
        log::info!("cleared stored keys in {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));
        assert_eq!(store.load("app_state").unwrap(), None);

        store.save("app_state", &json!({ "a": [1, 2] })).unwrap();
        assert!(dir.path().join("data/k2_part2_app_state.json").exists());
        assert_eq!(store.load("app_state").unwrap(), Some(json!({ "a": [1, 2] })));

        store.clear("app_state").unwrap();
        store.clear("app_state").unwrap();
        assert_eq!(store.load("app_state").unwrap(), None);
    }

    #[test]
    fn malformed_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path_for("app_state"), "{ not json").unwrap();
        assert_eq!(store.load("app_state").unwrap(), None);
    }

    #[test]
    fn clear_all_only_removes_prefixed_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("app_state", &json!(1)).unwrap();
        store.save("countries_cache", &json!(2)).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        store.clear_all().unwrap();
        assert_eq!(store.load("app_state").unwrap(), None);
        assert_eq!(store.load("countries_cache").unwrap(), None);
        assert!(dir.path().join("notes.json").exists());
    }

    #[test]
    fn clear_all_removes_leftover_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let leftover = dir.path().join("k2_part2_app_state.json.tmp");
        fs::write(&leftover, "{ partial").unwrap();
        fs::write(dir.path().join("other.json.tmp"), "{}").unwrap();

        store.clear_all().unwrap();
        assert!(!leftover.exists());
        assert!(dir.path().join("other.json.tmp").exists());
    }
}
