use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::cart::{LocalStorage, StoreError};

/// Local storage with one file per key inside a directory. Writes go through a temporary
/// file and a rename so a crash never leaves a half written blob.
#[derive(Debug, Clone)]
pub struct FileLocalStorage {
    directory: Utf8PathBuf,
}

impl FileLocalStorage {
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid local storage key {key:?}")));
        }
        Ok(self.directory.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let temporary = path.with_extension("json.tmp");
        fs::write(&temporary, value)?;
        fs::rename(&temporary, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
