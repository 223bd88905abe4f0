use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// A JSON document on disk guarded by its own mutex.
///
/// Reads of a missing file yield `T::default()`. Writes go to a sibling
/// temporary file which is then renamed over the target.
pub struct JsonDocument<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Snapshot of the current contents.
    pub fn load(&self) -> Result<T, StoreError> {
        let _guard = self.guard();
        self.read()
    }

    /// Overwrite the document.
    pub fn save(&self, value: &T) -> Result<(), StoreError> {
        let _guard = self.guard();
        self.write(value)
    }

    /// Read, mutate and write back while holding the document lock.
    ///
    /// The closure's result is returned only after the write succeeded.
    pub fn with_lock<R>(&self, mutate: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let _guard = self.guard();
        let mut value = self.read()?;
        let out = mutate(&mut value);
        self.write(&value)?;
        Ok(out)
    }

    /// Like [`with_lock`](Self::with_lock), but leaves a missing document missing
    /// and returns `None` instead of creating it.
    pub fn with_existing<R>(
        &self,
        mutate: impl FnOnce(&mut T) -> R,
    ) -> Result<Option<R>, StoreError> {
        let _guard = self.guard();
        if !self.exists() {
            return Ok(None);
        }
        let mut value = self.read()?;
        let out = mutate(&mut value);
        self.write(&value)?;
        Ok(Some(out))
    }

    /// Delete the document. Returns `false` when there was nothing to delete.
    pub fn remove(&self) -> Result<bool, StoreError> {
        let _guard = self.guard();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    // The guarded data is `()`, so a poisoned lock carries no broken state.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> Result<T, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}
