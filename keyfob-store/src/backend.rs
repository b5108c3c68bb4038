//! Key addressed blob storage underneath the [`TokenStore`](crate::TokenStore).

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, prelude::*},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;

use crate::Error;

/// Storage for opaque blobs, addressed by a 32-bit key.
///
/// A single `write` must either fully replace the previous blob or leave it untouched.
pub trait Backend {
    /// Load the blob under `key`, or `None` if there is none.
    fn read(&self, key: u32) -> io::Result<Option<Vec<u8>>>;
    fn write(&mut self, key: u32, data: &[u8]) -> io::Result<()>;
    /// Remove the blob under `key`. Removing a missing blob is not an error.
    fn delete(&mut self, key: u32) -> io::Result<()>;
}

/// Blobs held in memory only, mostly useful for testing.
#[derive(Debug, Default)]
pub struct MemoryBackend(HashMap<u32, Vec<u8>>);

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: u32) -> io::Result<Option<Vec<u8>>> {
        Ok(self.0.get(&key).cloned())
    }

    fn write(&mut self, key: u32, data: &[u8]) -> io::Result<()> {
        self.0.insert(key, data.to_owned());
        Ok(())
    }

    fn delete(&mut self, key: u32) -> io::Result<()> {
        self.0.remove(&key);
        Ok(())
    }
}

/// One file per blob inside a single directory.
///
/// Files are first written under a temporary name and then renamed over the old one, so an
/// interrupted write leaves either the old or the new content behind.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Use `dir` for storage, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    /// The platform specific data directory of **Keyfob**.
    pub fn default_dir() -> Result<PathBuf, Error> {
        Ok(ProjectDirs::from("rocks", "dnaka91", "keyfob")
            .ok_or(Error::HomefolderNotFound)?
            .data_dir()
            .join("store"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: u32) -> PathBuf {
        self.dir.join(format!("{key:08x}.bin"))
    }
}

impl Backend for FileBackend {
    fn read(&self, key: u32) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, key: u32, data: &[u8]) -> io::Result<()> {
        let path = self.path(key);
        let tmp = path.with_extension("tmp");

        let mut file = File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;

        fs::rename(tmp, path)
    }

    fn delete(&mut self, key: u32) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn exercise(backend: &mut impl Backend) {
        assert_eq!(None, backend.read(7).unwrap());

        backend.write(7, b"first").unwrap();
        assert_eq!(Some(b"first".to_vec()), backend.read(7).unwrap());

        backend.write(7, b"second").unwrap();
        assert_eq!(Some(b"second".to_vec()), backend.read(7).unwrap());

        backend.delete(7).unwrap();
        assert_eq!(None, backend.read(7).unwrap());
        backend.delete(7).unwrap();
    }

    #[test]
    fn memory() {
        exercise(&mut MemoryBackend::new());
    }

    #[test]
    fn files() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::open(dir.path().join("nested")).unwrap();

        exercise(&mut backend);

        backend.write(0, b"order").unwrap();
        assert!(backend.dir().join("00000000.bin").exists());
        assert!(!backend.dir().join("00000000.tmp").exists());
    }

    #[test]
    fn files_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        FileBackend::open(dir.path())
            .unwrap()
            .write(0xdead_beef, b"blob")
            .unwrap();

        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(Some(b"blob".to_vec()), backend.read(0xdead_beef).unwrap());
    }
}
