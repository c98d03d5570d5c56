//! Filesystem chunk store
//!
//! Chunks are serialized in full, written to `<name>.tmp` and renamed into
//! place, so a reader never observes a half-written chunk.

use crate::output::traits::{chunk_file_name, is_chunk_file_of, ChunkStore, WriteError, WriteResult};
use crate::review::{AppId, Review};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes chunks as JSON files into one directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of chunk `index`
    pub fn path_for(&self, app_id: AppId, index: u32) -> PathBuf {
        self.root.join(chunk_file_name(app_id, index))
    }

    /// Writes `bytes` to `path` atomically
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> WriteResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| WriteError::Io {
            path: self.root.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp);
            return Err(WriteError::Io { path: tmp, source });
        }

        if let Err(source) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(WriteError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(())
    }
}

impl ChunkStore for DirectoryStore {
    fn write_chunk(
        &mut self,
        app_id: AppId,
        index: u32,
        reviews: &[Review],
    ) -> WriteResult<PathBuf> {
        let mut bytes = serde_json::to_vec_pretty(reviews)
            .map_err(|source| WriteError::Serialize { index, source })?;
        bytes.push(b'\n');

        let path = self.path_for(app_id, index);
        self.write_atomic(&path, &bytes)?;
        tracing::debug!("Wrote {} reviews to {}", reviews.len(), path.display());
        Ok(path)
    }

    fn clear_stale(&mut self, app_id: AppId) -> WriteResult<Vec<PathBuf>> {
        let io_error = |path: &Path, source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.root, e))?;
            let name = entry.file_name();
            let is_stale = name
                .to_str()
                .map_or(false, |name| is_chunk_file_of(name, app_id));
            if !is_stale || !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
            tracing::debug!("Removed stale chunk {}", path.display());
            removed.push(path);
        }
        removed.sort();
        Ok(removed)
    }
}
