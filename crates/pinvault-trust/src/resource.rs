// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resource abstraction — "somewhere persisted bytes live".  The certificate
// store reads and writes its sealed blob through this seam so that it can be
// backed by a file, an in-memory buffer, or anything else that hands out
// byte streams.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pinvault_core::error::PinvaultError;
use tempfile::NamedTempFile;
use tracing::debug;

/// A readable/writable byte-stream endpoint.
///
/// Streams are released when the returned boxes are dropped, so every exit
/// path (including `?`) closes them.
pub trait Resource: Send + Sync {
    /// Open the persisted bytes for reading.  `Ok(None)` means nothing has
    /// been persisted yet, which is distinct from an I/O failure.
    fn input_stream(&self) -> Result<Option<Box<dyn Read + '_>>, PinvaultError>;

    /// Open the resource for overwriting.
    fn output_stream(&self) -> Result<Box<dyn Write + '_>, PinvaultError>;

    /// Replace the persisted bytes with `bytes` as one unit: on error the
    /// previous content must still be readable.
    ///
    /// The default writes through [`Self::output_stream`] and relies on the
    /// stream publishing its bytes only on a successful `flush`.  Resources
    /// whose streams write in place override this.
    fn replace(&self, bytes: &[u8]) -> Result<(), PinvaultError> {
        let mut out = self.output_stream()?;
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }

    /// Whether writes are expected to succeed.
    fn is_writable(&self) -> bool {
        true
    }

    /// Short human-readable location used in log fields.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// A resource backed by a single file on disk.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_parent(&self) -> io::Result<PathBuf> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                Ok(parent.to_path_buf())
            }
            None => Ok(PathBuf::from(".")),
        }
    }
}

impl Resource for FileResource {
    fn input_stream(&self) -> Result<Option<Box<dyn Read + '_>>, PinvaultError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no persisted store yet");
                Ok(None)
            }
            Err(e) => Err(PinvaultError::Io(e)),
        }
    }

    /// Truncates the file immediately; prefer [`Resource::replace`].
    fn output_stream(&self) -> Result<Box<dyn Write + '_>, PinvaultError> {
        self.create_parent()?;
        let file = File::create(&self.path)?;
        Ok(Box::new(file))
    }

    /// Writes a sibling temporary file and renames it over the target, so a
    /// failed write leaves the old file in place.
    fn replace(&self, bytes: &[u8]) -> Result<(), PinvaultError> {
        let dir = self.create_parent()?;
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| PinvaultError::Io(e.error))?;
        debug!(path = %self.path.display(), len = bytes.len(), "file replaced");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// A resource backed by an in-memory buffer.
///
/// Clones share the same buffer, so a test can keep one handle to inspect
/// what a store wrote through another.  Written bytes become visible only
/// when the output stream is flushed; a stream dropped unflushed is discarded.
#[derive(Debug, Clone, Default)]
pub struct MemoryResource {
    content: Arc<Mutex<Option<Vec<u8>>>>,
    read_only: bool,
}

impl MemoryResource {
    /// An empty resource: nothing persisted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource that already holds `bytes`.
    pub fn with_content(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Arc::new(Mutex::new(Some(bytes.into()))),
            read_only: false,
        }
    }

    /// A resource holding `bytes` that rejects writes.
    pub fn read_only(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            read_only: true,
            ..Self::with_content(bytes)
        }
    }

    /// A copy of the current content, `None` if nothing was ever written.
    pub fn content(&self) -> Option<Vec<u8>> {
        lock(&self.content).ok().and_then(|guard| guard.clone())
    }
}

fn lock(content: &Mutex<Option<Vec<u8>>>) -> io::Result<std::sync::MutexGuard<'_, Option<Vec<u8>>>> {
    content
        .lock()
        .map_err(|_| io::Error::other("memory resource lock poisoned"))
}

impl Resource for MemoryResource {
    fn input_stream(&self) -> Result<Option<Box<dyn Read + '_>>, PinvaultError> {
        let guard = lock(&self.content)?;
        Ok(guard
            .clone()
            .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read + '_>))
    }

    fn output_stream(&self) -> Result<Box<dyn Write + '_>, PinvaultError> {
        if self.read_only {
            return Err(PinvaultError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory resource is read-only",
            )));
        }
        Ok(Box::new(MemoryWriter {
            target: Arc::clone(&self.content),
            buffer: Vec::new(),
        }))
    }

    fn is_writable(&self) -> bool {
        !self.read_only
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

/// Buffers writes and replaces the shared content on flush.
struct MemoryWriter {
    target: Arc<Mutex<Option<Vec<u8>>>>,
    buffer: Vec<u8>,
}

impl MemoryWriter {
    fn commit(&self) -> io::Result<()> {
        let mut guard = lock(&self.target)?;
        *guard = Some(self.buffer.clone());
        Ok(())
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(resource: &dyn Resource) -> Option<Vec<u8>> {
        resource.input_stream().unwrap().map(|mut stream| {
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).unwrap();
            bytes
        })
    }

    #[test]
    fn empty_memory_resource_has_no_input() {
        let resource = MemoryResource::new();
        assert!(read_all(&resource).is_none());
        assert!(resource.content().is_none());
    }

    #[test]
    fn memory_writes_commit_on_flush() {
        let resource = MemoryResource::new();
        let observer = resource.clone();
        {
            let mut out = resource.output_stream().unwrap();
            out.write_all(b"sealed").unwrap();
            out.flush().unwrap();
        }
        assert_eq!(observer.content().as_deref(), Some(&b"sealed"[..]));
        assert_eq!(read_all(&resource).as_deref(), Some(&b"sealed"[..]));
    }

    #[test]
    fn unflushed_memory_writes_are_discarded() {
        let resource = MemoryResource::with_content(b"intact".to_vec());
        {
            let mut out = resource.output_stream().unwrap();
            out.write_all(b"half a bl").unwrap();
        }
        assert_eq!(resource.content().as_deref(), Some(&b"intact"[..]));
    }

    #[test]
    fn memory_replace_overwrites() {
        let resource = MemoryResource::with_content(b"old old old".to_vec());
        resource.replace(b"new").unwrap();
        assert_eq!(resource.content().as_deref(), Some(&b"new"[..]));
    }

    #[test]
    fn read_only_rejects_output() {
        let resource = MemoryResource::read_only(b"x".to_vec());
        assert!(!resource.is_writable());
        assert!(matches!(resource.output_stream(), Err(PinvaultError::Io(_))));
    }

    #[test]
    fn missing_file_has_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(dir.path().join("absent.store"));
        assert!(read_all(&resource).is_none());
    }

    #[test]
    fn file_round_trip_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(dir.path().join("nested").join("trust.store"));
        resource.output_stream().unwrap().write_all(b"blob").unwrap();
        assert_eq!(read_all(&resource).as_deref(), Some(&b"blob"[..]));
        assert!(resource.describe().ends_with("trust.store"));
    }

    #[test]
    fn file_replace_swaps_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.store");
        let resource = FileResource::new(&path);
        resource.replace(b"first, longer content").unwrap();
        resource.replace(b"second").unwrap();

        assert_eq!(read_all(&resource).as_deref(), Some(&b"second"[..]));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("trust.store")]);
    }

    #[test]
    fn failed_file_replace_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.store");
        fs::write(&path, b"previous").unwrap();
        // A directory cannot be the parent of a new file.
        let blocked = FileResource::new(path.join("child.store"));
        assert!(blocked.replace(b"new").is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }
}
