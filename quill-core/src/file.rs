use std::{
    fs,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{Error, Result};

/// Create every missing parent directory of `path`.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::destination_unavailable(parent, e))?;
    }
    Ok(())
}

/// A destination for one generated file.
///
/// The handle is lazy: nothing touches the file until a writer or reader is
/// opened, and every [`open_writer`](Self::open_writer) call starts an
/// independent write session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    name: String,
    path: PathBuf,
}

impl ArtifactHandle {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// The relative name the handle was requested with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The physical destination.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create or truncate the file and return a writer for it.
    pub fn open_writer(&self) -> Result<ArtifactWriter> {
        ensure_parent_dir(&self.path)?;
        let file = fs::File::create(&self.path)
            .map_err(|e| Error::destination_unavailable(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "opened artifact for writing");
        Ok(ArtifactWriter::file(&self.name, &self.path, file))
    }

    /// Open the current content, or `None` if nothing has been written yet.
    pub fn open_reader(&self) -> Result<Option<BufReader<fs::File>>> {
        match fs::File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Box::new(Error::Io {
                path: self.path.clone(),
                source: e,
            })),
        }
    }

    /// The full UTF-8 content, or `None` if the file does not exist.
    pub fn text_content(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Box::new(Error::Io {
                path: self.path.clone(),
                source: e,
            })),
        }
    }
}

/// Shared buffer backing an in-memory artifact.
pub type MemoryBuffer = Arc<Mutex<Vec<u8>>>;

/// An exclusively owned write session for one artifact.
///
/// Call [`close`](Self::close) to observe flush errors; dropping the writer
/// releases the destination with a best-effort flush.
#[derive(Debug)]
pub struct ArtifactWriter {
    name: String,
    path: PathBuf,
    sink: Sink,
}

#[derive(Debug)]
enum Sink {
    File(BufWriter<fs::File>),
    Memory(MemoryBuffer),
}

impl ArtifactWriter {
    fn file(name: &str, path: &Path, file: fs::File) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            sink: Sink::File(BufWriter::new(file)),
        }
    }

    /// Writer appending to a shared in-memory buffer.
    pub fn memory(name: impl Into<String>, buffer: MemoryBuffer) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            sink: Sink::Memory(buffer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything written so far and end the session.
    pub fn close(mut self) -> Result<()> {
        self.flush()
            .map_err(|e| Error::destination_unavailable(&self.path, e))
    }
}

impl Write for ArtifactWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::File(writer) => writer.write(buf),
            Sink::Memory(buffer) => {
                buffer.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::File(writer) => writer.flush(),
            Sink::Memory(_) => Ok(()),
        }
    }
}
