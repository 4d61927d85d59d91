use std::{
    fmt,
    fs::File,
    io::{Cursor, Read},
    path::PathBuf,
};

use log::error;

use crate::error::BatchError;

/// One input of a batch file read.
pub enum InputSource {
    /// In-memory file content.
    Bytes(Vec<u8>),
    /// In-memory character content.
    Text(String),
    /// A file on the local file system, opened when the reader is opened.
    Path(PathBuf),
    /// Any byte stream.
    Reader(Box<dyn Read + Send>),
}

impl InputSource {
    /// Builds an in-memory text file with one line per element.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        InputSource::Text(text)
    }

    pub fn from_reader<R: Read + Send + 'static>(rdr: R) -> Self {
        InputSource::Reader(Box::new(rdr))
    }

    /// Opens the source as a byte stream.
    pub fn open(self) -> Result<Box<dyn Read + Send>, BatchError> {
        match self {
            InputSource::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
            InputSource::Text(text) => Ok(Box::new(Cursor::new(text.into_bytes()))),
            InputSource::Path(path) => {
                let file = File::open(&path).map_err(|e| {
                    error!("Failed to open batch file {}: {}", path.display(), e);
                    BatchError::Configuration(format!(
                        "Failed to open batch file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(Box::new(file))
            }
            InputSource::Reader(rdr) => Ok(rdr),
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            InputSource::Text(text) => write!(f, "Text({} chars)", text.len()),
            InputSource::Path(path) => write!(f, "Path({})", path.display()),
            InputSource::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl From<Vec<u8>> for InputSource {
    fn from(bytes: Vec<u8>) -> Self {
        InputSource::Bytes(bytes)
    }
}

impl From<String> for InputSource {
    fn from(text: String) -> Self {
        InputSource::Text(text)
    }
}

impl From<&str> for InputSource {
    fn from(text: &str) -> Self {
        InputSource::Text(text.to_string())
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::Path(path)
    }
}
