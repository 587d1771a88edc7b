//! Host-environment collaborators: clipboard, files and printing.
//!
//! The editor only talks to these traits. Memory implementations record
//! what they were asked to do so behavior can be checked without an OS.

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Collaborator errors. Editor code logs and contains these.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} is not available")]
    Unavailable(&'static str),
    #[error("IO error: {0}")]
    Io(String),
    #[error("cancelled by the user")]
    Cancelled,
}

impl From<std::io::Error> for ServiceError {
    fn from(error: std::io::Error) -> Self {
        ServiceError::Io(error.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One clipboard item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardEntry {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mime: "text/plain".to_string(),
            data: text.into().into_bytes(),
        }
    }

    /// The payload as text, for `text/*` entries.
    pub fn as_text(&self) -> Option<&str> {
        if self.mime.starts_with("text/") {
            std::str::from_utf8(&self.data).ok()
        } else {
            None
        }
    }
}

pub trait Clipboard {
    fn read(&mut self) -> ServiceResult<Vec<ClipboardEntry>>;

    fn write_text(&mut self, text: &str) -> ServiceResult<()>;
}

/// A file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub name: String,
    pub contents: Vec<u8>,
}

pub trait FileService {
    /// Let the user choose files matching `accept` (e.g. `".json"`).
    fn pick_files(&mut self, accept: &str) -> ServiceResult<Vec<PickedFile>>;

    /// Save `data_uri` under a generated name with `extension`.
    fn download(&mut self, data_uri: &str, extension: &str) -> ServiceResult<()>;
}

pub trait Printer {
    /// Print an image no wider than `max_width` pixels.
    fn print_image(&mut self, data_uri: &str, max_width: f64) -> ServiceResult<()>;
}

/// Clipboard backed by a vector of entries.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub entries: Vec<ClipboardEntry>,
}

impl Clipboard for MemoryClipboard {
    fn read(&mut self) -> ServiceResult<Vec<ClipboardEntry>> {
        Ok(self.entries.clone())
    }

    fn write_text(&mut self, text: &str) -> ServiceResult<()> {
        self.entries = vec![ClipboardEntry::text(text)];
        Ok(())
    }
}

/// A recorded download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub data_uri: String,
    pub extension: String,
}

/// File service that hands out queued picks and records downloads.
#[derive(Debug, Default)]
pub struct MemoryFiles {
    pub picks: Vec<PickedFile>,
    pub downloads: Vec<Download>,
}

impl FileService for MemoryFiles {
    fn pick_files(&mut self, accept: &str) -> ServiceResult<Vec<PickedFile>> {
        let picked: Vec<_> = self
            .picks
            .iter()
            .filter(|file| accept.is_empty() || file.name.ends_with(accept))
            .cloned()
            .collect();
        if picked.is_empty() {
            return Err(ServiceError::Cancelled);
        }
        Ok(picked)
    }

    fn download(&mut self, data_uri: &str, extension: &str) -> ServiceResult<()> {
        self.downloads.push(Download {
            data_uri: data_uri.to_string(),
            extension: extension.to_string(),
        });
        Ok(())
    }
}

/// Printer that records print jobs.
#[derive(Debug, Default)]
pub struct MemoryPrinter {
    pub jobs: Vec<(String, f64)>,
}

impl Printer for MemoryPrinter {
    fn print_image(&mut self, data_uri: &str, max_width: f64) -> ServiceResult<()> {
        self.jobs.push((data_uri.to_string(), max_width));
        Ok(())
    }
}

/// The collaborators an editor works with.
#[derive(Clone)]
pub struct Services {
    pub clipboard: Rc<RefCell<dyn Clipboard>>,
    pub files: Rc<RefCell<dyn FileService>>,
    pub printer: Rc<RefCell<dyn Printer>>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            clipboard: Rc::new(RefCell::new(MemoryClipboard::default())),
            files: Rc::new(RefCell::new(MemoryFiles::default())),
            printer: Rc::new(RefCell::new(MemoryPrinter::default())),
        }
    }
}

impl Services {
    pub fn with_clipboard(mut self, clipboard: Rc<RefCell<dyn Clipboard>>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_files(mut self, files: Rc<RefCell<dyn FileService>>) -> Self {
        self.files = files;
        self
    }

    pub fn with_printer(mut self, printer: Rc<RefCell<dyn Printer>>) -> Self {
        self.printer = printer;
        self
    }
}
