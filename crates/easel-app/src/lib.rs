//! Easel Application
//!
//! Headless shell around the editor core: loads projects and drives the
//! export, print and clipboard APIs with file-system and system-clipboard
//! services.

mod app;
mod native;

pub use app::{App, AppConfig, AppError, DocumentInfo, ExportFormat};
pub use native::{DirectoryFiles, SpoolPrinter};

#[cfg(feature = "native")]
pub use native::SystemClipboard;
