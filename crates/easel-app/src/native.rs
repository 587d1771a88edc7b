//! Host services backed by the file system and the system clipboard.

use easel_core::export::decode_data_uri;
use easel_core::services::ServiceResult;
use easel_core::{Clipboard, ClipboardEntry, FileService, PickedFile, Printer, ServiceError};
use std::fs;
use std::path::{Path, PathBuf};

fn write_data_uri(data_uri: &str, path: &Path) -> ServiceResult<()> {
    let (_, bytes) = decode_data_uri(data_uri).map_err(|e| ServiceError::Io(e.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Serves picks from a list of input files and writes downloads into a
/// directory as `<stem>.<extension>`.
#[derive(Debug)]
pub struct DirectoryFiles {
    out_dir: PathBuf,
    stem: String,
    inputs: Vec<PathBuf>,
    written: Vec<PathBuf>,
}

impl DirectoryFiles {
    pub fn new(out_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            stem: stem.into(),
            inputs: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Offer `path` to the next file pick.
    pub fn add_input(&mut self, path: impl Into<PathBuf>) {
        self.inputs.push(path.into());
    }

    pub fn set_stem(&mut self, stem: impl Into<String>) {
        self.stem = stem.into();
    }

    /// Files written so far, oldest first.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn last_written(&self) -> Option<&Path> {
        self.written.last().map(PathBuf::as_path)
    }
}

impl FileService for DirectoryFiles {
    fn pick_files(&mut self, accept: &str) -> ServiceResult<Vec<PickedFile>> {
        let accept = accept.trim_start_matches('.');
        let mut picked = Vec::new();
        for path in &self.inputs {
            let matches = accept.is_empty() || path.extension().is_some_and(|ext| ext == accept);
            if !matches {
                continue;
            }
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            picked.push(PickedFile {
                name,
                contents: fs::read(path)?,
            });
        }
        if picked.is_empty() {
            return Err(ServiceError::Cancelled);
        }
        Ok(picked)
    }

    fn download(&mut self, data_uri: &str, extension: &str) -> ServiceResult<()> {
        let path = self.out_dir.join(format!("{}.{}", self.stem, extension));
        write_data_uri(data_uri, &path)?;
        log::info!("Saved {:?}", path);
        self.written.push(path);
        Ok(())
    }
}

/// Writes print jobs as numbered PNG files into a spool directory.
#[derive(Debug)]
pub struct SpoolPrinter {
    dir: PathBuf,
    jobs: usize,
}

impl SpoolPrinter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), jobs: 0 }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }
}

impl Printer for SpoolPrinter {
    fn print_image(&mut self, data_uri: &str, max_width: f64) -> ServiceResult<()> {
        self.jobs += 1;
        let path = self.dir.join(format!("print-{}.png", self.jobs));
        write_data_uri(data_uri, &path)?;
        log::info!("Spooled print job {:?} (max width {})", path, max_width);
        Ok(())
    }
}

/// System clipboard. Images are handed to the editor as PNG.
#[cfg(feature = "native")]
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

#[cfg(feature = "native")]
impl SystemClipboard {
    fn clipboard(&mut self) -> ServiceResult<&mut arboard::Clipboard> {
        if self.inner.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.inner = Some(clipboard),
                Err(e) => {
                    log::error!("Failed to access clipboard: {}", e);
                    return Err(ServiceError::Unavailable("clipboard"));
                }
            }
        }
        self.inner.as_mut().ok_or(ServiceError::Unavailable("clipboard"))
    }
}

#[cfg(feature = "native")]
fn encode_rgba(width: u32, height: u32, rgba: &[u8]) -> ServiceResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(|e| ServiceError::Io(e.to_string()))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| ServiceError::Io(e.to_string()))?;
    }
    Ok(png_data)
}

#[cfg(feature = "native")]
impl Clipboard for SystemClipboard {
    fn read(&mut self) -> ServiceResult<Vec<ClipboardEntry>> {
        let clipboard = self.clipboard()?;
        let mut entries = Vec::new();
        if let Ok(text) = clipboard.get_text() {
            entries.push(ClipboardEntry::text(text));
        }
        if let Ok(image) = clipboard.get_image() {
            let png_data = encode_rgba(image.width as u32, image.height as u32, &image.bytes)?;
            log::info!("Read image from clipboard: {}x{}", image.width, image.height);
            entries.push(ClipboardEntry {
                mime: "image/png".to_string(),
                data: png_data,
            });
        }
        Ok(entries)
    }

    fn write_text(&mut self, text: &str) -> ServiceResult<()> {
        self.clipboard()?
            .set_text(text)
            .map_err(|e| ServiceError::Io(e.to_string()))?;
        log::info!("Copied {} bytes to clipboard", text.len());
        Ok(())
    }
}
