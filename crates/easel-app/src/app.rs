//! Headless editor session.

use crate::native::{DirectoryFiles, SpoolPrinter};
use easel_core::canvas::Canvas;
use easel_core::{ApiArgs, ConfigError, Editor, EditorConfig, EditorError, Scene, Services};
use serde_json::Value;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("nothing was written")]
    NothingWritten,
}

/// Export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Png,
    Svg,
    Json,
}

impl ExportFormat {
    fn api(self) -> &'static str {
        match self {
            ExportFormat::Png => "saveImg",
            ExportFormat::Svg => "saveSvg",
            ExportFormat::Json => "saveJson",
        }
    }
}

/// Summary of the loaded project.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub width: f64,
    pub height: f64,
    pub dpi: f64,
    /// Objects other than the workspace.
    pub objects: usize,
    pub plugins: Vec<&'static str>,
}

/// Where a session writes its output.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub editor: EditorConfig,
    pub out_dir: PathBuf,
}

impl AppConfig {
    pub fn new(editor: EditorConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            editor,
            out_dir: out_dir.into(),
        }
    }
}

/// An editor bound to an in-memory scene, with file-backed services.
pub struct App {
    editor: Editor,
    scene: Rc<RefCell<Scene>>,
    files: Rc<RefCell<DirectoryFiles>>,
}

impl App {
    /// Session using the system clipboard.
    #[cfg(feature = "native")]
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let clipboard = Rc::new(RefCell::new(crate::native::SystemClipboard::default()));
        Self::with_services(config, Services::default().with_clipboard(clipboard))
    }

    /// Session with an in-memory clipboard.
    #[cfg(not(feature = "native"))]
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        Self::with_services(config, Services::default())
    }

    /// Session with `services`; files and printing are always directory backed.
    pub fn with_services(config: &AppConfig, services: Services) -> Result<Self, AppError> {
        let files = Rc::new(RefCell::new(DirectoryFiles::new(&config.out_dir, "untitled")));
        let printer = Rc::new(RefCell::new(SpoolPrinter::new(&config.out_dir)));
        let services = services.with_files(files.clone()).with_printer(printer);

        let scene = Rc::new(RefCell::new(Scene::new(config.editor.container)));
        let mut editor = Editor::new(services);
        editor.init(scene.clone())?;
        editor.install_defaults(&config.editor)?;
        log::info!("Editor ready with {} plugins", editor.plugin_names().len());
        Ok(Self { editor, scene, files })
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    fn call(&self, api: &str, args: Vec<Value>) -> Result<Value, AppError> {
        Ok(pollster::block_on(self.editor.call(api, ApiArgs::from(args)))?)
    }

    /// Load a project file. Outputs are named after it.
    pub fn open(&self, path: &Path) -> Result<(), AppError> {
        let text = std::fs::read_to_string(path)?;
        if let Some(stem) = path.file_stem() {
            self.files.borrow_mut().set_stem(stem.to_string_lossy());
        }
        self.call("loadJSON", vec![Value::String(text)])?;
        log::info!("Loaded {:?}", path);
        Ok(())
    }

    /// Pick a project through the file service and load it.
    pub fn insert(&self, path: &Path) -> Result<bool, AppError> {
        self.files.borrow_mut().add_input(path);
        Ok(!self.call("insert", vec![])?.is_null())
    }

    pub fn info(&self) -> DocumentInfo {
        let scene = self.scene.borrow();
        let (width, height, dpi) = scene
            .workspace()
            .map(|workspace| (workspace.width, workspace.height, workspace.dpi().unwrap_or_default()))
            .unwrap_or_default();
        DocumentInfo {
            width,
            height,
            dpi,
            objects: scene.objects().iter().filter(|object| !object.is_workspace()).count(),
            plugins: self.editor.plugin_names(),
        }
    }

    /// Export the workspace. Returns the written file.
    pub fn export(&self, format: ExportFormat) -> Result<PathBuf, AppError> {
        self.call(format.api(), vec![])?;
        self.files
            .borrow()
            .last_written()
            .map(Path::to_path_buf)
            .ok_or(AppError::NothingWritten)
    }

    pub fn print(&self) -> Result<(), AppError> {
        self.call("print", vec![])?;
        Ok(())
    }

    /// Copy the project JSON, or a PNG data URI of the workspace, to the clipboard.
    pub fn copy(&self, image: bool) -> Result<(), AppError> {
        let api = if image { "clipboardBase64" } else { "clipboard" };
        self.call(api, vec![])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::services::MemoryClipboard;
    use std::fs;

    const PROJECT: &str = r##"{
        "fabricData": {
            "version": "5.3.0",
            "objects": [
                { "type": "rect", "id": "workspace", "width": 200, "height": 100, "fill": "#fff" },
                { "type": "rect", "left": 10, "top": 10, "width": 50, "height": 50, "fill": "#00f" }
            ]
        },
        "metaData": { "dpi": 300 }
    }"##;

    fn session(dir: &Path) -> (App, Rc<RefCell<MemoryClipboard>>) {
        let clipboard = Rc::new(RefCell::new(MemoryClipboard::default()));
        let config = AppConfig::new(EditorConfig::default(), dir.join("out"));
        let app = App::with_services(&config, Services::default().with_clipboard(clipboard.clone())).unwrap();
        (app, clipboard)
    }

    fn project(dir: &Path) -> PathBuf {
        let path = dir.join("poster.json");
        fs::write(&path, PROJECT).unwrap();
        path
    }

    #[test]
    fn test_open_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = session(dir.path());
        app.open(&project(dir.path())).unwrap();

        let info = app.info();
        assert_eq!((info.width, info.height, info.dpi), (200.0, 100.0, 300.0));
        assert_eq!(info.objects, 1);
        assert!(info.plugins.contains(&"DocumentPlugin"));
    }

    #[test]
    fn test_exports_are_named_after_the_project() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = session(dir.path());
        app.open(&project(dir.path())).unwrap();

        let json = app.export(ExportFormat::Json).unwrap();
        assert_eq!(json, dir.path().join("out").join("poster.json"));
        let saved = easel_core::ProjectFile::parse(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(saved.meta.dpi, 300.0);
        assert_eq!(saved.canvas.objects.len(), 2);

        let svg = app.export(ExportFormat::Svg).unwrap();
        assert!(fs::read_to_string(svg).unwrap().starts_with("<svg"));

        let png_path = app.export(ExportFormat::Png).unwrap();
        let png_data = fs::read(png_path).unwrap();
        let dpi = easel_core::export::png_dpi(&png_data).unwrap().unwrap();
        assert!((dpi - 300.0).abs() < 0.1);
    }

    #[test]
    fn test_print_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let (app, clipboard) = session(dir.path());
        app.print().unwrap();
        assert!(dir.path().join("out").join("print-1.png").exists());

        app.copy(false).unwrap();
        let text = clipboard.borrow().entries[0].as_text().unwrap().to_string();
        assert!(text.contains("workspace"));
        app.copy(true).unwrap();
        let text = clipboard.borrow().entries[0].as_text().unwrap().to_string();
        assert!(text.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_insert_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = session(dir.path());
        assert!(app.insert(&project(dir.path())).unwrap());
        assert_eq!(app.info().dpi, 300.0);
        assert!(matches!(
            app.open(&dir.path().join("missing.json")),
            Err(AppError::Io(_))
        ));
    }
}
