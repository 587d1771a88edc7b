//! Command line entry point.

use clap::{Parser, Subcommand};
use easel_app::{App, AppConfig, AppError, ExportFormat};
use easel_core::EditorConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "easel", version, about = "Load, export and print Easel projects")]
struct Cli {
    /// Editor configuration (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for exports and print jobs.
    #[arg(long, global = true, default_value = ".")]
    out: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the workspace size and object count.
    Info { file: PathBuf },
    /// Export the workspace.
    Export {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "png")]
        format: ExportFormat,
    },
    /// Send the workspace to the print spool.
    Print { file: PathBuf },
    /// Copy the project to the system clipboard.
    Clipboard {
        file: PathBuf,
        /// Copy a PNG data URI instead of the JSON document.
        #[arg(long)]
        image: bool,
    },
}

fn run(cli: Cli) -> Result<(), AppError> {
    let editor = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let app = App::new(&AppConfig::new(editor, &cli.out))?;

    match cli.command {
        Command::Info { file } => {
            app.open(&file)?;
            let info = app.info();
            println!("workspace: {}x{} @ {} dpi", info.width, info.height, info.dpi);
            println!("objects:   {}", info.objects);
            println!("plugins:   {}", info.plugins.join(", "));
        }
        Command::Export { file, format } => {
            app.open(&file)?;
            let path = app.export(format)?;
            println!("{}", path.display());
        }
        Command::Print { file } => {
            app.open(&file)?;
            app.print()?;
        }
        Command::Clipboard { file, image } => {
            app.open(&file)?;
            app.copy(image)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting Easel");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
