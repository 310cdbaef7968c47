use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    io::{self, Read},
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use foremark_render::{Config, MediaContext};

/// Renders Foremark documents into presentation-ready XHTML.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a Foremark document
    Render {
        /// The document, or `-` for standard input
        file: PathBuf,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Prefix headings with section numbers
        #[arg(long)]
        heading_numbers: bool,
        /// Local file the document may link to (can be repeated)
        #[arg(long = "asset", value_name = "FILE")]
        assets: Vec<PathBuf>,
        /// Print the title, language, diagnostics and planned copies as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an excerpt of rendered markup
    Excerpt {
        /// The rendered markup, or `-` for standard input
        file: PathBuf,
        /// Number of characters to keep
        #[arg(long)]
        limit: usize,
    },
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    init_logger();

    match Cli::parse().command {
        Command::Render {
            file,
            config,
            heading_numbers,
            assets,
            json,
        } => {
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };
            let mut viewer = config.viewer()?;
            viewer.heading_numbers |= heading_numbers;

            let mut local_assets = config.local_assets(&file.to_string_lossy())?;
            for asset in &assets {
                let contents = fs::read(asset)
                    .with_context(|| format!("Unable to read asset {}", asset.display()))?;
                local_assets = local_assets.file(asset.to_string_lossy(), digest(&contents));
            }
            let local_assets = Arc::new(local_assets);
            let ctx = MediaContext {
                assets: Some(local_assets.clone()),
            };

            let source = read_input(&file)?;
            let rendered = futures::executor::block_on(
                foremark_render::convert_foremark_for_static_view(&source, &viewer, &ctx),
            );
            if !rendered.errors.is_empty() {
                tracing::warn!("{} problem(s) were reported in the document", rendered.errors.len());
            }

            if json {
                let output = serde_json::json!({
                    "document": rendered,
                    "copies": local_assets.planned_copies(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for copy in local_assets.planned_copies() {
                    tracing::info!("Copy {} to {}", copy.source, copy.destination);
                }
                println!("{}", rendered.html);
            }
        }
        Command::Excerpt { file, limit } => {
            let html = read_input(&file)?;
            println!("{}", foremark_render::create_excerpt_html(&html, limit));
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Unable to read standard input")?;
        Ok(input)
    } else {
        fs::read_to_string(path).with_context(|| format!("Unable to read {}", path.display()))
    }
}

/// Content digest used to name copied files.
fn digest(contents: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    contents.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn init_logger() {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_env_var("FOREMARK_LOG")
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    // Targets only matter once the level is overridden
    let with_target = std::env::var_os("FOREMARK_LOG").is_some();

    tracing_subscriber::fmt()
        .without_time()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(with_target)
        .init();
}
