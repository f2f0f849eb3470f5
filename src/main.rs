use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use resume_export::rendering::{light_color_from_image, ImageLoader};
use resume_export::{normalize, sanitize, CaptureDriver, Document, ExportConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "resume-export", version, about = "Snapshot and export resume documents as images")]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture an element of an HTML file as a PNG
    Capture {
        input: PathBuf,
        #[arg(long, default_value = "#resume-preview")]
        selector: String,
        #[arg(long, short, default_value = "thumbnail.png")]
        out: PathBuf,
        #[arg(long)]
        scale: Option<f32>,
        /// Leave cross-origin images out
        #[arg(long)]
        no_cors: bool,
        /// Capture as-is, without inlining computed styles or fixing colors
        #[arg(long)]
        skip_normalize: bool,
        /// Base URL for relative image sources
        #[arg(long)]
        base_url: Option<String>,
        /// API base URL; uploads the capture as the resume thumbnail
        #[arg(long, requires = "resume_id")]
        upload_to: Option<String>,
        #[arg(long)]
        resume_id: Option<String>,
        #[arg(long, env = "RESUME_API_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Inline computed styles and fix unsupported colors, then write the HTML
    Inline {
        input: PathBuf,
        #[arg(long, default_value = "#resume-preview")]
        selector: String,
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Decode a data URI (read from a file, or `-` for stdin) into a binary file
    Package {
        input: String,
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Print the light accent color of an image
    Accent { src: String },
}

fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    match path {
        Some(p) => ExportConfig::from_json_file(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(ExportConfig::default()),
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let html = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Document::parse(&html))
}

fn prepare(doc: &mut Document, selector: &str, config: &ExportConfig) -> Result<Option<resume_export::NodeId>> {
    let target = doc.query_selector(selector)?;
    if let Some(root) = target {
        let n = normalize::inline_all_computed_styles(doc, root, &config.color_policy)?;
        let fixed = sanitize::fix_unsupported_colors(doc, target, &config.color_policy)?;
        log::info!("normalized {} elements, replaced {} colors", n, fixed);
    }
    Ok(target)
}

#[cfg(feature = "remote")]
async fn upload_thumbnail(
    api: String,
    resume_id: Option<String>,
    token: Option<String>,
    file: &resume_export::PackagedFile,
) -> Result<()> {
    let id = resume_id.context("--resume-id is required for uploads")?;
    let token = token.context("an API token is required for uploads (RESUME_API_TOKEN)")?;
    let client = resume_export::UploadClient::new(api, token)?;
    let resp = client.upload_resume_images(&id, Some(file), None).await?;
    println!(
        "{}{}",
        resp.message,
        resp.thumbnail_link.map(|l| format!(": {}", l)).unwrap_or_default()
    );
    Ok(())
}

#[cfg(not(feature = "remote"))]
async fn upload_thumbnail(
    _api: String,
    _resume_id: Option<String>,
    _token: Option<String>,
    _file: &resume_export::PackagedFile,
) -> Result<()> {
    bail!("uploads need the `remote` feature")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Capture {
            input,
            selector,
            out,
            scale,
            no_cors,
            skip_normalize,
            base_url,
            upload_to,
            resume_id,
            token,
        } => {
            if let Some(s) = scale {
                config.scale = s;
            }
            if no_cors {
                config.use_cors = false;
            }
            if base_url.is_some() {
                config.base_url = base_url;
            }
            config.validate()?;

            let mut doc = read_document(&input)?;
            let target = if skip_normalize {
                doc.query_selector(&selector)?
            } else {
                prepare(&mut doc, &selector, &config)?
            };
            if target.is_none() {
                bail!("no element matches {}", selector);
            }

            let name = out
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "thumbnail.png".to_string());
            let driver = CaptureDriver::new(config)?;
            let file = driver.export_element(&mut doc, target, &name).await?;
            std::fs::write(&out, &file.bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("wrote {} ({} bytes)", out.display(), file.len());

            if let Some(api) = upload_to {
                upload_thumbnail(api, resume_id, token, &file).await?;
            }
        }
        Command::Inline { input, selector, out } => {
            let mut doc = read_document(&input)?;
            if prepare(&mut doc, &selector, &config)?.is_none() {
                bail!("no element matches {}", selector);
            }
            std::fs::write(&out, doc.outer_html(doc.root())).with_context(|| format!("writing {}", out.display()))?;
        }
        Command::Package { input, out } => {
            let text = if input == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&input).with_context(|| format!("reading {}", input))?
            };
            let name = out.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let file = resume_export::data_url_to_file(text.trim(), &name)?;
            std::fs::write(&out, &file.bytes)?;
            println!("{} ({}, {} bytes)", out.display(), file.mime, file.len());
        }
        Command::Accent { src } => {
            let loader = ImageLoader::new(&config)?;
            println!("{}", light_color_from_image(&loader, &src).await);
        }
    }
    Ok(())
}
