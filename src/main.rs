use clap::{Parser, Subcommand};
use media_pipeline::config::{self, MediaConfig};
use media_pipeline::format::{ADMIN, REFERENCE, applies_to_context};
use media_pipeline::imaging::RustBackend;
use media_pipeline::media::Media;
use media_pipeline::output;
use media_pipeline::pool::Pool;
use media_pipeline::provider::MediaProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that address one media.
#[derive(clap::Args, Clone)]
struct MediaArgs {
    /// Media identifier
    #[arg(long)]
    id: String,

    /// Context the media belongs to (defaults to the configured default context)
    #[arg(long)]
    context: Option<String>,

    /// Provider storing the media
    #[arg(long, default_value = "image")]
    provider: String,
}

#[derive(Parser)]
#[command(name = "media-pipeline")]
#[command(about = "Store uploads, generate thumbnails and build their public URLs")]
#[command(long_about = "\
Store uploads, generate thumbnails and build their public URLs

Every media belongs to a context, and every context declares the formats
generated for it. Originals are stored under a path derived from the media
id, next to one thumbnail per format:

  uploads/
  └── default/0001/01/
      ├── 3f2a…e1.jpg                  # original, named by content digest
      ├── thumb_1_admin.jpg            # admin format, every context
      ├── thumb_1_default_small.jpg
      └── thumb_1_default_big.jpg

Run 'media-pipeline gen-config' to generate a documented media.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./media.toml, then stock defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log lifecycle steps (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List contexts and their formats
    Formats {
        /// Only show this context
        #[arg(long)]
        context: Option<String>,
    },
    /// Show the storage path and public URLs of a media
    Path(MediaArgs),
    /// Store a file and generate its thumbnails
    Ingest {
        /// Image to store
        file: PathBuf,

        #[command(flatten)]
        media: MediaArgs,
    },
    /// Print a stock media.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let media_config = match &cli.config {
        Some(path) => MediaConfig::load(path)?,
        None => config::load_config(Path::new("."))?,
    };
    init_thread_pool(&media_config.processing);
    let pool = media_config.build_pool(Arc::new(RustBackend::new()))?;

    match cli.command {
        Command::Formats { context } => {
            output::print_formats_output(&pool, context.as_deref(), &media_config.admin_format);
        }
        Command::Path(args) => {
            let (provider, media) = resolve(&pool, &args)?;
            let path = provider.generate_path(&media)?;
            let urls = public_urls(provider.as_ref(), &media)?;
            output::print_path_output(&path, &urls);
        }
        Command::Ingest { file, media: args } => {
            let (provider, media) = resolve(&pool, &args)?;
            let name = file
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut media = media.with_upload(name, std::fs::read(&file)?);

            provider.transform(&mut media)?;
            pool.validate_upload_dimensions(&media)?;
            provider.post_persist(&mut media)?;

            let reference = provider.reference_image(&media)?;
            let reference_url = provider.generate_public_url(&media, REFERENCE)?;
            let mut urls = vec![(REFERENCE.to_string(), reference_url)];
            urls.extend(public_urls(provider.as_ref(), &media)?);
            output::print_ingest_output(&media, &reference, &urls);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Install the `tracing` subscriber: `RUST_LOG` wins, then `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "media_pipeline=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn resolve(
    pool: &Pool,
    args: &MediaArgs,
) -> Result<(Arc<dyn MediaProvider>, Media), Box<dyn std::error::Error>> {
    let provider = pool.get_provider(&args.provider)?;
    let context = args
        .context
        .clone()
        .unwrap_or_else(|| pool.default_context().to_string());
    if !pool.has_context(&context) {
        return Err(format!("Context \"{context}\" does not exist").into());
    }
    Ok((provider, Media::new(args.id.as_str(), context, args.provider.as_str())))
}

/// Public URL of every format generated for the media's context.
fn public_urls(
    provider: &dyn MediaProvider,
    media: &Media,
) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let context = media.context.as_deref().unwrap_or_default();
    let mut urls = Vec::new();
    for format in provider.formats().names() {
        if format == ADMIN || applies_to_context(format, context) {
            urls.push((format.to_string(), provider.generate_public_url(media, format)?));
        }
    }
    Ok(urls)
}
