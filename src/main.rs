use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thumbforge::pipeline::{Engine, OutputSink};
use thumbforge::types::ImageSource;
use thumbforge::{batch, config, output};

#[derive(Parser)]
#[command(name = "thumbforge")]
#[command(about = "Composite 1920x1080 blog thumbnails")]
#[command(long_about = "\
Composite 1920x1080 blog thumbnails

A thumbnail is a blurred background photo, a bold white title of at most two
lines, and an optional row of icons near the bottom. Sources may be local
files, http(s) URLs or base64 data URLs.

  thumbforge generate -b desk.jpg -t \"Python Tutorial for Beginners\" \\
      -i python.png -i https://example.com/vscode.png -o python.png

Run 'thumbforge gen-config' to generate a documented thumbforge.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composite one thumbnail
    Generate {
        /// Background image: path, URL or data URL
        #[arg(short, long)]
        background: ImageSource,
        /// Title text
        #[arg(short, long)]
        title: String,
        /// Icon image, repeatable; drawn left to right in the given order
        #[arg(short, long = "icon")]
        icons: Vec<ImageSource>,
        /// Output PNG
        #[arg(short, long, default_value = "thumbnail.png")]
        output: PathBuf,
        /// Also write <stem>_layers/ with the background, title info and icons
        #[arg(long)]
        layers: bool,
        /// Print a data:image/png;base64 URL instead of writing a file
        #[arg(long, conflicts_with_all = ["output", "layers"])]
        data_url: bool,
    },
    /// Run every [[job]] of a job file in parallel
    Batch {
        /// Job file (TOML)
        jobs: PathBuf,
    },
    /// Show how a title would be sized and broken, without rendering
    Layout {
        /// Title text
        title: String,
    },
    /// Print a stock thumbforge.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("thumbforge=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            background,
            title,
            icons,
            output: path,
            layers,
            data_url,
        } => {
            let engine = Engine::new(config::load_config(&cli.config)?)?;
            let sink = if data_url {
                OutputSink::Memory
            } else {
                OutputSink::Png { path, layers }
            };
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_pipeline_event(&event) {
                        eprintln!("{}", line);
                    }
                }
            });
            let result = engine.generate(&background, &title, &icons, &sink, Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;
            let artifacts = result?;
            if data_url {
                println!("{}", artifacts.thumbnail.to_data_url()?);
            }
        }
        Command::Batch { jobs } => {
            let engine_config = config::load_config(&cli.config)?;
            init_thread_pool(&engine_config.processing);
            let jobs = batch::load_jobs(&jobs)?;
            let engine = Engine::new(engine_config)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let outcomes = batch::run_jobs(&engine, &jobs, Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;
            output::print_batch_summary(&outcomes);
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            if failed > 0 {
                return Err(format!("{} of {} jobs failed", failed, outcomes.len()).into());
            }
        }
        Command::Layout { title } => {
            let engine = Engine::new(config::load_config(&cli.config)?)?;
            println!("Font: {}", engine.typeface().origin());
            output::print_title_layout(&engine.layout(&title)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
