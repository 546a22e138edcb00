use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use clap::{Parser, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use batchscribe::{
    run_in_background, CancelState, CancelToken, Device, JobStatus, Mode, Model, RunConfig,
    RunEvent, RunOutcome, RunSummary, WhisperEngine,
};

#[derive(Parser)]
#[command(
    name = "batchscribe",
    about = "Transcribe a media file or a whole directory to text, subtitles, and lyrics"
)]
struct Cli {
    /// File or directory to transcribe.
    #[arg(required_unless_present_any = ["list_models", "download_model"])]
    input: Option<PathBuf>,

    /// Treat the input as a directory tree (implied when the input is a directory).
    #[arg(long)]
    batch: bool,

    /// Whisper model to use.
    #[arg(short, long, default_value = "large-v3")]
    model: String,

    /// Quantization suffix for the model file (e.g. "q5_0").
    #[arg(long)]
    quantization: Option<String>,

    /// Inference device.
    #[arg(long, value_enum, default_value = "cpu")]
    device: DeviceArg,

    /// Compute type hint for the engine.
    #[arg(long, default_value = "default")]
    compute_type: String,

    /// Beam search width.
    #[arg(long, default_value = "5")]
    beam_size: u32,

    /// Enable voice activity detection.
    #[arg(long)]
    vad: bool,

    /// Enable word-level timestamps.
    #[arg(long)]
    word_timestamps: bool,

    /// Re-transcribe files whose outputs already exist.
    #[arg(long)]
    overwrite: bool,

    /// Language code (e.g. "en", "de"); auto-detected when omitted.
    #[arg(short, long)]
    language: Option<String>,

    /// Model cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print the final summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// List available models.
    #[arg(long)]
    list_models: bool,

    /// Download a model without transcribing.
    #[arg(long)]
    download_model: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    Cpu,
    Cuda,
    Rocm,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda,
            DeviceArg::Rocm => Device::Rocm,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("batchscribe=warn".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_models {
        list_models(cli.cache_dir);
        return;
    }

    if let Some(model_name) = &cli.download_model {
        let model = match parse_model(model_name) {
            Some(m) => m,
            None => {
                eprintln!("Unknown model: {model_name}");
                eprintln!("Use --list-models to see available models");
                std::process::exit(1);
            }
        };
        let cache_dir = cli
            .cache_dir
            .unwrap_or_else(batchscribe::config::default_cache_dir);
        match batchscribe::model::ensure_model(&model, cli.quantization.as_deref(), &cache_dir)
            .await
        {
            Ok(path) => println!("Model ready: {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let input = cli.input.expect("input is required");

    let model = match parse_model(&cli.model) {
        Some(m) => m,
        None => {
            eprintln!("Unknown model: {}", cli.model);
            eprintln!("Use --list-models to see available models, or provide a path to a .bin file");
            std::process::exit(1);
        }
    };

    let mode = if cli.batch || input.is_dir() {
        Mode::Batch
    } else {
        Mode::Single
    };

    let mut config = RunConfig::new(input, mode)
        .model(model)
        .device(cli.device.into())
        .compute_type(cli.compute_type)
        .beam_size(cli.beam_size)
        .vad_filter(cli.vad)
        .word_timestamps(cli.word_timestamps)
        .overwrite_existing(cli.overwrite);
    if let Some(suffix) = cli.quantization {
        config = config.quantization(suffix);
    }
    if let Some(code) = cli.language {
        config = config.language(code);
    }
    if let Some(dir) = cli.cache_dir {
        config = config.cache_dir(dir);
    }

    // Fetch the model up front so the orchestrator thread never does
    // network I/O.
    let cache_dir = config.resolve_cache_dir();
    if let Err(e) =
        batchscribe::model::ensure_model(&config.model, config.quantization.as_deref(), &cache_dir)
            .await
    {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let token = CancelToken::new();
    spawn_ctrl_c_handler(token.clone());

    let (events, handle) = run_in_background(config, WhisperEngine::new(), token);

    let joined = tokio::task::spawn_blocking(move || {
        render_events(events);
        handle.join()
    })
    .await
    .expect("render task panicked");

    let summary = match joined {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Error: orchestrator thread panicked");
            std::process::exit(1);
        }
    };

    report(&summary, cli.json);
}

fn parse_model(name: &str) -> Option<Model> {
    Model::parse_name(name).or_else(|| {
        let path = PathBuf::from(name);
        path.exists().then(|| Model::Custom(path))
    })
}

/// Escalating Ctrl-C: first finishes the current file, second cancels.
fn spawn_ctrl_c_handler(token: CancelToken) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match token.request_stop() {
                CancelState::StopAfterCurrent => {
                    eprintln!(
                        "\nStopping after the current file — press Ctrl-C again to cancel immediately"
                    );
                }
                CancelState::StopImmediate => {
                    eprintln!("\nCancelling...");
                    break;
                }
                CancelState::Running => {}
            }
        }
    });
}

/// Drain the event stream into a two-bar progress display: one bar for the
/// batch, one for the file in flight.
fn render_events(events: Receiver<RunEvent>) {
    let multi = MultiProgress::new();

    let batch_bar = multi.add(ProgressBar::new(0));
    batch_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let file_bar = multi.add(ProgressBar::new(100));
    file_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} {percent:>3}%")
            .expect("valid template"),
    );

    for event in events {
        match event {
            RunEvent::JobStatusChanged { path, status } => {
                let name = path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match status {
                    JobStatus::Processing => {
                        file_bar.set_position(0);
                        file_bar.set_message(name);
                    }
                    JobStatus::Completed => {
                        let _ = multi.println(format!("done     {name}"));
                    }
                    JobStatus::Skipped => {
                        let _ = multi.println(format!("skipped  {name}"));
                    }
                    JobStatus::Error => {
                        let _ = multi.println(format!("failed   {name}"));
                    }
                    JobStatus::Pending => {}
                }
            }
            RunEvent::JobProgressChanged { percent, .. } => {
                file_bar.set_position(percent.round() as u64);
            }
            RunEvent::BatchProgressChanged {
                processed,
                total,
                eta_secs,
            } => {
                batch_bar.set_length(total as u64);
                batch_bar.set_position(processed as u64);
                batch_bar.set_message(match eta_secs {
                    Some(secs) => format!("ETA {}", format_duration(secs)),
                    None => "ETA --:--".into(),
                });
            }
            RunEvent::RunFinished(_) => {}
        }
    }

    file_bar.finish_and_clear();
    batch_bar.finish_and_clear();
}

fn report(summary: &RunSummary, json: bool) {
    if json {
        match summary.to_json_pretty() {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("JSON error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let suffix = match summary.outcome {
        RunOutcome::Finished => "",
        RunOutcome::StoppedAfterCurrent => " (stopped after current file)",
        RunOutcome::Cancelled => " (cancelled)",
        RunOutcome::LoadFailed => " (model load failed)",
    };
    eprintln!(
        "{} completed, {} skipped, {} failed of {} files{suffix}",
        summary.completed, summary.skipped, summary.errored, summary.total
    );
}

fn format_duration(secs: f64) -> String {
    let secs = secs.round() as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

fn list_models(cache_dir: Option<PathBuf>) {
    let models = [
        ("tiny", "75 MB"),
        ("tiny.en", "75 MB"),
        ("base", "142 MB"),
        ("base.en", "142 MB"),
        ("small", "466 MB"),
        ("small.en", "466 MB"),
        ("medium", "1.5 GB"),
        ("medium.en", "1.5 GB"),
        ("large-v2", "2.9 GB"),
        ("large-v3", "2.9 GB"),
        ("large-v3-turbo", "~1.6 GB"),
    ];
    println!("{:<16} {}", "MODEL", "SIZE");
    println!("{:<16} {}", "-----", "----");
    for (name, size) in models {
        println!("{name:<16} {size}");
    }

    let cache_dir = cache_dir.unwrap_or_else(batchscribe::config::default_cache_dir);
    let cached = batchscribe::model::list_cached_models(&cache_dir);
    if !cached.is_empty() {
        println!("\nCached models in {}:", cache_dir.display());
        for path in cached {
            let size = std::fs::metadata(&path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_default();
            println!(
                "  {} ({})",
                path.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size
            );
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.0} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1_000.0)
    }
}
