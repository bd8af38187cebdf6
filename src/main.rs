use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_resolver::cli::{Cli, Commands, OutputFormat};
use transcript_resolver::config::Config;
use transcript_resolver::sources::{TranscriptRequest, VideoId};
use transcript_resolver::transcribe::TranscriptionPipeline;
use transcript_resolver::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "transcript_resolver=debug"
    } else {
        "transcript_resolver=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Fetch {
            video,
            language,
            subtitle_file,
            audio_file,
            video_path,
            output,
            format,
        } => {
            let language = language.unwrap_or_else(|| config.language.clone());
            let mut request = TranscriptRequest::new(language);

            if let Some(video) = video {
                request = request.with_video_id(VideoId::parse(&video)?);
            }
            if let Some(path) = subtitle_file {
                request = request.with_subtitle_file(path);
            }
            if let Some(path) = audio_file {
                request = request.with_audio_file(path);
            }
            if let Some(path) = video_path {
                request = request.with_video_path(path);
            }

            fetch(&config, &request, output, &format, cli.quiet).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                println!("Configuration file: {}", path.display());
                println!("Run `transcript config --show` to print the active settings.");
            }
        }
        Commands::Doctor => {
            let missing = utils::check_dependencies(&config).await;
            if missing.is_empty() {
                println!("{} All transcript sources are ready", style("✓").green());
            } else {
                eprintln!("{}", style("Some transcript sources are unavailable:").yellow());
                for dep in &missing {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Sources that need them will be skipped)");
            }
        }
    }

    Ok(())
}

async fn fetch(
    config: &Config,
    request: &TranscriptRequest,
    output_path: Option<PathBuf>,
    format: &OutputFormat,
    quiet: bool,
) -> Result<()> {
    let pipeline = TranscriptionPipeline::from_config(config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::warn!("Interrupted, stopping after the current source (Ctrl-C again to abort)");
            cancel.store(true, Ordering::SeqCst);

            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    };
    progress.set_message("Resolving transcript...");

    let outcome = pipeline.resolve_with_cancel(request, &cancel).await;
    progress.finish_and_clear();

    let result = outcome?;
    tracing::info!(
        "Resolved {} segments ({}) from {}",
        result.segment_count(),
        utils::format_duration(result.total_duration()),
        result.source()
    );

    match output_path {
        Some(path) => {
            output::save_to_file(&result, &path, format).await?;
            eprintln!("Transcript saved to: {}", path.display());
        }
        None => output::print_to_console(&result, format)?,
    }

    Ok(())
}
