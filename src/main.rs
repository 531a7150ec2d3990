use anyhow::Result;
use clap::Parser;
use reelmeta::{DecoderConfig, MetadataPipeline, PipelineConfig};
use std::io::Write;
use std::path::PathBuf;

/// Print the normalized metadata record for a media file.
#[derive(Parser)]
#[command(name = "reelmeta", version, about)]
struct Cli {
    /// Media file, sidecar-annotated file, or recording container.
    file: PathBuf,

    /// Media access key for decoding recording containers.
    #[arg(long)]
    mak: Option<String>,

    /// Path to an external container decoder; discovered on PATH when
    /// omitted.
    #[arg(long)]
    tdcat: Option<PathBuf>,

    /// Print the record as JSON instead of key: value lines.
    #[arg(long)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelmeta=trace,reelmeta_dvr=trace".to_string()
        } else {
            "reelmeta=warn,reelmeta_dvr=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let decoder = DecoderConfig {
        media_access_key: cli.mak,
        external_decoder: cli.tdcat,
    }
    .discover_external();
    let pipeline = MetadataPipeline::new(PipelineConfig {
        decoder,
        ..PipelineConfig::default()
    });

    let is_recording = cli
        .file
        .extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("tivo"));
    let record = if is_recording {
        pipeline.build_from_recording(&cli.file)
    } else {
        pipeline.build_record(&cli.file, None)
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &reelmeta::dump::to_json(&record))?;
        writeln!(out)?;
    } else {
        reelmeta::dump(&mut out, &record)?;
    }
    out.flush()?;
    Ok(())
}
