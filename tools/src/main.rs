use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codec::default_registries;
use tools::{
    collect_frame_entries, decode_frame_json, format_decode_pretty, inspect_frame, sort_by_size,
    InspectReport,
};
use wire::Limits;

#[derive(Parser)]
#[command(
    name = "tether-tools",
    version,
    about = "tether frame inspection and decoding tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect frame structure and sizes.
    Inspect {
        /// Path to a frame capture, or a directory of captures.
        frame_path: PathBuf,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected frames.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected frames (after sorting).
        #[arg(long)]
        limit: Option<usize>,
        /// Emit one JSON object per frame.
        #[arg(long)]
        json: bool,
    },
    /// Decode a payload frame into structured output.
    Decode {
        /// Path to the frame bytes.
        frame_file: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value_t = DecodeFormat::Json)]
        format: DecodeFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecodeFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let limits = Limits::default();
    match cli.command {
        Command::Inspect {
            frame_path,
            glob,
            sort,
            limit,
            json,
        } => {
            if frame_path.is_dir() {
                let mut entries = collect_frame_entries(&frame_path, glob.as_deref())?;
                if let Some(InspectSort::Size) = sort {
                    sort_by_size(&mut entries);
                }
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                for entry in entries {
                    let report = inspect_path(&entry.path, &limits)?;
                    if !json {
                        println!("== {} ({} bytes) ==", entry.path.display(), entry.size);
                    }
                    print_inspect_report(&report, json)?;
                }
            } else {
                let report = inspect_path(&frame_path, &limits)?;
                print_inspect_report(&report, json)?;
            }
        }
        Command::Decode { frame_file, format } => {
            let bytes = fs::read(&frame_file)
                .with_context(|| format!("read frame {}", frame_file.display()))?;
            let registries = default_registries().context("build payload registries")?;
            let output = decode_frame_json(&bytes, &registries, &limits)?;
            match format {
                DecodeFormat::Json => {
                    let json = serde_json::to_string_pretty(&output).context("serialize json")?;
                    println!("{json}");
                }
                DecodeFormat::Pretty => {
                    print!("{}", format_decode_pretty(&output));
                }
            }
        }
    }
    Ok(())
}

fn inspect_path(path: &Path, limits: &Limits) -> Result<InspectReport> {
    let bytes = fs::read(path).with_context(|| format!("read frame {}", path.display()))?;
    inspect_frame(&bytes, limits).with_context(|| format!("inspect {}", path.display()))
}

fn print_inspect_report(report: &InspectReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report).context("serialize json")?);
        return Ok(());
    }
    println!(
        "header: {} (0x{:02x}) frame: {} bytes",
        report.header, report.header_byte, report.frame_bytes
    );
    if let Some(session_id) = report.session_id {
        println!("session: {session_id}");
    }
    if let Some(type_id) = &report.type_id {
        println!("type: {type_id}");
    }
    if report.route_bytes > 0 {
        println!("route: {} bytes", report.route_bytes);
    }
    if let Some(body) = report.body_bytes {
        println!("body: {body} bytes");
    }
    if let Some(message) = &report.message {
        println!("message: {message}");
    }
    if let (Some(peer), Some(fingerprint)) = (&report.peer_id, report.fingerprint) {
        println!("peer: {peer} fingerprint: 0x{fingerprint:016x}");
    }
    Ok(())
}
