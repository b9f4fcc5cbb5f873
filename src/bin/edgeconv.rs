//! CLI binary for edgequake-convert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_convert::{
    convert, inspect, write_output, ConversionConfig, ConversionKind, ConversionProgressCallback,
    ProgressCallback, ProgressUnit,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the unit count is known,
/// then a bar over pages, attempts or blocks.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Unit name shown next to the counter.
    unit: std::sync::Mutex<&'static str>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening source…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            unit: std::sync::Mutex::new("units"),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, unit: &'static str, total: usize) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>4}}/{{len}} {unit}  ⏱ {{elapsed_precise}}"
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        if let Ok(mut u) = self.unit.lock() {
            *u = unit;
        }
    }

    fn unit_name(&self) -> &'static str {
        self.unit.lock().map(|u| *u).unwrap_or("units")
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, unit: ProgressUnit, total: usize) {
        let name = match unit {
            ProgressUnit::Page => "pages",
            ProgressUnit::Attempt => "attempts",
            ProgressUnit::Block => "blocks",
        };
        self.activate_bar(name, total);
        // Audio runs to thousands of blocks; only pages and attempts get a line each.
        if unit != ProgressUnit::Block {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Processing up to {total} {name}…"))
            ));
        }
    }

    fn on_unit_start(&self, n: usize, _total: usize) {
        self.bar.set_message(format!("#{n}"));
    }

    fn on_unit_complete(&self, n: usize, total: usize, bytes: usize) {
        if self.unit_name() != "blocks" {
            self.bar.println(format!(
                "  {} {:>4}/{:<4}  {}",
                green("✓"),
                n,
                total,
                dim(&format!("{bytes:>9} bytes")),
            ));
        }
        self.bar.inc(1);
    }

    fn on_unit_error(&self, n: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}",
            red("✗"),
            n,
            total,
            red(&msg)
        ));
    }

    fn on_conversion_complete(&self, units: usize, output_bytes: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!(
                "{} {} {} processed, {} bytes",
                green("✔"),
                bold(&units.to_string()),
                self.unit_name(),
                output_bytes
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress a photo under 800 KiB
  edgeconv compress holiday.png

  # Compress under 300 KiB, longest edge 1200 px
  edgeconv compress holiday.png --target-kib 300 --max-dimension 1200

  # PDF to Word (scanned pages are embedded as images)
  edgeconv word contract.pdf -o out/contract.doc

  # PDF to CSV, one row per text baseline
  edgeconv table invoice.pdf

  # PDF to slides, one page per slide
  edgeconv slides deck.pdf

  # PDF to JPEG (1 page) or a ZIP of JPEGs (several pages)
  edgeconv images brochure.pdf

  # Extract the soundtrack of a video as MP3
  edgeconv audio talk.mp4

  # Classify pages without converting
  edgeconv word scan.pdf --inspect-only --json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH       Path to libpdfium (file or directory)
  EDGECONV_OUTPUT       Default output path
  EDGECONV_PASSWORD     PDF user password
  EDGECONV_TARGET_KIB   Compression target in KiB
  EDGECONV_MAX_DIMENSION  Longest edge before compression, in px
  EDGECONV_MAX_AUDIO_MIB  Largest accepted video source, in MiB
  RUST_LOG              Override log filtering (e.g. edgequake_convert=debug)
"#;

/// Convert images, PDFs and videos into documents, tables, slides, images or audio.
#[derive(Parser, Debug)]
#[command(
    name = "edgeconv",
    version,
    about = "Convert images, PDFs and videos into documents, tables, slides, images or audio",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Conversion to run.
    #[arg(value_enum)]
    kind: KindArg,

    /// Source file.
    input: PathBuf,

    /// Output path. Defaults to the suggested name in the current directory.
    #[arg(short, long, env = "EDGECONV_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "EDGECONV_PASSWORD")]
    password: Option<String>,

    /// Compression byte budget in KiB.
    #[arg(long, env = "EDGECONV_TARGET_KIB", default_value_t = 800,
          value_parser = clap::value_parser!(u64).range(1..))]
    target_kib: u64,

    /// Longest image edge before compression, in pixels.
    #[arg(long, env = "EDGECONV_MAX_DIMENSION", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_dimension: u32,

    /// Largest accepted video source, in MiB.
    #[arg(long, env = "EDGECONV_MAX_AUDIO_MIB", default_value_t = 50)]
    max_audio_mib: u64,

    /// Print a JSON report instead of the summary line.
    #[arg(long, env = "EDGECONV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EDGECONV_NO_PROGRESS")]
    no_progress: bool,

    /// Describe the source only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EDGECONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EDGECONV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Compress,
    Word,
    Table,
    Slides,
    Images,
    Audio,
}

impl From<KindArg> for ConversionKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Compress => ConversionKind::ImageCompress,
            KindArg::Word => ConversionKind::PdfToWord,
            KindArg::Table => ConversionKind::PdfToTable,
            KindArg::Slides => ConversionKind::PdfToSlides,
            KindArg::Images => ConversionKind::PdfToImages,
            KindArg::Audio => ConversionKind::VideoToAudio,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the progress bar, so they are only
    // shown when the bar is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let kind = ConversionKind::from(cli.kind);

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect(&cli.input, &config)
            .await
            .with_context(|| format!("Failed to inspect {}", cli.input.display()))?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            println!("File:    {}", summary.name);
            println!("Kind:    {}", summary.kind);
            println!("Size:    {} bytes", summary.size);
            if let (Some(w), Some(h)) = (summary.width, summary.height) {
                println!("Pixels:  {w}×{h}");
            }
            if let Some(pages) = summary.pages {
                let text = summary
                    .page_kinds
                    .iter()
                    .filter(|k| **k == edgequake_convert::PageKind::NativeText)
                    .count();
                println!("Pages:   {pages} ({text} text, {} scanned)", pages - text);
            }
            if let Some(mode) = summary.mode {
                println!("Mode:    {mode:?}");
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let started = Instant::now();
    let result = convert(&cli.input, kind, &config)
        .await
        .with_context(|| format!("{kind} failed for {}", cli.input.display()))?;
    let report = result.report();
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&result.suggested_name));
    write_output(&output_path, result.bytes)
        .await
        .context("Failed to write output")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        let fallback = report
            .details
            .as_ref()
            .is_some_and(|d| d.used_image_fallback());
        eprintln!(
            "{}  {} bytes  {}ms  →  {}",
            green("✔"),
            report.size,
            started.elapsed().as_millis(),
            bold(&output_path.display().to_string()),
        );
        if fallback {
            eprintln!(
                "   {}",
                cyan("no text layer found: pages were embedded as images")
            );
        }
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .target_bytes(cli.target_kib.saturating_mul(1024))
        .max_dimension(cli.max_dimension)
        .max_audio_source_bytes(cli.max_audio_mib.saturating_mul(1024 * 1024));
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}
