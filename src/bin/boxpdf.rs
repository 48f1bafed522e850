//! CLI binary for boxpdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DownloadConfig` and prints results.

use anyhow::{Context, Result};
use boxpdf::{
    resolve_source, run, Assembler, DownloadConfig, ProgressCallback, RunOutput,
    RunProgressCallback, Source, Stage,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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

/// Terminal progress: a spinner while Chrome loads the preview, a bar once
/// the page count is known, and one log line per missed page or stage.
struct CliProgressCallback {
    bar: ProgressBar,
    missed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening preview…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            missed: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.reset_eta();
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_capture_start(&self, expected: Option<usize>) {
        self.bar.set_prefix("Capturing");
        match expected {
            Some(total) => {
                self.activate_bar(total);
                self.bar.println(format!(
                    "{} {}",
                    cyan("◆"),
                    bold(&format!("Capturing {total} pages…"))
                ));
            }
            None => {
                self.bar.set_message("page count unknown");
                self.bar.println(format!("{} {}", cyan("◆"), bold("Capturing pages…")));
            }
        }
    }

    fn on_page_captured(&self, page_num: usize, expected: Option<usize>, bytes: usize) {
        if expected.is_none() {
            self.bar.set_message(format!("page {page_num}"));
        }
        self.bar.println(format!(
            "  {} Page {:>4}  {}",
            green("✓"),
            page_num,
            dim(&format!("{:>7} KB", bytes / 1024)),
        ));
        self.bar.inc(1);
    }

    fn on_page_missed(&self, target_page: usize, error: &str) {
        self.missed.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>4}  {}",
            red("✗"),
            target_page,
            red(error)
        ));
    }

    fn on_capture_complete(&self, captured: usize) {
        let missed = self.missed.load(Ordering::SeqCst);
        if missed == 0 {
            self.bar.println(format!(
                "{} {} pages captured",
                green("✔"),
                bold(&captured.to_string())
            ));
        } else {
            self.bar.println(format!(
                "{} {} pages captured  ({} missed)",
                cyan("⚠"),
                bold(&captured.to_string()),
                red(&missed.to_string())
            ));
        }
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        self.bar.set_style(spinner_style);
        self.bar.set_prefix("Finishing");
        self.bar.set_message("");
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Save a shared link as dl_files/<title>.pdf
  boxpdf https://app.box.com/s/abc123

  # First 10 pages only, grayscale, custom folder
  boxpdf --max-pages 10 -g -o ~/Downloads https://app.box.com/s/abc123

  # Add a searchable text layer (needs ocrmypdf)
  boxpdf --ocr --ocr-lang eng+fra https://app.box.com/s/abc123

  # Rebuild the PDF from images captured earlier
  boxpdf --from-images "dl_files/Quarterly Report"

  # Keep only the PDF
  boxpdf --delete-images https://app.box.com/s/abc123

  # Debug a preview that never loads: show the browser
  boxpdf --headful --wait-time 60 -v https://app.box.com/s/abc123

OUTPUT:
  <out>/<title>/page_0001.png …   captured page images
  <out>/<title>.pdf               assembled PDF
  <out>/<title>_ocr.pdf           with --ocr

EXTERNAL TOOLS:
  Chrome or Chromium   required for links (auto-detected, or --chrome-path)
  ocrmypdf             --ocr            brew install ocrmypdf / apt install ocrmypdf
  img2pdf              --assembler img2pdf   pip install img2pdf

ENVIRONMENT VARIABLES:
  Every flag can also be set as BOXPDF_<FLAG>, e.g. BOXPDF_OUT, BOXPDF_OCR_LANG.
  RUST_LOG             Override the log filter (e.g. RUST_LOG=boxpdf=debug)
"#;

/// Save a Box.com shared-link preview as a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "boxpdf",
    version,
    about = "Save a Box.com shared-link preview as a PDF",
    long_about = "Open a Box.com shared link in Chrome, capture every rendered page as an image, \
and assemble the images into one PDF. Optionally converts pages to grayscale and adds an OCR \
text layer with ocrmypdf.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Box.com shared link (https://app.box.com/s/...).
    #[arg(env = "BOXPDF_URL", required_unless_present = "from_images")]
    url: Option<String>,

    /// Skip capture and build the PDF from page_* images in this directory.
    #[arg(short = 'i', long, env = "BOXPDF_FROM_IMAGES", conflicts_with = "url")]
    from_images: Option<PathBuf>,

    /// Output folder for images and PDFs.
    #[arg(short, long, env = "BOXPDF_OUT", default_value = "dl_files")]
    out: PathBuf,

    /// Capture at most this many pages.
    #[arg(long, env = "BOXPDF_MAX_PAGES",
          value_parser = clap::value_parser!(u64).range(1..))]
    max_pages: Option<u64>,

    /// Seconds to wait for the preview to load.
    #[arg(long, env = "BOXPDF_WAIT_TIME", default_value_t = 15)]
    wait_time: u64,

    /// Pause unit between pages, in seconds.
    #[arg(long, env = "BOXPDF_SCROLL_PAUSE", default_value_t = 1.5)]
    scroll_pause: f64,

    /// Chrome or Chromium executable. Auto-detected if not set.
    #[arg(long, env = "BOXPDF_CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Show the browser window.
    #[arg(long, env = "BOXPDF_HEADFUL")]
    headful: bool,

    /// Launch Chrome with --no-sandbox (needed in some containers).
    #[arg(long, env = "BOXPDF_NO_SANDBOX")]
    no_sandbox: bool,

    /// Capture images only, do not create a PDF.
    #[arg(long, env = "BOXPDF_NO_PDF")]
    no_pdf: bool,

    /// Delete the page images once the PDF exists.
    #[arg(long, visible_alias = "no-keep-images", env = "BOXPDF_DELETE_IMAGES")]
    delete_images: bool,

    /// Convert pages to grayscale before assembly.
    #[arg(short, long, env = "BOXPDF_GRAYSCALE")]
    grayscale: bool,

    /// Add a text layer with ocrmypdf (writes <title>_ocr.pdf).
    #[arg(long, env = "BOXPDF_OCR")]
    ocr: bool,

    /// OCR language(s), e.g. eng or eng+fra.
    #[arg(long, env = "BOXPDF_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Parallel OCR jobs.
    #[arg(long, env = "BOXPDF_OCR_JOBS", default_value_t = 4)]
    ocr_jobs: usize,

    /// PDF backend.
    #[arg(long, env = "BOXPDF_ASSEMBLER", value_enum, default_value = "native")]
    assembler: AssemblerArg,

    /// Do not probe the link over HTTP before launching Chrome.
    #[arg(long, env = "BOXPDF_SKIP_PREFLIGHT")]
    skip_preflight: bool,

    /// Print the run result as JSON on stdout.
    #[arg(long, env = "BOXPDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BOXPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BOXPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BOXPDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum AssemblerArg {
    Native,
    Img2pdf,
}

impl From<AssemblerArg> for Assembler {
    fn from(v: AssemblerArg) -> Self {
        match v {
            AssemblerArg::Native => Assembler::Native,
            AssemblerArg::Img2pdf => Assembler::Img2Pdf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let source = resolve_source(cli.url.as_deref(), cli.from_images.as_deref())
        .context("Invalid input")?;

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as Arc<dyn RunProgressCallback>),
    )?;

    let result = run(&source, &config).await;
    if let Some(ref cb) = progress {
        cb.clear();
    }
    let output = result.with_context(|| match &source {
        Source::Viewer(url) => format!("Download of {url} failed"),
        Source::Images(dir) => format!("Building a PDF from {} failed", dir.display()),
    })?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }
    Ok(())
}

fn print_summary(output: &RunOutput) {
    let stats = &output.stats;
    let pages = match stats.detected_pages {
        Some(d) => format!("{}/{} pages", stats.page_count, d),
        None => format!("{} pages", stats.page_count),
    };
    eprintln!(
        "{}  {}  {}ms",
        if stats.missed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        pages,
        stats.total_duration_ms
    );
    if stats.missed_pages > 0 {
        eprintln!("   {} pages could not be captured", red(&stats.missed_pages.to_string()));
    }
    if let Some(ref pdf) = output.pdf_path {
        eprintln!("   PDF      →  {}", bold(&pdf.display().to_string()));
    }
    if let Some(ref pdf) = output.ocr_pdf_path {
        eprintln!("   OCR PDF  →  {}", bold(&pdf.display().to_string()));
    }
    if output.images_deleted {
        eprintln!("   {}", dim("page images deleted"));
    } else {
        eprintln!(
            "   images   →  {}",
            dim(&output.image_dir.display().to_string())
        );
    }
}

/// Map CLI args to `DownloadConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DownloadConfig> {
    let scroll_pause = Duration::try_from_secs_f64(cli.scroll_pause)
        .with_context(|| format!("Invalid --scroll-pause {}", cli.scroll_pause))?;
    let mut builder = DownloadConfig::builder()
        .output_dir(&cli.out)
        .wait_time(Duration::from_secs(cli.wait_time))
        .scroll_pause(scroll_pause)
        .headless(!cli.headful)
        .no_sandbox(cli.no_sandbox)
        .make_pdf(!cli.no_pdf)
        .keep_images(!cli.delete_images)
        .grayscale(cli.grayscale)
        .ocr(cli.ocr)
        .ocr_language(&cli.ocr_lang)
        .ocr_jobs(cli.ocr_jobs)
        .assembler(cli.assembler.clone().into())
        .preflight(!cli.skip_preflight);

    if let Some(n) = cli.max_pages {
        builder = builder.max_pages(n as usize);
    }
    if let Some(ref path) = cli.chrome_path {
        builder = builder.chrome_executable(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid options")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_map_to_library_defaults() {
        let cli = Cli::try_parse_from(["boxpdf", "https://app.box.com/s/abc"]).unwrap();
        let config = build_config(&cli, None).unwrap();
        let default = DownloadConfig::default();
        assert_eq!(config.output_dir, default.output_dir);
        assert_eq!(config.wait_time, default.wait_time);
        assert_eq!(config.scroll_pause, default.scroll_pause);
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.ocr_jobs, 4);
        assert!(config.headless && config.make_pdf && config.keep_images && config.preflight);
    }

    #[test]
    fn url_and_from_images_conflict() {
        assert!(Cli::try_parse_from(["boxpdf", "https://app.box.com/s/a", "-i", "dir"]).is_err());
        assert!(Cli::try_parse_from(["boxpdf", "-i", "dir"]).is_ok());
    }

    #[test]
    fn no_keep_images_alias() {
        let cli =
            Cli::try_parse_from(["boxpdf", "--no-keep-images", "https://app.box.com/s/a"]).unwrap();
        assert!(cli.delete_images);
    }

    #[test]
    fn unrepresentable_scroll_pause_is_an_error() {
        for bad in ["inf", "NaN", "-1", "1e300"] {
            let flag = format!("--scroll-pause={bad}");
            let cli = Cli::try_parse_from(["boxpdf", flag.as_str(), "https://app.box.com/s/a"])
                .unwrap();
            assert!(build_config(&cli, None).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn ocr_without_pdf_is_rejected() {
        let cli = Cli::try_parse_from(["boxpdf", "--ocr", "--no-pdf", "https://app.box.com/s/a"])
            .unwrap();
        assert!(build_config(&cli, None).is_err());
    }
}
