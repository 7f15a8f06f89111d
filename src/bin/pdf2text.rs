//! CLI binary for edgequake-pdf2text.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` / `ChatConfig`, prints results, and runs the
//! interactive chat loop.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2text::chat::{self, is_exit_command};
use edgequake_pdf2text::extract::write_text_atomic;
use edgequake_pdf2text::{
    ChatConfig, ConversationLog, ExtractionConfig, ExtractionProgressCallback, ExtractionReport,
    Extractor, OcrEngineKind, ProgressCallback, StrategyKind,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
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

/// Terminal progress: one spinner line showing the current document,
/// strategy and page, plus a log line per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
    strategy_started: Mutex<Option<Instant>>,
    documents: AtomicUsize,
    empty: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            strategy_started: Mutex::new(None),
            documents: AtomicUsize::new(0),
            empty: AtomicUsize::new(0),
        })
    }

    fn strategy_elapsed(&self) -> f64 {
        self.strategy_started
            .lock()
            .ok()
            .and_then(|started| started.map(|t| t.elapsed().as_secs_f64()))
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        let done = self.documents.load(Ordering::SeqCst);
        let empty = self.empty.load(Ordering::SeqCst);
        if empty == 0 {
            eprintln!("{} {} document(s) extracted", green("✔"), bold(&done.to_string()));
        } else {
            eprintln!(
                "{} {}/{} document(s) extracted  ({} without text)",
                if empty == done { red("✘") } else { cyan("⚠") },
                bold(&(done - empty).to_string()),
                done,
                red(&empty.to_string()),
            );
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, path: &Path) {
        self.bar.set_prefix(file_label(path));
        self.bar.set_message("validating…");
    }

    fn on_strategy_start(&self, strategy: &str, _total_pages: Option<usize>) {
        if let Ok(mut started) = self.strategy_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("{strategy}…"));
    }

    fn on_page_complete(&self, strategy: &str, page_num: usize, total_pages: usize, _chars: usize) {
        self.bar
            .set_message(format!("{strategy}  page {page_num}/{total_pages}"));
    }

    fn on_page_error(&self, strategy: &str, page_num: usize, total_pages: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {strategy} page {page_num:>3}/{total_pages:<3}  {}",
            red("✗"),
            dim(&msg)
        ));
    }

    fn on_strategy_fallthrough(&self, strategy: &str, reason: &str) {
        self.bar.println(format!(
            "  {} {:<7} {}  {}",
            cyan("↓"),
            strategy,
            dim(reason.lines().next().unwrap_or(reason)),
            dim(&format!("{:.1}s", self.strategy_elapsed())),
        ));
    }

    fn on_document_complete(&self, path: &Path, strategy: Option<&str>, chars: usize) {
        self.documents.fetch_add(1, Ordering::SeqCst);
        match strategy {
            Some(name) => self.bar.println(format!(
                "{} {}  {}  {}",
                green("✓"),
                bold(&file_label(path)),
                dim(&format!("{chars} chars via {name}")),
                dim(&format!("{:.1}s", self.strategy_elapsed())),
            )),
            None => {
                self.empty.fetch_add(1, Ordering::SeqCst);
                self.bar.println(format!(
                    "{} {}  {}",
                    red("✘"),
                    bold(&file_label(path)),
                    red("no text")
                ));
            }
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one file to stdout
  pdf2text extract scan.pdf

  # Extract to a file, text layer only
  pdf2text extract report.pdf -o report.txt --strategies layout,basic

  # Every PDF in a folder, one .txt each
  pdf2text extract ./invoices -o ./invoices-txt

  # OCR through a local vision model instead of tesseract
  pdf2text extract scan.pdf --ocr-engine vision

  # Full report as JSON
  pdf2text extract scan.pdf --json > report.json

  # Ask questions about one or more documents
  pdf2text chat contract.pdf annex.pdf --model llama3.2

STRATEGIES (tried in order, first non-empty result wins):
  ocr      rasterise pages with pdfium, recognise with tesseract or a vision LLM
  layout   pdfium text layer, pages in parallel
  basic    lopdf text layer, no native dependencies

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  EDGEQUAKE_LLM_PROVIDER  Provider for vision OCR and chat (default: ollama)
  EDGEQUAKE_MODEL         Model for vision OCR and chat
  RUST_LOG                Overrides the log filter
"#;

/// Extract text from PDFs and chat about them.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2text",
    version,
    about = "Extract plain text from PDFs with an OCR → layout → basic fallback chain",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2TEXT_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDF2TEXT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the text of a PDF file or of every PDF in a folder.
    Extract(ExtractArgs),
    /// Load PDFs into the conversation and answer questions from stdin.
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// PDF file, or a folder of PDFs.
    input: PathBuf,

    /// Output file (or directory when INPUT is a folder). Default: stdout.
    #[arg(short, long, env = "PDF2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the full extraction report as JSON.
    #[arg(long, env = "PDF2TEXT_JSON")]
    json: bool,

    /// Comma-separated strategy order.
    #[arg(long, env = "PDF2TEXT_STRATEGIES", default_value = "ocr,layout,basic")]
    strategies: String,

    /// OCR backend.
    #[arg(long, env = "PDF2TEXT_OCR_ENGINE", value_enum, default_value = "tesseract")]
    ocr_engine: OcrEngineArg,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    #[arg(long, env = "PDF2TEXT_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Rendering DPI for OCR (72–600).
    #[arg(long, env = "PDF2TEXT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Pages processed concurrently inside a strategy.
    #[arg(short, long, env = "PDF2TEXT_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TEXT_PASSWORD")]
    password: Option<String>,

    /// Vision model for `--ocr-engine vision`.
    #[arg(long, env = "PDF2TEXT_VISION_MODEL")]
    vision_model: Option<String>,

    /// LLM provider for `--ocr-engine vision`.
    #[arg(long, env = "PDF2TEXT_PROVIDER")]
    provider: Option<String>,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// PDFs whose text seeds the conversation.
    #[arg(required = true)]
    pdfs: Vec<PathBuf>,

    /// Chat model (default: llama3.2).
    #[arg(long, env = "PDF2TEXT_CHAT_MODEL")]
    model: Option<String>,

    /// LLM provider (default: ollama).
    #[arg(long, env = "PDF2TEXT_PROVIDER")]
    provider: Option<String>,

    /// Conversation log cap in characters.
    #[arg(long, env = "PDF2TEXT_MAX_CONTEXT", default_value_t = 5000)]
    max_context: usize,

    /// Comma-separated strategy order used to load the PDFs.
    #[arg(long, env = "PDF2TEXT_STRATEGIES", default_value = "ocr,layout,basic")]
    strategies: String,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OcrEngineArg {
    Tesseract,
    Vision,
}

impl From<OcrEngineArg> for OcrEngineKind {
    fn from(v: OcrEngineArg) -> Self {
        match v {
            OcrEngineArg::Tesseract => OcrEngineKind::Tesseract,
            OcrEngineArg::Vision => OcrEngineKind::Vision,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides the feedback that matters to the user.
    let json = matches!(&cli.command, Command::Extract(args) if args.json);
    let show_progress = !cli.quiet && !cli.no_progress && !json;
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

    let progress = show_progress.then(CliProgressCallback::new);

    match cli.command {
        Command::Extract(ref args) => run_extract(args, progress, cli.quiet).await,
        Command::Chat(ref args) => run_chat(args, progress, cli.quiet).await,
    }
}

// ── extract ──────────────────────────────────────────────────────────────────

async fn run_extract(
    args: &ExtractArgs,
    progress: Option<Arc<CliProgressCallback>>,
    quiet: bool,
) -> Result<()> {
    let config = build_extraction_config(args, progress.clone())?;
    let extractor = Extractor::new(&config);
    debug!("Strategy chain: {}", extractor.strategy_names().join(" → "));

    let reports = if args.input.is_dir() {
        extractor
            .extract_folder(&args.input)
            .await
            .context("Folder extraction failed")?
    } else {
        vec![extractor.extract(&args.input).await]
    };

    if let Some(cb) = &progress {
        cb.finish();
    }

    if args.json {
        let json = if args.input.is_dir() {
            serde_json::to_string_pretty(&reports)
        } else {
            serde_json::to_string_pretty(&reports[0])
        }
        .context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    match &args.output {
        Some(out) if args.input.is_dir() => {
            let names = txt_names(reports.iter().map(|r| r.path.as_path()));
            for (report, name) in reports.iter().zip(names) {
                let target = out.join(name);
                write_text_atomic(&target, &report.text)
                    .await
                    .with_context(|| format!("Failed to write {}", target.display()))?;
            }
            if !quiet {
                eprintln!(
                    "{}  {} file(s)  →  {}",
                    green("✔"),
                    reports.len(),
                    bold(&out.display().to_string())
                );
            }
        }
        Some(out) => {
            write_text_atomic(out, &reports[0].text)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            if !quiet {
                print_summary(&reports[0], Some(out));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let many = reports.len() > 1;
            for report in &reports {
                if many {
                    writeln!(handle, "==> {} <==", report.path.display())
                        .context("Failed to write to stdout")?;
                }
                handle
                    .write_all(report.text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !report.text.ends_with('\n') {
                    handle
                        .write_all(b"\n")
                        .context("Failed to write to stdout")?;
                }
            }
            if !quiet && progress.is_none() && !many {
                print_summary(&reports[0], None);
            }
        }
    }

    Ok(())
}

fn print_summary(report: &ExtractionReport, output: Option<&Path>) {
    let target = output
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    match &report.strategy {
        Some(strategy) => eprintln!(
            "{}  {} chars via {}  {}ms{}",
            green("✔"),
            report.text.chars().count(),
            strategy,
            report.duration_ms,
            target
        ),
        None => eprintln!(
            "{}  no text extracted ({} strategies tried){}",
            red("✘"),
            report.attempts.len(),
            target
        ),
    }
}

/// Output file names for a batch, one per input, in input order.
///
/// `{stem}.txt` unless that name is already taken (compared case-insensitively,
/// so `a.pdf` and `a.PDF` never overwrite each other), then `{stem}-2.txt`,
/// `{stem}-3.txt`, and so on.
fn txt_names<'a>(pdfs: impl IntoIterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut taken: HashSet<String> = HashSet::new();
    pdfs.into_iter()
        .map(|pdf| {
            let stem = pdf
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let mut name = format!("{stem}.txt");
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem}-{n}.txt");
                n += 1;
            }
            PathBuf::from(name)
        })
        .collect()
}

/// Map CLI args to `ExtractionConfig`.
fn build_extraction_config(
    args: &ExtractArgs,
    progress: Option<Arc<CliProgressCallback>>,
) -> Result<ExtractionConfig> {
    let strategies =
        StrategyKind::parse_list(&args.strategies).context("Invalid --strategies value")?;

    let mut builder = ExtractionConfig::builder()
        .strategies(strategies)
        .ocr_engine(args.ocr_engine.clone().into())
        .ocr_language(args.ocr_lang.clone())
        .dpi(args.dpi)
        .concurrency(args.concurrency);

    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref model) = args.vision_model {
        builder = builder.vision_model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

// ── chat ─────────────────────────────────────────────────────────────────────

async fn run_chat(
    args: &ChatArgs,
    progress: Option<Arc<CliProgressCallback>>,
    quiet: bool,
) -> Result<()> {
    let mut chat_config = ChatConfig::default().with_max_context_chars(args.max_context);
    if let Some(ref model) = args.model {
        chat_config = chat_config.with_model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        chat_config = chat_config.with_provider_name(provider.clone());
    }
    let provider = chat::resolve_chat_provider(&chat_config).context("Cannot start chat")?;

    let mut builder = ExtractionConfig::builder().strategies(
        StrategyKind::parse_list(&args.strategies).context("Invalid --strategies value")?,
    );
    if let Some(cb) = progress.clone() {
        builder = builder.progress_callback(cb as ProgressCallback);
    }
    let extractor = Extractor::new(&builder.build().context("Invalid configuration")?);

    let mut log = ConversationLog::new(chat_config.max_context_chars);
    for pdf in &args.pdfs {
        let text = extractor.extract_text(pdf).await;
        log.append(&text);
    }
    if let Some(cb) = &progress {
        cb.finish();
    }
    if !quiet {
        eprintln!(
            "{} {} context chars loaded. Ask a question, or type {} to quit.",
            cyan("◆"),
            log.len(),
            bold("exit")
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !quiet {
            eprint!("{} ", bold("you>"));
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match chat::ask(&provider, &mut log, &line, &chat_config).await {
            Ok(answer) => println!("{answer}"),
            Err(e) => eprintln!("{} {}", red("✗"), e),
        }
    }

    Ok(())
}
