use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use lingcat_catalog::{
    parse_bytes_with_policy, validate, write_to, Catalog, CatalogStats, LingcatConfig,
    ParseReport, SchemaPolicy, Translator, CONFIG_FILE_NAME,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "lingcat",
    about = "Inspect, check and rewrite Qt Linguist .ts catalogs",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑；預設為工作目錄中的 lingcat.json。 / Configuration file; defaults to lingcat.json in the working directory.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 提高記錄層級（-v 為 debug，-vv 為 trace）；RUST_LOG 優先。 / Log more (-v for debug, -vv for trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 依狀態統計訊息數量。 / Count messages per status.
    Stats(StatsArgs),
    /// 解析並檢查翻譯目錄。 / Parse and validate catalogs.
    Check(CheckArgs),
    /// 以執行中程式的方式查詢單一訊息。 / Resolve one message the way a running application would.
    Lookup(LookupArgs),
    /// 以標準排版重寫翻譯目錄。 / Rewrite a catalog in canonical layout.
    Normalize(RewriteArgs),
    /// 由既有目錄建立另一語言的空白目錄。 / Create an empty catalog for another language from an existing one.
    Init(InitArgs),
    /// 移除已過時與已消失的訊息。 / Drop obsolete and vanished messages.
    Prune(RewriteArgs),
}

#[derive(Args)]
struct StatsArgs {
    /// 要統計的翻譯目錄。 / Catalogs to count.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// 以 JSON 取代文字輸出。 / Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// 要檢查的翻譯目錄。 / Catalogs to check.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// 遇到結構異常時直接失敗而非略過。 / Fail on schema irregularities instead of skipping them.
    #[arg(long)]
    strict: bool,
    /// 發現任何問題時以錯誤結束。 / Exit with an error when any issue is found.
    #[arg(long)]
    fail_on_issues: bool,
}

#[derive(Args)]
struct LookupArgs {
    /// 要查詢的翻譯目錄。 / Catalog to query.
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// 訊息所屬的情境名稱。 / Context the message belongs to.
    #[arg(long)]
    context: String,
    /// 未翻譯的原文。 / Untranslated source text.
    #[arg(long)]
    source: String,
    /// 消歧義註解。 / Disambiguation comment.
    #[arg(long)]
    comment: Option<String>,
    /// 依此數量選擇複數形式。 / Select a numerus form for this count.
    #[arg(long, value_name = "N")]
    count: Option<u64>,
}

#[derive(Args)]
struct RewriteArgs {
    /// 要重寫的翻譯目錄。 / Catalog to rewrite.
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// 輸出檔案；未指定此項或 --in-place 時寫至標準輸出。 / Destination file; stdout when neither this nor --in-place is given.
    #[arg(long, conflicts_with = "in_place")]
    output: Option<PathBuf>,
    /// 就地覆寫輸入檔案。 / Overwrite the input file.
    #[arg(long)]
    in_place: bool,
}

#[derive(Args)]
struct InitArgs {
    /// 作為範本的翻譯目錄。 / Catalog used as the template.
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// 目標語言，例如 fr_FR。 / Target language, e.g. fr_FR.
    #[arg(long, value_name = "TAG")]
    language: String,
    /// 新目錄的輸出路徑。 / Where to write the new catalog.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Serialize)]
struct FileStats<'a> {
    path: String,
    language: Option<&'a str>,
    #[serde(flatten)]
    stats: CatalogStats,
    completeness: f64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        config,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);
    let config = load_config(config.as_deref())?;
    match command {
        Commands::Stats(args) => execute_stats(args, &config),
        Commands::Check(args) => execute_check(args, &config),
        Commands::Lookup(args) => execute_lookup(args, &config),
        Commands::Normalize(args) => execute_rewrite(args, &config, |catalog| catalog),
        Commands::Init(args) => execute_init(args, &config),
        Commands::Prune(args) => {
            execute_rewrite(args, &config, |catalog| catalog.without_obsolete())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LingcatConfig> {
    let config = match path {
        Some(path) => LingcatConfig::load(path)?,
        None => LingcatConfig::load_or_default(CONFIG_FILE_NAME)?,
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn load_report(path: &Path, policy: SchemaPolicy) -> Result<ParseReport> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_bytes_with_policy(&bytes, policy)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn load_catalog(path: &Path, config: &LingcatConfig) -> Result<Catalog> {
    Ok(load_report(path, config.schema_policy)?.catalog)
}

fn execute_stats(args: StatsArgs, config: &LingcatConfig) -> Result<()> {
    let mut catalogs = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        catalogs.push((input, load_catalog(input, config)?));
    }

    if args.json {
        let rows: Vec<FileStats<'_>> = catalogs
            .iter()
            .map(|(path, catalog)| {
                let stats = catalog.stats();
                FileStats {
                    path: path.display().to_string(),
                    language: catalog.language.as_deref(),
                    stats,
                    completeness: stats.completeness(),
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (path, catalog) in &catalogs {
        let stats = catalog.stats();
        println!(
            "{} [{}]: {} message(s) in {} context(s), {} finished, {} unfinished, {} obsolete, {} vanished, {} plural ({:.1}% complete)",
            path.display(),
            catalog.language.as_deref().unwrap_or("?"),
            stats.messages,
            stats.contexts,
            stats.finished,
            stats.unfinished,
            stats.obsolete,
            stats.vanished,
            stats.plural,
            stats.completeness()
        );
    }
    Ok(())
}

fn execute_check(args: CheckArgs, config: &LingcatConfig) -> Result<()> {
    let policy = if args.strict {
        SchemaPolicy::Strict
    } else {
        config.schema_policy
    };

    let mut total_warnings = 0usize;
    let mut total_issues = 0usize;
    for input in &args.inputs {
        let report = load_report(input, policy)?;
        for warning in &report.warnings {
            println!("{}: warning: {warning}", input.display());
        }
        let issues = validate(&report.catalog, &config.checks)
            .with_context(|| format!("failed to validate {}", input.display()))?;
        for issue in &issues {
            println!("{}: {issue}", input.display());
        }
        if report.warnings.is_empty() && issues.is_empty() {
            println!("{}: OK", input.display());
        }
        total_warnings += report.warnings.len();
        total_issues += issues.len();
    }

    if total_issues + total_warnings > 0 {
        eprintln!(
            "Found {total_issues} issue(s) and {total_warnings} schema warning(s) in {} file(s)",
            args.inputs.len()
        );
        if args.fail_on_issues {
            bail!("catalog issues detected");
        }
    }
    Ok(())
}

fn execute_lookup(args: LookupArgs, config: &LingcatConfig) -> Result<()> {
    let catalog = load_catalog(&args.input, config)?;
    let translator = Translator::new(catalog)?.with_unfinished(config.include_unfinished);
    let comment = args.comment.as_deref();
    let text = match args.count {
        Some(count) => {
            translator.lookup_plural_with_comment(&args.context, &args.source, comment, count)
        }
        None => translator.lookup(&args.context, &args.source, comment),
    };
    println!("{text}");
    Ok(())
}

fn execute_rewrite<F>(args: RewriteArgs, config: &LingcatConfig, transform: F) -> Result<()>
where
    F: FnOnce(Catalog) -> Catalog,
{
    let report = load_report(&args.input, config.schema_policy)?;
    if !report.warnings.is_empty() {
        for warning in &report.warnings {
            eprintln!("{}: warning: {warning}", args.input.display());
        }
        bail!(
            "refusing to rewrite {}: {} schema warning(s) would drop content",
            args.input.display(),
            report.warnings.len()
        );
    }
    let catalog = transform(report.catalog);
    let destination = if args.in_place {
        Some(args.input.as_path())
    } else {
        args.output.as_deref()
    };
    match destination {
        Some(path) => save_catalog(&catalog, path),
        None => write_to(&catalog, io::stdout().lock()).context("failed to write to stdout"),
    }
}

fn execute_init(args: InitArgs, config: &LingcatConfig) -> Result<()> {
    let catalog = load_catalog(&args.input, config)?;
    let seeded = catalog
        .seeded_for(&args.language)
        .with_context(|| format!("cannot seed a catalog for '{}'", args.language))?;
    save_catalog(&seeded, &args.output)?;
    println!(
        "Created {} catalog {} ({} message(s) to translate)",
        args.language,
        args.output.display(),
        seeded.stats().unfinished
    );
    Ok(())
}

fn save_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    catalog
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))
}
