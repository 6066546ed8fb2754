use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use filestore_core::constants::{CONFIG_ENV_VAR, ROOT_ENV_VAR};
use filestore_core::{build_path_builder, build_registry, resolve_config, CoreConfig};
use filestore_files::{
    Finding, IntegrityScanner, ManifestRecordSource, RecordFilter, ScanError, ScanOptions,
    ScanReport, DEFAULT_ADAPTER_NAME,
};
use filestore_paths::{PathBuilderOverrides, ShardingMethod};
use filestore_types::{FileRecord, NonEmptyText, RecordId};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "filestore")]
#[command(about = "Stored file integrity checks and path derivation")]
struct Cli {
    /// YAML configuration file (default: $FILESTORE_CONFIG, then ./filestore.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every stored file still exists on its adapter
    Exists(ExistsArgs),
    /// Print the path, filename and URL a record would be stored under
    Path(PathArgs),
}

#[derive(Args)]
struct ExistsArgs {
    /// Only check records stored on this adapter
    #[arg(short, long, default_value = DEFAULT_ADAPTER_NAME)]
    adapter: String,
    /// Records fetched per page (default: scan.page_size from config)
    #[arg(short, long)]
    limit: Option<usize>,
    /// Only check records of this model
    #[arg(short, long)]
    identifier: Option<String>,
    /// Record manifest (.json, .yaml or .yml; default: scan.manifest from config)
    #[arg(short, long)]
    model: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PathArgs {
    /// Record id (a new v4 UUID when omitted)
    #[arg(long)]
    id: Option<String>,
    /// Original filename
    #[arg(long)]
    filename: Option<String>,
    /// Original extension, without the dot
    #[arg(long)]
    extension: Option<String>,
    /// Record model
    #[arg(long)]
    model: Option<String>,
    /// Adapter the record would be stored on
    #[arg(long, default_value = DEFAULT_ADAPTER_NAME)]
    adapter: String,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    overrides: OverrideArgs,
}

/// Per-call overrides of the configured path builder settings.
#[derive(Args, Default)]
struct OverrideArgs {
    #[arg(long)]
    strip_id_dashes: Option<bool>,
    #[arg(long)]
    path_prefix: Option<String>,
    #[arg(long)]
    path_suffix: Option<String>,
    #[arg(long)]
    file_prefix: Option<String>,
    #[arg(long)]
    file_suffix: Option<String>,
    #[arg(long)]
    preserve_original_filename: Option<bool>,
    #[arg(long)]
    preserve_extension: Option<bool>,
    #[arg(long)]
    id_shard_folder: Option<bool>,
    /// Sharding strategy name, or `none`
    #[arg(long)]
    sharding_method: Option<String>,
    #[arg(long)]
    shard_depth: Option<usize>,
    #[arg(long)]
    model_folder: Option<bool>,
    #[arg(long)]
    separator: Option<char>,
}

impl OverrideArgs {
    fn into_overrides(self) -> PathBuilderOverrides {
        PathBuilderOverrides {
            strip_id_dashes: self.strip_id_dashes,
            path_prefix: self.path_prefix,
            path_suffix: self.path_suffix,
            file_prefix: self.file_prefix,
            file_suffix: self.file_suffix,
            preserve_original_filename: self.preserve_original_filename,
            preserve_extension: self.preserve_extension,
            id_shard_folder: self.id_shard_folder,
            sharding_method: self.sharding_method.map(ShardingMethod::from),
            shard_depth: self.shard_depth,
            model_folder: self.model_folder,
            separator: self.separator,
        }
    }
}

/// Entry point for the `filestore` binary.
///
/// # Environment Variables
/// - `FILESTORE_CONFIG`: YAML configuration file, used when `--config` is not given
/// - `FILESTORE_ROOT`: root of the default `Local` adapter when there is no config file
/// - `RUST_LOG`: log filter (logs go to stderr; `filestore=info` is always enabled)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("filestore=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
    let local_root = std::env::var_os(ROOT_ENV_VAR).map(PathBuf::from);
    let config = resolve_config(config_path, local_root).context("loading configuration")?;

    match cli.command {
        Commands::Exists(args) => run_exists(&config, args).await,
        Commands::Path(args) => run_path(&config, args),
    }
}

async fn run_exists(config: &CoreConfig, args: ExistsArgs) -> anyhow::Result<()> {
    let manifest = args
        .model
        .or_else(|| config.scan().manifest.clone())
        .context("no record manifest given: pass --model or set scan.manifest in the config")?;

    let filter = RecordFilter {
        model: args.identifier,
        adapter: Some(args.adapter),
    };
    let source = ManifestRecordSource::open(&manifest, filter)
        .await
        .with_context(|| format!("loading record manifest {}", manifest.display()))?;
    if !source.rejected().is_empty() {
        tracing::warn!(
            "{} manifest row(s) could not be read and will not be checked",
            source.rejected().len()
        );
    }
    let registry = build_registry(config)?;

    let page_size = args.limit.unwrap_or(config.scan().page_size);
    let options = ScanOptions {
        page_size,
        concurrency: config.scan().concurrency.unwrap_or(page_size).max(1),
        cancel: CancellationToken::new(),
    };

    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });

    let scanner = IntegrityScanner::new(Arc::new(source), Arc::new(registry));
    match scanner.scan(&options).await {
        Ok(report) => print_report(&report, args.json),
        Err(ScanError::RecordSource { partial, source }) => {
            print_report(&partial, args.json)?;
            Err(anyhow::Error::new(source).context(format!(
                "record source failed after {} record(s)",
                partial.checked
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &ScanReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    print!("{}", format_report(report));
    Ok(())
}

fn format_report(report: &ScanReport) -> String {
    let mut out = String::new();

    for finding in &report.findings {
        let line = match finding {
            Finding::MissingFile { .. } => "missing".to_string(),
            Finding::AdapterResolution { reason, .. } => format!("unresolved ({})", reason),
            Finding::AdapterFailure { reason, .. } => format!("unknown ({})", reason),
        };
        out.push_str(&format!(
            "{}: {} (adapter: {}, path: {})\n",
            line,
            finding.id(),
            finding.adapter(),
            finding.path()
        ));
    }

    out.push_str(&format!(
        "{} checked, {} missing, {} unresolved adapter(s), {} failed check(s)\n",
        report.checked, report.missing, report.unresolved, report.failed
    ));
    if report.cancelled {
        out.push_str("Scan was cancelled before all records were checked.\n");
    }
    out
}

fn build_record(args: &PathArgs) -> anyhow::Result<FileRecord> {
    let id = match &args.id {
        Some(id) => RecordId::parse(id)?,
        None => RecordId::generate(),
    };
    let mut record = FileRecord::new(id, NonEmptyText::new(&args.adapter)?);

    if let Some(model) = &args.model {
        record = record.with_model(NonEmptyText::new(model)?);
    }
    if let Some(filename) = &args.filename {
        record = record.with_filename(NonEmptyText::new(filename)?);
    }
    if let Some(extension) = &args.extension {
        record = record.with_extension(NonEmptyText::new(extension.trim_start_matches('.'))?);
    }
    Ok(record)
}

fn run_path(config: &CoreConfig, args: PathArgs) -> anyhow::Result<()> {
    let builder = build_path_builder(config)?;
    let record = build_record(&args)?;
    let overrides = args.overrides.into_overrides();
    let overrides = (!overrides.is_empty()).then_some(&overrides);

    let path = builder.path(&record, overrides)?;
    let filename = builder.filename(&record, overrides)?;
    let full_path = builder.full_path(&record, overrides)?;
    let url = builder.url(&record, overrides)?;

    if args.json {
        let value = serde_json::json!({
            "id": record.id.as_str(),
            "path": path,
            "filename": filename,
            "full_path": full_path,
            "url": url,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("id:        {}", record.id);
        println!("path:      {}", path);
        println!("filename:  {}", filename);
        println!("full path: {}", full_path);
        println!("url:       {}", url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exists_defaults() {
        let cli = Cli::try_parse_from(["filestore", "exists"]).unwrap();

        match cli.command {
            Commands::Exists(args) => {
                assert_eq!(args.adapter, "Local");
                assert_eq!(args.limit, None);
                assert!(args.identifier.is_none());
                assert!(args.model.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected exists command"),
        }
    }

    #[test]
    fn test_exists_short_flags() {
        let cli = Cli::try_parse_from([
            "filestore", "exists", "-a", "S3", "-l", "10", "-i", "Documents", "-m", "files.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Exists(args) => {
                assert_eq!(args.adapter, "S3");
                assert_eq!(args.limit, Some(10));
                assert_eq!(args.identifier.as_deref(), Some("Documents"));
                assert_eq!(args.model, Some(PathBuf::from("files.json")));
            }
            _ => panic!("Expected exists command"),
        }
    }

    #[test]
    fn test_path_overrides() {
        let cli = Cli::try_parse_from([
            "filestore",
            "path",
            "--id",
            "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "--extension",
            ".png",
            "--sharding-method",
            "crc32",
            "--model-folder",
            "true",
            "--separator",
            "/",
        ])
        .unwrap();

        let Commands::Path(args) = cli.command else {
            panic!("Expected path command");
        };
        let record = build_record(&args).unwrap();
        assert_eq!(record.extension.as_ref().map(|e| e.as_str()), Some("png"));

        let overrides = args.overrides.into_overrides();
        assert_eq!(
            overrides.sharding_method,
            Some(ShardingMethod::Strategy("crc32".into()))
        );
        assert_eq!(overrides.model_folder, Some(true));
        assert_eq!(overrides.separator, Some('/'));
        assert!(overrides.path_prefix.is_none());
    }

    #[test]
    fn test_path_without_id_generates_one() {
        let cli = Cli::try_parse_from(["filestore", "path"]).unwrap();
        let Commands::Path(args) = cli.command else {
            panic!("Expected path command");
        };

        let record = build_record(&args).unwrap();
        assert!(record.id.as_uuid().is_some());
        assert!(OverrideArgs::default().into_overrides().is_empty());
    }

    #[test]
    fn test_path_rejects_invalid_id() {
        let cli = Cli::try_parse_from(["filestore", "path", "--id", "a/b"]).unwrap();
        let Commands::Path(args) = cli.command else {
            panic!("Expected path command");
        };

        assert!(build_record(&args).is_err());
    }

    #[test]
    fn test_config_is_global() {
        let cli = Cli::try_parse_from(["filestore", "path", "--config", "x.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
    }

    #[tokio::test]
    async fn test_format_report_lists_findings() {
        use filestore_files::{AdapterRegistry, MemoryAdapter, MemoryRecordSource};
        use filestore_types::StoredPath;

        let row = |id: &str, adapter: &str, path: &str| {
            filestore_types::StoredFile::new(
                id,
                NonEmptyText::new(adapter).unwrap(),
                StoredPath::new(path).unwrap(),
            )
        };
        let source = MemoryRecordSource::new(vec![
            row("a1", "Local", "docs/a1.pdf"),
            row("b2", "Local", "docs/b2.pdf"),
        ]);
        let mut registry = AdapterRegistry::new();
        registry.register("Local", Arc::new(MemoryAdapter::with_paths(["docs/a1.pdf"])));

        let scanner = IntegrityScanner::new(Arc::new(source), Arc::new(registry));
        let report = scanner.scan(&ScanOptions::default()).await.unwrap();

        assert_eq!(
            format_report(&report),
            "missing: b2 (adapter: Local, path: docs/b2.pdf)\n\
             2 checked, 1 missing, 0 unresolved adapter(s), 0 failed check(s)\n"
        );
    }
}
