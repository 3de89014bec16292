use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ncbi_genome_download::app::{Downloader, EXIT_FAILURE, Outcome};
use ncbi_genome_download::cache::SummaryCache;
use ncbi_genome_download::client::HttpArchiveClient;
use ncbi_genome_download::config::{ConfigLoader, NgdConfig};
use ncbi_genome_download::domain::Section;
use ncbi_genome_download::error::NgdError;
use ncbi_genome_download::output::{OutputMode, print_report};
use ncbi_genome_download::worker::Cancellation;

#[derive(Parser)]
#[command(name = "ncbi-genome-download")]
#[command(about = "Download genome assemblies from the NCBI FTP archive")]
#[command(version)]
struct Cli {
    /// Taxonomic groups to download, comma separated, or "all"
    groups: Option<String>,

    #[arg(short = 's', long, value_enum)]
    section: Option<Section>,

    /// File formats to download, comma separated, or "all"
    #[arg(short = 'F', long = "formats")]
    formats: Option<String>,

    #[arg(short = 'l', long = "assembly-levels")]
    assembly_levels: Option<String>,

    /// Genera to download, comma separated, or a file with one genus per line
    #[arg(short = 'g', long)]
    genera: Option<String>,

    #[arg(long)]
    fuzzy_genus: bool,

    #[arg(short = 'S', long)]
    strains: Option<String>,

    #[arg(short = 'T', long = "species-taxids")]
    species_taxids: Option<String>,

    #[arg(short = 't', long)]
    taxids: Option<String>,

    #[arg(short = 'A', long = "assembly-accessions")]
    assembly_accessions: Option<String>,

    /// Treat assembly accessions as prefixes
    #[arg(long)]
    fuzzy_accessions: bool,

    #[arg(short = 'R', long = "refseq-categories")]
    refseq_categories: Option<String>,

    #[arg(short = 'M', long = "type-materials")]
    type_materials: Option<String>,

    #[arg(short = 'o', long = "output-folder")]
    output: Option<String>,

    #[arg(long)]
    flat_output: bool,

    /// Also build a symlink tree sorted by organism name
    #[arg(short = 'H', long)]
    human_readable: bool,

    #[arg(short = 'u', long)]
    uri: Option<String>,

    #[arg(short = 'p', long)]
    parallel: Option<usize>,

    /// How often to rerun the whole pass after a connection error
    #[arg(short = 'r', long, default_value_t = 0)]
    retries: u32,

    #[arg(short = 'm', long = "metadata-table")]
    metadata_table: Option<String>,

    /// Only list what would be downloaded
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Reuse assembly summaries downloaded in the last 24 hours
    #[arg(long)]
    use_cache: bool,

    /// Also write an uncompressed copy of every .gz file
    #[arg(long)]
    decompress: bool,

    /// JSON config file; command-line options override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    json: bool,

    #[arg(short = 'v', long)]
    verbose: bool,

    #[arg(short = 'd', long)]
    debug: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run() -> miette::Result<u8> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = build_config(&cli).into_diagnostic()?;
    let cache = SummaryCache::for_config(&config).into_diagnostic()?;
    let client = HttpArchiveClient::new().into_diagnostic()?;
    let downloader = Downloader::new(client, cache);

    let cancel = Cancellation::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel()).into_diagnostic()?;

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut attempts = 0;
    let report = loop {
        let report = downloader.download(&config, &cancel).into_diagnostic()?;
        if report.outcome != Outcome::Retry || attempts >= cli.retries {
            break report;
        }
        attempts += 1;
        warn!(attempt = attempts, of = cli.retries, "connection failed, retrying");
    };

    print_report(&report, mode).into_diagnostic()?;
    info!(outcome = ?report.outcome, done = report.done, failed = report.failed, "finished");
    Ok(report.outcome.code())
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<NgdConfig, NgdError> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::resolve(path)?,
        None => NgdConfig::default(),
    };

    if let Some(groups) = &cli.groups {
        config.set_groups(groups.as_str())?;
    }
    if let Some(section) = cli.section {
        config.set_section(section);
    }
    if let Some(formats) = &cli.formats {
        config.set_file_formats(formats.as_str())?;
    }
    if let Some(levels) = &cli.assembly_levels {
        config.set_assembly_levels(levels.as_str())?;
    }
    if let Some(genera) = &cli.genera {
        config.set_genera(genera.as_str())?;
    }
    if let Some(strains) = &cli.strains {
        config.set_strains(strains.as_str())?;
    }
    if let Some(ids) = &cli.species_taxids {
        config.set_species_taxids(ids.as_str())?;
    }
    if let Some(ids) = &cli.taxids {
        config.set_taxids(ids.as_str())?;
    }
    if let Some(accessions) = &cli.assembly_accessions {
        config.set_assembly_accessions(accessions.as_str())?;
    }
    if let Some(categories) = &cli.refseq_categories {
        config.set_refseq_categories(categories.as_str())?;
    }
    if let Some(types) = &cli.type_materials {
        config.set_type_materials(types.as_str())?;
    }
    if let Some(output) = &cli.output {
        config.set_output(output.as_str());
    }
    if let Some(uri) = &cli.uri {
        config.set_uri(uri);
    }
    if let Some(parallel) = cli.parallel {
        config.set_parallel(parallel)?;
    }
    if let Some(table) = &cli.metadata_table {
        config.set("metadata_table", table)?;
    }

    if cli.fuzzy_genus {
        config.set_fuzzy_genus(true);
    }
    if cli.fuzzy_accessions {
        config.set_fuzzy_accessions(true);
    }
    if cli.flat_output {
        config.set_flat_output(true);
    }
    if cli.human_readable {
        config.set_human_readable(true);
    }
    if cli.dry_run {
        config.set_dry_run(true);
    }
    if cli.use_cache {
        config.set_use_cache(true);
    }
    if cli.decompress {
        config.set_decompress(true);
    }

    Ok(config)
}
