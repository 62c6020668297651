use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use short_read_taxonomy::logging::init_logger;
use short_read_taxonomy::{
    clean_kraken_report, extract_unclassified, ingest_samples, merge_tables, parse_config,
    scrub_fastq_captions, standardize_bracken, standardize_metaphlan, standardize_xtree,
    ConfigFile, StandardizeParams, TaxonomyMap, WorkflowDirs,
};

#[derive(Parser)]
#[command(name = "srtax")]
#[command(about = "Standardize MetaPhlAn, Kraken2/Bracken and XTree reports into one tabular format")]
struct Cli {
    /// Enable progress output with timestamps
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML parameters file (work_dir, module, min_abund, uthresh)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split one MetaPhlAn profile into {sample}_{rank}.csv tables
    Metaphlan {
        #[arg(short, long)]
        report: PathBuf,
        #[arg(short, long)]
        sample: String,
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Abundances (fractions) below this are written as 0
        #[arg(long)]
        min_abund: Option<f64>,
    },

    /// Standardize a Bracken report laid out as .../{sample}/{rank}.*
    Bracken {
        #[arg(short, long)]
        report: PathBuf,
        #[arg(short, long)]
        out_dir: PathBuf,
        #[arg(long)]
        min_abund: Option<f64>,
    },

    /// Split a merged XTree coverage table into xtree_{rank}.csv tables
    Xtree {
        #[arg(short, long)]
        report: PathBuf,
        /// Clade name to taxon ID mapping (tab or pipe separated)
        #[arg(short, long)]
        taxonomy: PathBuf,
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Per-sample values below this are masked
        #[arg(long)]
        uthresh: Option<f64>,
    },

    /// Join standardized tables by row position into one table
    Merge {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Write the IDs of unclassified reads from a per-read report
    Unclassified {
        #[arg(short, long)]
        report: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Filter a Kraken2 report to one rank above a percentage threshold
    KrakenReport {
        report: PathBuf,
        /// Minimum percentage, also used verbatim in the output file name
        threshold: String,
        /// Kraken2 rank code, e.g. S or G
        taxlevel: String,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Copy a FASTQ file, blanking the caption after '+'
    ScrubFastq {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Link reads listed in a sample sheet into the tmp directory
    IngestSamples {
        #[arg(short, long)]
        samples: PathBuf,
        /// Defaults to the work dir's tmp/ when a config file sets work_dir
        #[arg(short, long)]
        tmp: Option<PathBuf>,
    },

    /// Create the working directory tree
    InitDirs {
        #[arg(short, long)]
        work_dir: Option<PathBuf>,
        #[arg(short, long)]
        module: Option<String>,
    },
}

fn spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&format!("{{spinner:.{}}} {{msg}}", color))
            .expect("Invalid spinner template"),
    );
    spinner.set_message(msg.to_string());
    spinner
}

fn resolve_params(config: &ConfigFile, min_abund: Option<f64>, uthresh: Option<f64>) -> Result<StandardizeParams> {
    let mut params = config.params();
    if let Some(min_abund) = min_abund {
        params.min_abund = min_abund;
    }
    if let Some(uthresh) = uthresh {
        params.uthresh = uthresh;
    }
    params.validate()?;
    Ok(params)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = match &cli.config {
        Some(path) => parse_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigFile::default(),
    };

    match cli.command {
        Commands::Metaphlan {
            report,
            sample,
            out_dir,
            min_abund,
        } => {
            let params = resolve_params(&config, min_abund, None)?;
            ensure_dir(&out_dir)?;
            let sp = spinner("blue", &format!("Standardizing MetaPhlAn profile for {}...", sample));
            let written = standardize_metaphlan(&report, &sample, &out_dir, &params)
                .with_context(|| format!("MetaPhlAn standardization failed for {}", report.display()))?;
            sp.finish_with_message(format!("Wrote {} rank tables.", written.len()));
        }
        Commands::Bracken {
            report,
            out_dir,
            min_abund,
        } => {
            let params = resolve_params(&config, min_abund, None)?;
            ensure_dir(&out_dir)?;
            let written = standardize_bracken(&report, &out_dir, &params)
                .with_context(|| format!("Bracken standardization failed for {}", report.display()))?;
            log::info!("Wrote {}", written.display());
        }
        Commands::Xtree {
            report,
            taxonomy,
            out_dir,
            uthresh,
        } => {
            let params = resolve_params(&config, None, uthresh)?;
            ensure_dir(&out_dir)?;
            let sp = spinner("green", "Loading taxonomy mapping...");
            let taxonomy = TaxonomyMap::load(&taxonomy)
                .with_context(|| format!("Failed to load taxonomy {}", taxonomy.display()))?;
            sp.set_message("Standardizing XTree report...");
            let written = standardize_xtree(&report, &taxonomy, &out_dir, &params)
                .with_context(|| format!("XTree standardization failed for {}", report.display()))?;
            sp.finish_with_message(format!("Wrote {} rank tables.", written.len()));
        }
        Commands::Merge { output, inputs } => {
            merge_tables(inputs.as_slice(), &output)
                .with_context(|| format!("Failed to merge into {}", output.display()))?;
        }
        Commands::Unclassified { report, output } => {
            let count = extract_unclassified(&report, &output)
                .with_context(|| format!("Failed to extract unclassified reads from {}", report.display()))?;
            log::info!("{} unclassified reads", count);
        }
        Commands::KrakenReport {
            report,
            threshold,
            taxlevel,
            out_dir,
        } => {
            let written = clean_kraken_report(&report, &threshold, &taxlevel, &out_dir)
                .with_context(|| format!("Failed to filter {}", report.display()))?;
            log::info!("Wrote {}", written.display());
        }
        Commands::ScrubFastq { input, output } => {
            let sp = spinner("yellow", &format!("Scrubbing {}...", input.display()));
            let rewritten = scrub_fastq_captions(&input, &output)
                .with_context(|| format!("Failed to scrub {}", input.display()))?;
            sp.finish_with_message(format!("Rewrote {} captions.", rewritten));
        }
        Commands::IngestSamples { samples, tmp } => {
            let tmp = tmp
                .or_else(|| config.dirs().map(|d| d.tmp))
                .context("No tmp directory given and no work_dir in config")?;
            ensure_dir(&tmp)?;
            for name in ingest_samples(&samples, &tmp)
                .with_context(|| format!("Failed to ingest {}", samples.display()))?
            {
                println!("{}", name);
            }
        }
        Commands::InitDirs { work_dir, module } => {
            let module = module.unwrap_or_else(|| config.module.clone());
            let work_dir = work_dir
                .or_else(|| config.work_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let dirs = WorkflowDirs::new(work_dir, &module);
            dirs.ensure()
                .with_context(|| format!("Failed to create {}", dirs.out.display()))?;
        }
    }

    Ok(())
}
