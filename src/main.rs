use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use log::error;

use phenoscoring::config::{ConfigLoader, PhenoscoringConfig};
use phenoscoring::ontology::Ontology;
use phenoscoring::persistence::RedbStore;
use phenoscoring::pipeline::Pipeline;
use phenoscoring::PhenoscoringError;

#[derive(Parser, Debug)]
#[command(name = "phenoscoring", version, about = "Bayesian phenotype matching of models against reference profiles")]
struct Cli {
    /// Path to a yaml/yml/json/toml/ron PhenoscoringConfig file
    #[arg(long, short = 'c')]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a concise (raw, not-yet-imputed) reference phenotype TSV file
    IngestReferences {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest a phenotype background frequency TSV file
    IngestFrequencies {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest a model description TSV file
    IngestModelDescriptions {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest a model phenotype observation TSV file
    IngestModelPhenotypes {
        #[arg(long)]
        file: PathBuf,
    },
    /// Impute references to complete profiles and derive specificity
    BuildReferences,
    /// Score every ingested model against every reference
    Compute {
        /// Timestamp recorded on every persisted score row; defaults to
        /// the current UTC time if omitted
        #[arg(long)]
        timestamp: Option<String>,
    },
}

fn run(cli: Cli) -> Result<(), PhenoscoringError> {
    let config: PhenoscoringConfig = ConfigLoader::load(cli.config)?;
    let store = RedbStore::open(&config.db)?;
    let pipeline = Pipeline::new(&config, &store);

    match cli.command {
        Command::IngestReferences { file } => {
            let reader = BufReader::new(File::open(file)?);
            pipeline.ingest_reference_phenotypes(reader)?;
        }
        Command::IngestFrequencies { file } => {
            let reader = BufReader::new(File::open(file)?);
            pipeline.ingest_phenotype_frequencies(reader)?;
        }
        Command::IngestModelDescriptions { file } => {
            let reader = BufReader::new(File::open(file)?);
            pipeline.ingest_model_descriptions(reader)?;
        }
        Command::IngestModelPhenotypes { file } => {
            let reader = BufReader::new(File::open(file)?);
            pipeline.ingest_model_phenotypes(reader)?;
        }
        Command::BuildReferences => {
            let obo = BufReader::new(File::open(&config.obo)?);
            let ontology = Ontology::from_obo(obo)?;
            pipeline.build_references(&ontology)?;
        }
        Command::Compute { timestamp } => {
            let obo = BufReader::new(File::open(&config.obo)?);
            let ontology = Ontology::from_obo(obo)?;
            let timestamp = timestamp.unwrap_or_else(|| Utc::now().to_string());
            pipeline.compute(&ontology, &timestamp)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
