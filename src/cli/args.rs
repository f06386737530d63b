use crate::processors::SurrogateKeyMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "transit-weather-etl")]
#[command(about = "Normalize Swiss weather and public-transport exports into Parquet relations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ingestion pipeline
    Run {
        #[arg(short, long, help = "Dataset root directory [default: datasets]")]
        data_root: Option<PathBuf>,

        #[arg(short, long, help = "Store root directory [default: warehouse]")]
        store: Option<PathBuf>,

        #[arg(
            long = "stage",
            value_name = "STAGE",
            help = "Run only this stage (repeatable); see `stages`"
        )]
        stages: Vec<String>,

        #[arg(long, help = "Rows per batch, 0 reads whole files [default: 500000]")]
        chunk_rows: Option<usize>,

        #[arg(short, long, help = "Parquet compression [default: snappy]")]
        compression: Option<String>,

        #[arg(long, help = "Surrogate key numbering: continue or reset")]
        surrogate_keys: Option<SurrogateKeyMode>,

        #[arg(long, help = "Write the run report as JSON to this path")]
        report: Option<PathBuf>,

        #[arg(long, default_value = "false")]
        no_progress: bool,
    },

    /// List stages in execution order with their dependencies
    Stages,

    /// Display row counts per relation and weather stations per elevation band
    Info {
        #[arg(short, long, help = "Store root directory [default: warehouse]")]
        store: Option<PathBuf>,
    },
}
