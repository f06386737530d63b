use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::models::{elevation_profile, WeatherStation};
use crate::pipeline::{plan, Orchestrator, RunReport, Stage};
use crate::schema::Entity;
use crate::utils::init_logging;
use crate::writers::{load_rows, ParquetStore};
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            data_root,
            store,
            stages,
            chunk_rows,
            compression,
            surrogate_keys,
            report,
            no_progress,
        } => {
            if let Some(data_root) = data_root {
                settings.data_root = data_root;
            }
            if let Some(store) = store {
                settings.store.root = store;
            }
            if let Some(chunk_rows) = chunk_rows {
                settings.ingest.chunk_rows = chunk_rows;
            }
            if let Some(compression) = compression {
                settings.store.compression = compression;
            }
            if let Some(mode) = surrogate_keys {
                settings.ingest.surrogate_keys = mode;
            }
            settings.check()?;

            let selected = stages
                .iter()
                .map(|s| s.parse::<Stage>())
                .collect::<Result<Vec<_>>>()?;

            println!("Running ingestion pipeline...");
            println!("Dataset root: {}", settings.data_root.display());
            println!("Store: {}", settings.store.root.display());
            match settings.chunk_bound() {
                Some(rows) => println!("Batch size: {} rows", rows),
                None => println!("Batch size: whole file"),
            }

            let show_progress = !no_progress;
            let run_report = tokio::task::spawn_blocking(move || {
                run_pipeline(&settings, &selected, show_progress)
            })
            .await??;

            println!("\n{}", run_report.summary());

            if let Some(path) = report {
                run_report.write_json(&path)?;
                println!("Report written to {}", path.display());
            }

            println!("Ingestion complete!");
        }

        Commands::Stages => {
            for (i, stage) in plan(&[])?.iter().enumerate() {
                let deps: Vec<&str> = stage.dependencies().iter().map(Stage::name).collect();
                let outputs: Vec<&str> = stage.outputs().iter().map(Entity::table_name).collect();
                println!(
                    "{}. {:<24} after [{}] -> {}",
                    i + 1,
                    stage.name(),
                    deps.join(", "),
                    outputs.join(", ")
                );
            }
        }

        Commands::Info { store } => {
            if let Some(store) = store {
                settings.store.root = store;
            }
            let store = open_store(&settings)?;
            println!("Store: {}\n", store.root().display());

            for entity in Entity::ALL {
                println!("{}", store.relation_info(entity)?.summary());
            }

            let stations: Vec<WeatherStation> = load_rows(&store)?;
            if !stations.is_empty() {
                println!("\nWeather stations by elevation:");
                for (group, count) in elevation_profile(&stations) {
                    let label = group.map_or("Unknown Elevation", |g| g.label());
                    println!("  {:<18} {:>5}", label, count);
                }
            }
        }
    }

    Ok(())
}

fn open_store(settings: &Settings) -> Result<ParquetStore> {
    Ok(ParquetStore::new(&settings.store.root)
        .with_compression(&settings.store.compression)?
        .with_row_group_size(settings.store.row_group_size))
}

fn run_pipeline(settings: &Settings, stages: &[Stage], show_progress: bool) -> Result<RunReport> {
    let mut store = open_store(settings)?;
    info!(root = %store.root().display(), "Opened Parquet store");
    Orchestrator::new(settings, &mut store)
        .with_progress(show_progress)
        .run(stages)
}
