use clap::Parser;
use transit_weather_etl::cli::{run, Cli};
use transit_weather_etl::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
