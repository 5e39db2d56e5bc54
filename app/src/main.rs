use clap::Parser;
use leadscout_app::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    leadscout_app::init_tracing();
    leadscout_app::run(Cli::parse()).await
}
