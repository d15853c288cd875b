use anyhow::Result;
use clap::Parser;
use palaver::{Cli, UI};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut ui = UI::init(cli)?;
    ui.run().await;

    Ok(())
}
