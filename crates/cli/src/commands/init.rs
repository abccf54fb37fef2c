use std::path::Path;

use anyhow::Context;

use super::Session;

pub async fn run(config: &Path) -> anyhow::Result<()> {
    let session = Session::open(config).await?;
    let result = session.runner.init().await;
    session.close().await;

    result.context("Failed to create the migrations table")?;
    println!("✅ Created migrations table");
    Ok(())
}
