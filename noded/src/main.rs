use noded::commands::Args;
use noded::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    Args::parse().run().await
}
