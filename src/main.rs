//! Breach Radar HTTP service.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    breach_radar::server::run().await
}
