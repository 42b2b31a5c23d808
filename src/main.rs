#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tripsync_lib::run().await
}
