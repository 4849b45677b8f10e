#[tokio::main]
async fn main() -> anyhow::Result<()> {
    broadcast_server::run().await
}
