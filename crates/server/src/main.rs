#[tokio::main]
async fn main() -> anyhow::Result<()> {
    anybot_server::start().await
}
