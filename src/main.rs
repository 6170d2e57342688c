#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sophia_lib::run().await
}
