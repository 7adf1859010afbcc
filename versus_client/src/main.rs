#[tokio::main]
async fn main() -> std::io::Result<()> {
    versus_client::run_with_config().await
}
