#[tokio::main]
async fn main() -> anyhow::Result<()> {
    answer_server::start_server().await
}
