#[tokio::main]
async fn main() {
    if let Err(err) = lbb_api::run().await {
        tracing::error!(error = %err, "lbb-api failed");
        std::process::exit(1);
    }
}
