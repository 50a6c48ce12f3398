#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = coursegate::run().await {
        eprintln!("coursegate fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
