#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = lm_platform::run().await {
        eprintln!("lm-platform fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
