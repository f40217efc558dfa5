#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = lessonflow::run().await {
        eprintln!("lessonflow fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
