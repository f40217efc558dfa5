#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = lessonflow::run_worker().await {
        eprintln!("lessonflow-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
