#[tokio::main]
async fn main() {
    if let Err(error) = quakewatch_lib::run().await {
        eprintln!("quakewatch failed: {error}");
        std::process::exit(1);
    }
}
