#[tokio::main]
async fn main() {
    if let Err(e) = clinic_intake::run().await {
        eprintln!("clinic-intake: {e}");
        std::process::exit(1);
    }
}
