use cssmatrix::run_from_env;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("CSSMATRIX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if let Err(err) = run_from_env() {
        eprintln!("error: {}", err.message);
        std::process::exit(1);
    }
}
