fn main() {
    if let Err(e) = gatemap_lib::run() {
        tracing::error!(error = %e, "gatemap failed");
        eprintln!("gatemap: {e}");
        std::process::exit(1);
    }
}
