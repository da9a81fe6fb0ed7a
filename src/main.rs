use gateway_xds::cli::run_cli;

fn main() {
    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    if let Err(e) = run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
