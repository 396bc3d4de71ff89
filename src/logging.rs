use tracing_subscriber::EnvFilter;

/// Target for events that end the command. Verbosity 0 shows only these.
pub const FATAL: &str = "fatal";

pub fn init(verbosity: u8) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(verbosity));

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

pub fn default_filter(verbosity: u8) -> String {
    match verbosity {
        0 => format!("off,{FATAL}=error"),
        1 => "error".to_string(),
        2 => "warn,mymdb=info".to_string(),
        _ => "warn,mymdb=debug".to_string(),
    }
}
