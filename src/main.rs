use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mymdb::{
    catalog::CatalogStore,
    cli::{Cli, Command},
    config::Config,
    db, library, logging,
    models::{MovieFilter, StatusFlag},
    omdb::OmdbClient,
    processor,
    report::ImportReport,
    scraper,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbosity);

    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!(target: logging::FATAL, "{err:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;

    let db =
        db::connect_and_migrate(&config.database_url, config.database_max_connections).await?;
    let catalog = CatalogStore::new(db);

    match command {
        Command::UpdateStore { path } => {
            let omdb = omdb_client(&config)?;
            let keys = library::list_directory(&path).await?;
            let report = processor::import(
                &catalog,
                &omdb,
                keys,
                StatusFlag::InStore,
                config.store_concurrency,
            )
            .await?;
            Ok(exit_code(&config, &report))
        },
        Command::UpdateWatchlist { url } => {
            let omdb = omdb_client(&config)?;
            let keys = scraper::fetch_watchlist(&http_client(&config)?, &url).await?;
            let report = processor::import(
                &catalog,
                &omdb,
                keys,
                StatusFlag::OnWatchlist,
                config.watchlist_concurrency,
            )
            .await?;
            info!("updated watchlist successfully");
            Ok(exit_code(&config, &report))
        },
        Command::List { search, watchlist, in_store } => {
            let filter = MovieFilter { search, on_watchlist: watchlist, in_store };
            let movies = catalog.list_movies(&filter).await?;

            println!(
                "{:<40} {:>6} {:>9} {:>9} {:>8}  {}",
                "Title", "Rating", "Metascore", "Watchlist", "In store", "Genres"
            );
            for (movie, genres) in movies {
                let genres: Vec<_> = genres.into_iter().map(|g| g.title).collect();
                println!(
                    "{:<40} {:>6} {:>9} {:>9} {:>8}  {}",
                    truncate(&movie.title, 40),
                    score(movie.imdb_rating),
                    score(movie.metascore),
                    yes_no(movie.on_watchlist),
                    yes_no(movie.in_store),
                    genres.join(", ")
                );
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Genres => {
            for genre in catalog.list_genres().await? {
                println!("{}", genre.title);
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("mymdb/", env!("CARGO_PKG_VERSION")))
        .timeout(config.http_timeout)
        .build()?;
    Ok(client)
}

fn omdb_client(config: &Config) -> anyhow::Result<OmdbClient> {
    let api_key = config.require_api_key()?.to_string();
    let base_url = config.omdb_api_url.clone();
    Ok(OmdbClient::new(http_client(config)?, api_key, base_url, config.omdb_rps))
}

fn exit_code(config: &Config, report: &ImportReport) -> ExitCode {
    ExitCode::from(report.exit_status(config.fail_on_errors))
}

fn score(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
