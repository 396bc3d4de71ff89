use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mymdb",
    version,
    about = "Keeps a local movie catalog in sync with OMDb.",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 0 = fatal only, 1 = errors, 2 = info, 3 = debug
    #[arg(
        short,
        long,
        global = true,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Update the movie database from a directory of movies
    UpdateStore {
        /// The path to look for movies
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Update the movie database from an IMDb watchlist URL
    UpdateWatchlist {
        /// The URL to look for movies
        #[arg(value_name = "URL")]
        url: String,
    },

    /// List catalog entries, lowest rated first
    List {
        /// Only titles containing this text
        #[arg(long)]
        search: Option<String>,
        /// Only movies on the watchlist
        #[arg(long)]
        watchlist: bool,
        /// Only movies in the store
        #[arg(long)]
        in_store: bool,
    },

    /// List all genres
    Genres,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_store_import() {
        let cli =
            Cli::try_parse_from(["mymdb", "update-store", "/media/movies", "-v", "3"]).unwrap();
        assert_eq!(cli.verbosity, 3);
        match cli.command {
            Command::UpdateStore { path } => assert_eq!(path, PathBuf::from("/media/movies")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_verbosity() {
        assert!(Cli::try_parse_from(["mymdb", "-v", "4", "genres"]).is_err());
    }

    #[test]
    fn defaults_to_error_verbosity() {
        let cli =
            Cli::try_parse_from(["mymdb", "update-watchlist", "https://imdb.com/list"]).unwrap();
        assert_eq!(cli.verbosity, 1);
    }
}
