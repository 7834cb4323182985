//! A core module for command line interface.
//!
//! See [`Cli`] for more information.

use std::path::PathBuf;

use anyhow::Context;
use clap::builder::{PathBufValueParser, TypedValueParser};
use clap::ArgGroup;
pub use clap::{CommandFactory, Parser};

use crate::config::{Config, Validate};

/// [`clap`] command line interface.
///
/// The `--config` file is parsed with [`toml`], then validated with [`Config::validate`].
///
/// # Example
///
/// ```no_run
/// use safebooru_dl::cli::{Cli, Parser as _};
///
/// let cli = Cli::parse();
/// let mode = cli.mode();
/// ```
#[non_exhaustive]
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(ArgGroup::new("target").required(true).args(["id", "tags", "ping"])))]
pub struct Cli {
    /// Download the post with this id.
    #[arg(short, long, value_name = "ID")]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub id: Option<u64>,

    /// Download posts matching these space separated tags.
    #[arg(short, long, value_name = "TAGS")]
    pub tags: Option<String>,

    /// The zero-based page of the tag search.
    #[arg(short, long, value_name = "N", default_value_t = 0)]
    #[arg(requires = "tags", conflicts_with_all = ["id", "ping"])]
    pub page: u64,

    /// Only download the zero-based item of the page.
    #[arg(short = 'n', long, value_name = "I")]
    #[arg(requires = "tags", conflicts_with_all = ["id", "ping"])]
    pub item: Option<usize>,

    /// Posts per page, up to 100.
    #[arg(short, long, value_name = "L")]
    #[arg(requires = "tags", conflicts_with_all = ["id", "ping"])]
    #[arg(value_parser = clap::value_parser!(u64).range(1..=100))]
    pub limit: Option<u64>,

    /// Report the HTTP status of the API and exit.
    #[arg(long)]
    pub ping: bool,

    /// The directory to save images into.
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Request timeout in seconds, `0` disables it. Overrides the config file.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// The config file to use.
    #[arg(short, long, value_name = "PATH")]
    #[arg(value_parser = PathBufValueParser::new().try_map(Self::parse_config_from_filepath))]
    pub config: Option<Config>,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Check that the API answers.
    Ping,
    /// Download a single post by id.
    #[allow(missing_docs)]
    Post { id: u64 },
    /// Download every post of a page.
    #[allow(missing_docs)]
    Page { tags: String, page: u64 },
    /// Download one post of a page.
    #[allow(missing_docs)]
    Item { tags: String, page: u64, item: usize },
}

impl Cli {
    #[inline]
    fn parse_config_from_filepath(path: PathBuf) -> anyhow::Result<Config> {
        let config = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<Config>(&config)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the flags into a single [`Mode`].
    ///
    /// The `target` group guarantees exactly one of `--id`, `--tags` and `--ping`.
    pub fn mode(&self) -> Mode {
        match (self.id, &self.tags, self.item) {
            (Some(id), _, _) => Mode::Post { id },
            (None, Some(tags), Some(item)) => Mode::Item {
                tags: tags.clone(),
                page: self.page,
                item,
            },
            (None, Some(tags), None) => Mode::Page {
                tags: tags.clone(),
                page: self.page,
            },
            (None, None, _) => Mode::Ping,
        }
    }

    /// The config file merged with the flags that override it.
    pub fn config(&self) -> Config {
        let mut config = self.config.clone().unwrap_or_default();
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(dir) = &self.dir {
            config.download_dir = Some(dir.clone());
        }
        config
    }
}
