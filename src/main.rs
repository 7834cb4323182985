use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use tokio::runtime::Runtime;
use tokio::signal;

use safebooru_dl::api::url::API_URL;
use safebooru_dl::api::{Post, TagQuery};
use safebooru_dl::cli::{Cli, Mode, Parser};
use safebooru_dl::config::Config;
use safebooru_dl::scheduler::Scheduler;
use safebooru_dl::transport::{ReqwestTransport, Transport};

const SPINNER_FINISH_MODE: ProgressFinish = ProgressFinish::AndClear;
const SPINNER_TICK_SECS: f32 = 0.1;

#[inline]
fn build_spinner() -> ProgressBar {
    ProgressBar::new_spinner()
        .with_finish(SPINNER_FINISH_MODE)
        .with_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap()
                // For more spinners check out the cli-spinners project:
                // https://github.com/sindresorhus/cli-spinners/blob/master/spinners.json
                // NOTE: use `ascii` only, because cmd/powershell maybe not support unicode.
                .tick_strings(&[".  ", ".. ", "...", " ..", "  .", "   "]),
        )
}

async fn download_post(transport: &ReqwestTransport, id: u64, dir: &Path) -> anyhow::Result<()> {
    let spinner = build_spinner();
    spinner.set_message(format!("Downloading post {id}..."));
    spinner.enable_steady_tick(Duration::from_secs_f32(SPINNER_TICK_SECS));
    let downloaded = Post::new(transport, id)
        .download(dir)
        .await
        .with_context(|| format!("failed to download post {id}"))?;
    spinner.finish_and_clear();

    println!("{}", downloaded.path().display());
    Ok(())
}

async fn download_page(
    transport: &ReqwestTransport,
    query: TagQuery<'_, ReqwestTransport>,
    dir: Option<&Path>,
) -> anyhow::Result<()> {
    let spinner = build_spinner();
    spinner.set_message("Fetching image data from Safebooru API...");
    spinner.enable_steady_tick(Duration::from_secs_f32(SPINNER_TICK_SECS));
    let records = query.page().await.context("failed to get data from API")?;
    spinner.finish_with_message("Image data fetched successfully!");

    // HACK: This is not considered an error, so we just return Ok(()).
    if records.is_empty() {
        println!(
            "There is no image on page {} for the given tags: {}",
            query.pid(),
            query.tags()
        );
        return Ok(());
    }

    let download_dir = dir.map_or_else(|| query.default_dir(), Path::to_path_buf);
    let scheduler = Scheduler::build(transport, &download_dir, records)
        .await
        .context("Unable to ensure the existence of the download directory")?;
    let summary = scheduler.show_progress(true).launch().await?;

    println!("{} {summary}", download_dir.display());
    Ok(())
}

fn tag_query<'a>(
    transport: &'a ReqwestTransport,
    tags: &'a str,
    page: u64,
    limit: Option<u64>,
) -> TagQuery<'a, ReqwestTransport> {
    let query = TagQuery::new(transport, tags, page);
    match limit {
        Some(limit) => query.with_limit(limit),
        None => query,
    }
}

#[inline]
async fn async_main(mode: Mode, limit: Option<u64>, config: Config) -> anyhow::Result<()> {
    let transport = config
        .transport()
        .context("failed to build reqwest client")?;
    let dir = config.download_dir.as_deref();

    match mode {
        Mode::Ping => {
            let status = transport
                .ping(&API_URL)
                .await
                .context("safebooru is unreachable")?;
            println!("{} {status}", API_URL.as_str());
        }
        Mode::Post { id } => {
            let dir = dir.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            download_post(&transport, id, &dir).await?;
        }
        Mode::Item { tags, page, item } => {
            let query = tag_query(&transport, &tags, page, limit);
            let dir = dir.map_or_else(|| query.default_dir(), Path::to_path_buf);
            let downloaded = query
                .download(item, dir)
                .await
                .with_context(|| format!("failed to download item {item} of page {page}"))?;
            println!("{}", downloaded.path().display());
        }
        Mode::Page { tags, page } => {
            let query = tag_query(&transport, &tags, page, limit);
            download_page(&transport, query, dir)
                .await
                .with_context(|| format!("failed to download page {page}"))?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    // here, if parse fails, the program will be `abort`ed, and no `Drop` will be called,
    // but it's okay, because we don't need to clean up anything.
    let cli = Cli::parse();
    let mode = cli.mode();
    let limit = cli.limit;
    let config = cli.config();

    let runtime = Runtime::new().context("failed to build tokio runtime")?;
    runtime.block_on(async {
        tokio::select! {
            result = async_main(mode, limit, config) => {result},
            result = signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c signal")?;
                println!("Ctrl-C received, exiting...");
                Ok(())
            },
        }
    })?;

    Ok(ExitCode::SUCCESS)
}
