//! A core module to download every image of a page.
//!
//! See [`Scheduler`] for more information.
//!
//! Following is the low-level module wrapped by this module:
//! - [`crate::download`]
//! - [`crate::hash`]

use std::fmt;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use log::info;

use crate::api::data::PostRecord;
use crate::download::{Downloaded, Downloader};
use crate::error::Result;
use crate::transport::Transport;

const PB_FINISH_MODE: ProgressFinish = ProgressFinish::Abandon;

/// The tally of a [`Scheduler::launch`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// the number of images that have been downloaded
    pub done: u64,
    /// the number of images that already existed, which means no need to download
    pub existed: u64,
}

impl Summary {
    /// Every image that is on disk now.
    pub fn total(&self) -> u64 {
        self.done + self.existed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { done, existed } = self;
        write!(f, "[done:{done}\texisted:{existed}]")
    }
}

/** The scheduler to download the images of a list of post records.

- This struct will wrap a [`Downloader`] to download images from the `records` to the `download_dir`.

    *If a file with the same MD5 already exists, the download will be skipped.*

- Downloads run strictly one after another, in the order of `records`.
    The first failure stops the whole batch and is returned.

- If enabled with [`Self::show_progress`], a process bar displays the download status.

# Example
```no_run
use safebooru_dl::api::TagQuery;
use safebooru_dl::scheduler::Scheduler;
use safebooru_dl::transport::ReqwestTransport;

#[tokio::main]
async fn main() -> safebooru_dl::Result<()> {
    let transport = ReqwestTransport::new()?;

    let records = TagQuery::new(&transport, "cat", 0).page().await?;

    let scheduler = Scheduler::build(&transport, "download_dir", records).await?;
    let summary = scheduler.show_progress(true).launch().await?;
    println!("{summary}");
    Ok(())
}
```
*/
pub struct Scheduler<'a, T> {
    downloader: Downloader<'a, T>,
    records: Vec<PostRecord>,
    show_progress: bool,
}

impl<'a, T: Transport> Scheduler<'a, T> {
    /// Create a new scheduler.
    ///
    /// Usually, you prefer to use [`crate::api::TagQuery::scheduler`] to build it.
    ///
    /// # Errors
    ///
    /// If the `download_dir` cannot be created, an error will be returned.
    pub async fn build(
        transport: &'a T,
        download_dir: impl Into<PathBuf>,
        records: impl Into<Vec<PostRecord>>,
    ) -> Result<Self> {
        let downloader = Downloader::session(transport, download_dir).ensure().await?;
        Ok(Scheduler {
            downloader,
            records: records.into(),
            show_progress: false,
        })
    }

    /// Draw a progress bar on stderr while launching. Off by default.
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Whether there is nothing to download.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The number of records to download.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Build a process bar with a specific length and custom style.
    #[inline]
    fn build_process_bar(len: u64) -> ProgressBar {
        // see: https://docs.rs/indicatif/latest/indicatif/#templates
        const PROCESS_CHARS: &str = "#>-";
        // `prefix` for the current post, `msg` for download status
        const TEMPLATE: &str =
            "[{elapsed_precise}] {prefix} [{wide_bar:.cyan/blue}] {msg} {human_pos}/{human_len} ({eta})";

        let style = ProgressStyle::with_template(TEMPLATE)
            .expect("the progress bar template is valid")
            .progress_chars(PROCESS_CHARS);

        ProgressBar::new(len)
            .with_style(style)
            .with_message(Summary::default().to_string())
            .with_finish(PB_FINISH_MODE)
    }

    /// Download every record, one after another.
    ///
    /// # Errors
    ///
    /// The first error of [`Downloader::save`]; the images saved before it stay on disk.
    pub async fn launch(self) -> Result<Summary> {
        let Self {
            downloader,
            records,
            show_progress,
        } = self;

        let len = records.len() as u64;
        let process_bar = if show_progress {
            Self::build_process_bar(len)
        } else {
            ProgressBar::hidden()
        };

        let mut summary = Summary::default();
        for record in &records {
            process_bar.set_prefix(format!("#{}", record.id));
            match downloader.save(record).await {
                Ok(Downloaded::Done(_)) => summary.done += 1,
                Ok(Downloaded::Existed(_)) => summary.existed += 1,
                Err(err) => {
                    process_bar.abandon();
                    return Err(err);
                }
            }
            process_bar.set_message(summary.to_string());
            process_bar.inc(1);
        }
        process_bar.finish();

        info!(
            "{} posts into {}: {summary}",
            len,
            downloader.download_dir().display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::data::tests::record;
    use crate::transport::mock::MockTransport;

    const CONTENT: &str = "The quick brown fox jumps over the lazy dog";
    const MD5: &str = "9e107d9d372bb6826bd81d3542a419d6";

    #[tokio::test]
    async fn test_launch() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let records = vec![
            record(1, "1.jpg", MD5),
            record(2, "2.jpg", MD5),
            record(3, "3.jpg", MD5),
        ];
        // the second one is already on disk
        std::fs::write(temp_dir.path().join("2.jpg"), CONTENT).unwrap();
        let transport = MockTransport::default()
            .route(records[0].image_url().unwrap(), "one")
            .route(records[2].image_url().unwrap(), "three");

        let scheduler = Scheduler::build(&transport, temp_dir.path(), records)
            .await
            .unwrap();
        assert_eq!(scheduler.len(), 3);
        let summary = scheduler.show_progress(false).launch().await.unwrap();

        assert_eq!(summary, Summary { done: 2, existed: 1 });
        assert_eq!(summary.total(), 3);
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("3.jpg")).unwrap(),
            "three"
        );
    }

    #[tokio::test]
    async fn test_launch_empty() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let transport = MockTransport::default();

        let scheduler = Scheduler::build(&transport, temp_dir.path().join("empty"), Vec::new())
            .await
            .unwrap();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.launch().await.unwrap(), Summary::default());
        assert!(temp_dir.path().join("empty").is_dir());
    }

    #[test]
    fn test_summary_display() {
        let summary = Summary {
            done: 4,
            existed: 1,
        };
        assert_eq!(summary.to_string(), "[done:4\texisted:1]");
    }
}
