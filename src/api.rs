//! A core module for interacting with the Safebooru API.
//!
//! - [`Post`] looks up a single post by id.
//! - [`TagQuery`] searches one page of posts by tags.
//!
//! Both only hold a reference to a [`Transport`], so they are cheap to build and throw away.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::download::{Downloaded, Downloader};
use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, Summary};
use crate::transport::Transport;

/// The URLs of the Safebooru API.
pub mod url {
    use super::*;

    /// The base URL of the Safebooru.
    pub const BASE_URL: &str = "https://safebooru.org/";

    /// The Api URL of the Safebooru, which can be used to query safebooru's database.
    pub static API_URL: LazyLock<Url> = LazyLock::new(|| {
        // see: https://safebooru.org/index.php?page=help&topic=dapi
        Url::parse_with_params(
            &format!("{BASE_URL}index.php"),
            &[
                ("page", "dapi"),
                ("s", "post"),
                ("q", "index"),
                ("json", "1"),
            ],
        )
        .unwrap()
    });

    /// The root of the image storage, images live at `<IMAGE_URL>/<directory>/<image>`.
    pub static IMAGE_URL: LazyLock<Url> =
        LazyLock::new(|| Url::parse(BASE_URL).unwrap().join("images/").unwrap());
}

/// The API is loosely typed: a field may come as a string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// ... or a boolean as `0`/`1`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrInt {
    Bool(bool),
    Int(u64),
}

impl From<BoolOrInt> for bool {
    fn from(value: BoolOrInt) -> Self {
        match value {
            BoolOrInt::Bool(b) => b,
            BoolOrInt::Int(n) => n != 0,
        }
    }
}

impl Default for BoolOrInt {
    fn default() -> Self {
        Self::Bool(false)
    }
}

/// This struct is used to normalize the loosely typed fields for the `PostRecord` struct.
#[derive(Deserialize)]
pub(crate) struct PostInner {
    id: u64,
    image: String,
    hash: String,
    directory: StringOrNumber,
    height: u64,
    width: u64,
    #[serde(default)]
    sample: BoolOrInt,
    #[serde(default)]
    sample_height: u64,
    #[serde(default)]
    sample_width: u64,
    #[serde(default)]
    change: u64,
    #[serde(default)]
    owner: String,
    tags: String,
    #[serde(default)]
    parent_id: Option<u64>,
    rating: String,
    #[serde(default)]
    score: Option<i64>,
}

impl From<PostInner> for data::PostRecord {
    fn from(value: PostInner) -> Self {
        Self {
            id: value.id,
            image: value.image,
            hash: value.hash,
            directory: value.directory.into(),
            height: value.height,
            width: value.width,
            sample: value.sample.into(),
            sample_height: value.sample_height,
            sample_width: value.sample_width,
            change: value.change,
            owner: value.owner,
            tags: value.tags,
            parent_id: value.parent_id,
            rating: value.rating,
            score: value.score,
        }
    }
}

/// The data structure for the JSON response from the Safebooru API.
pub mod data {
    use std::ffi::OsStr;

    use super::*;

    /// One post of the JSON array returned by the API.
    ///
    /// All fields are kept as the API sent them.
    #[non_exhaustive]
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(from = "PostInner")]
    pub struct PostRecord {
        /// The ID of the post.
        pub id: u64,
        /// The file name of the image, e.g. `0a1b2c.jpg`.
        pub image: String,
        /// The MD5 hash of the image.
        pub hash: String,
        /// The storage directory of the image on the server.
        pub directory: String,
        /// The height of the image in pixels.
        pub height: u64,
        /// The width of the image in pixels.
        pub width: u64,
        /// Whether a downsized sample exists.
        pub sample: bool,
        /// The height of the sample, `0` if there is none.
        pub sample_height: u64,
        /// The width of the sample, `0` if there is none.
        pub sample_width: u64,
        /// The id of the last change made to the post.
        pub change: u64,
        /// The name of the uploader.
        pub owner: String,
        /// Space separated tags, see [`Self::tag_list`].
        pub tags: String,
        /// The id of the parent post. The API uses `0` for "no parent".
        pub parent_id: Option<u64>,
        /// The content rating, e.g. `general` or `safe`.
        pub rating: String,
        /// The score of the post, if it has one.
        pub score: Option<i64>,
    }

    impl PostRecord {
        /// [`Self::tags`] split on whitespace.
        pub fn tag_list(&self) -> Vec<&str> {
            self.tags.split_whitespace().collect()
        }

        /// The URL to download the full image from.
        ///
        /// `directory` and `image` are pushed as path segments, so neither can leave `images/`.
        ///
        /// # Errors
        ///
        /// [`Error::InvalidRecord`] if `directory`/`image` do not form a valid URL path.
        pub fn image_url(&self) -> Result<Url> {
            let mut image_url = url::IMAGE_URL.clone();
            image_url
                .path_segments_mut()
                .map_err(|()| Error::InvalidRecord {
                    id: self.id,
                    reason: "the image URL is malformed",
                })?
                .pop_if_empty()
                .push(&self.directory)
                .push(&self.image);
            Ok(image_url)
        }

        /// Only the final component of [`Self::image`], so a record cannot write outside the download directory.
        pub fn file_name(&self) -> Option<&OsStr> {
            Path::new(&self.image).file_name()
        }
    }

}

use data::PostRecord;

/// A single post, looked up by id.
///
/// # Example
///
/// ```no_run
/// use safebooru_dl::api::Post;
/// use safebooru_dl::transport::ReqwestTransport;
///
/// #[tokio::main]
/// async fn main() -> safebooru_dl::Result<()> {
///     let transport = ReqwestTransport::new()?;
///     let post = Post::new(&transport, 3664652);
///
///     let record = post.fetch().await?;
///     println!("{} by {}: {:?}", record.image, record.owner, record.tag_list());
///
///     post.download("images").await?;
///     Ok(())
/// }
/// ```
pub struct Post<'a, T> {
    transport: &'a T,
    id: u64,
}

impl<'a, T: Transport> Post<'a, T> {
    /// No request is made until [`Self::fetch`] or [`Self::download`].
    pub fn new(transport: &'a T, id: u64) -> Self {
        Self { transport, id }
    }

    /// The id of this post.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The API URL of this post.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQuery`] if the id is `0`.
    pub fn url(&self) -> Result<Url> {
        if self.id == 0 {
            return Err(Error::InvalidQuery("post id must be greater than 0"));
        }
        let mut target_url = url::API_URL.clone();
        target_url
            .query_pairs_mut()
            .append_pair("id", &self.id.to_string());
        Ok(target_url)
    }

    /// Fetch the metadata of this post once.
    ///
    /// Every field of the returned record comes from the same response.
    ///
    /// # Errors
    ///
    /// [`Error::PostNotFound`] if the API has no post with this id,
    /// otherwise any error of [`Transport::fetch_json`].
    pub async fn fetch(&self) -> Result<PostRecord> {
        let target_url = self.url()?;
        let records: Option<Vec<PostRecord>> = self.transport.fetch_json(&target_url).await?;
        let mut records = records.unwrap_or_default().into_iter();
        let record = records.next().ok_or(Error::PostNotFound(self.id))?;
        if record.id != self.id {
            warn!("asked for post {}, the API answered with post {}", self.id, record.id);
        }
        Ok(record)
    }

    /// Download the image of this post into `directory`, creating it if needed.
    pub async fn download(&self, directory: impl Into<PathBuf>) -> Result<Downloaded> {
        let record = self.fetch().await?;
        Downloader::session(self.transport, directory)
            .ensure()
            .await?
            .save(&record)
            .await
    }
}

/// The maximum page size the API accepts.
pub const MAX_LIMIT: u64 = 100;

/// One page of a tag search.
///
/// See <https://safebooru.org/index.php?page=help&topic=dapi> for arguments.
///
/// # Example
///
/// ```no_run
/// use safebooru_dl::api::TagQuery;
/// use safebooru_dl::transport::ReqwestTransport;
///
/// #[tokio::main]
/// async fn main() -> safebooru_dl::Result<()> {
///     let transport = ReqwestTransport::new()?;
///     let query = TagQuery::new(&transport, "cat_ears smile", 0).with_limit(10);
///
///     for record in query.page().await? {
///         println!("#{} {}", record.id, record.image);
///     }
///
///     let summary = query.download_all(None).await?;
///     println!("{summary}");
///     Ok(())
/// }
/// ```
pub struct TagQuery<'a, T> {
    transport: &'a T,
    tags: &'a str,
    pid: u64,
    limit: Option<u64>,
}

impl<'a, T: Transport> TagQuery<'a, T> {
    /// `pid` is the zero-based page index.
    pub fn new(transport: &'a T, tags: &'a str, pid: u64) -> Self {
        Self {
            transport,
            tags,
            pid,
            limit: None,
        }
    }

    /// Ask for `limit` posts per page instead of the API default.
    ///
    /// `limit` is checked by [`Self::url`].
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The raw tag string of this query.
    pub fn tags(&self) -> &str {
        self.tags
    }

    /// The zero-based page index of this query.
    pub fn pid(&self) -> u64 {
        self.pid
    }

    /// The search URL of this page.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQuery`] if `tags` is empty, or the limit is not in the range `1..=100`.
    pub fn url(&self) -> Result<Url> {
        if self.tags.is_empty() {
            return Err(Error::InvalidQuery("tags cannot be empty"));
        }
        let mut target_url = url::API_URL.clone();
        target_url
            .query_pairs_mut()
            .append_pair("tags", self.tags)
            .append_pair("pid", &self.pid.to_string());
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(Error::InvalidQuery("limit can only be between 1 and 100"));
            }
            target_url
                .query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        Ok(target_url)
    }

    /// The directory [`Self::download_all`] uses when none is given: `page_<pid>`.
    pub fn default_dir(&self) -> PathBuf {
        PathBuf::from(format!("page_{}", self.pid))
    }

    /// Fetch every record of this page, in the order of the API.
    ///
    /// A page without matches is an empty vector.
    pub async fn page(&self) -> Result<Vec<PostRecord>> {
        let target_url = self.url()?;
        let records: Option<Vec<PostRecord>> = self.transport.fetch_json(&target_url).await?;
        let records = records.unwrap_or_default();
        debug!("page {} of `{}` has {} posts", self.pid, self.tags, records.len());
        Ok(records)
    }

    /// Fetch this page and return the record at the zero-based `index`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if the page has `index` posts or less.
    pub async fn get_post(&self, index: usize) -> Result<PostRecord> {
        let mut records = self.page().await?;
        let len = records.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        Ok(records.swap_remove(index))
    }

    /// The full [`Post`] behind the record at `index`.
    pub async fn resolve(&self, index: usize) -> Result<Post<'a, T>> {
        let record = self.get_post(index).await?;
        Ok(Post::new(self.transport, record.id))
    }

    /// Download the image of the record at `index` into `directory`.
    pub async fn download(&self, index: usize, directory: impl Into<PathBuf>) -> Result<Downloaded> {
        self.resolve(index).await?.download(directory).await
    }

    /// A [`Scheduler`] over every record of this page, writing into `directory`
    /// or [`Self::default_dir`].
    pub async fn scheduler(&self, directory: Option<&Path>) -> Result<Scheduler<'a, T>> {
        let download_dir = directory.map_or_else(|| self.default_dir(), Path::to_path_buf);
        let records = self.page().await?;
        Scheduler::build(self.transport, download_dir, records).await
    }

    /// Download every image of this page one after another.
    ///
    /// Stops at the first error.
    pub async fn download_all(&self, directory: Option<&Path>) -> Result<Summary> {
        self.scheduler(directory).await?.launch().await
    }
}
