//! MD5 of files already on disk, to skip images we have downloaded before.

use std::cmp::min;
use std::io::ErrorKind;
use std::path::Path;

use digest::Digest;
use tokio::io::AsyncReadExt;

const DEFAULT_BUF_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Hash the file at `filepath` with `D`, and return the lowercase hex digest.
pub async fn hash_file<D: Digest>(filepath: impl AsRef<Path>) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(filepath).await?;
    let file_size = file.metadata().await?.len();

    // at least one byte, or `read` would always return 0
    let buf_size = min(DEFAULT_BUF_SIZE as u64, file_size).max(1);
    let mut buf = vec![u8::default(); buf_size as usize].into_boxed_slice();
    let mut hasher = D::new();

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(base16ct::lower::encode_string(&hasher.finalize()))
}

/// Whether `filepath` exists and its MD5 equals `md5`.
///
/// A missing file is `Ok(false)`, any other I/O error is returned.
pub async fn md5_matches(filepath: impl AsRef<Path>, md5: &str) -> std::io::Result<bool> {
    type Hasher = md5::Md5;

    match hash_file::<Hasher>(filepath).await {
        Ok(file_md5) => Ok(file_md5.eq_ignore_ascii_case(md5)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
