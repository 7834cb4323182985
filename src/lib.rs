#![warn(missing_docs)]

//! <div class="warning">
//!
//! Note: API is unstable, and may change in `0.x` versions.
//!
//! </div>
//!
//! A client for the [Safebooru](https://safebooru.org/) API.
//!
//! # As a library
//!
//! Build a [`transport::ReqwestTransport`], then use [`api::Post`] to look up a post by id,
//! or [`api::TagQuery`] to search a page of posts by tags. Both can download images.
//!
//! See [`api::Post#example`] and [`api::TagQuery#example`] for examples.
//!
//! # As a binary
//!
//! In addition to the above, you also need [`cli`] to build the command line.
//!
//! See `main.rs` to know how to assemble these modules as a binary.

#[cfg(not(any(
    feature = "default-tls",
    feature = "native-tls",
    feature = "native-tls-vendored",
    feature = "native-tls-alpn",
    feature = "rustls-tls",
    feature = "rustls-tls-manual-roots",
    feature = "rustls-tls-webpki-roots",
    feature = "rustls-tls-native-roots",
)))]
compile_error!("at least one `tls` feature must be enabled, safebooru is only served over https");

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod scheduler;
pub mod transport;

pub mod config;
pub mod download;
pub mod error;
pub mod hash;

pub use error::{Error, Result};
