// crates/maft-client/src/lib.rs

//! Client side of the transfer protocol: compute a directory's batch
//! root before uploading, upload the batch, download single files with
//! their proofs, and verify downloads against the retained root without
//! trusting the server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod dir;
pub mod http;
pub mod root;
pub mod verify;

pub use dir::enumerate_files;
pub use http::ApiClient;
pub use root::root_over_dir;
pub use verify::verify_file;

/// Default name of the root sidecar written next to the working directory.
pub const ROOT_SIDECAR: &str = "merkle_root";
