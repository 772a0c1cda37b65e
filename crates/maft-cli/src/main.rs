// crates/maft-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maft_client::{ApiClient, ROOT_SIDECAR};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "maft",
    about = "Merkle-authenticated file transfer",
    long_about = "Merkle-authenticated file transfer.\n\nUpload a batch of files, keep only its Merkle root, and later verify that any file the server returns is byte-identical to what was uploaded.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Start the file server
    Serve {
        #[command(flatten)]
        config: maft_server::Config,
    },

    /// Upload every file in a directory as one batch
    Upload {
        /// Directory whose regular files form the batch
        dir: PathBuf,

        /// Upload endpoint
        #[arg(long, env = "MAFT_URL", default_value = "http://localhost:8080/file")]
        url: String,
    },

    /// Download one file and its Merkle proof
    Download {
        /// Leaf index of the file within its batch
        index: u64,

        /// Download endpoint
        #[arg(long, env = "MAFT_URL", default_value = "http://localhost:8080/file")]
        url: String,

        /// Directory the file and its `.proof` sidecar are written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Compute the Merkle root over a directory and write the sidecar
    Root {
        /// Directory whose regular files form the batch
        dir: PathBuf,

        /// Where to write the hex root
        #[arg(long, default_value = ROOT_SIDECAR)]
        out: PathBuf,
    },

    /// Verify a downloaded file against its proof and a stored root
    Verify {
        /// The downloaded file
        file: PathBuf,

        /// Its `<index>.proof` sidecar
        proof: PathBuf,

        /// The root sidecar kept from upload time
        #[arg(default_value = ROOT_SIDECAR)]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Serve { config } => serve(config).await,
        Cmd::Upload { dir, url } => upload(dir, url).await,
        Cmd::Download { index, url, out } => download(index, url, out).await,
        Cmd::Root { dir, out } => root(dir, out),
        Cmd::Verify { file, proof, root } => verify(file, proof, root),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

async fn serve(config: maft_server::Config) -> Result<()> {
    info!(
        padding_scheme = maft_merkle::PADDING_SCHEME_VERSION,
        "starting file server"
    );
    maft_server::run(config).await
}

async fn upload(dir: PathBuf, url: String) -> Result<()> {
    let uploaded = ApiClient::new(url)
        .upload_dir(&dir)
        .await
        .with_context(|| format!("uploading {}", dir.display()))?;
    println!("Uploaded {} files from {}", uploaded, dir.display());
    Ok(())
}

async fn download(index: u64, url: String, out: PathBuf) -> Result<()> {
    let (file, proof) = ApiClient::new(url)
        .download(index, &out)
        .await
        .with_context(|| format!("downloading file {index}"))?;
    println!(
        "Downloaded {} with proof {}",
        file.display(),
        proof.display()
    );
    Ok(())
}

fn root(dir: PathBuf, out: PathBuf) -> Result<()> {
    let root = maft_client::root_over_dir(&dir, &out)
        .with_context(|| format!("computing root over {}", dir.display()))?;
    println!("Merkle root: {root}");
    println!("Wrote {}", out.display());
    Ok(())
}

fn verify(file: PathBuf, proof: PathBuf, root: PathBuf) -> Result<()> {
    let valid = maft_client::verify_file(&file, &proof, &root)
        .with_context(|| format!("verifying {}", file.display()))?;
    if valid {
        println!("The file is valid.");
    } else {
        println!("The file is NOT valid.");
        std::process::exit(1);
    }
    Ok(())
}
