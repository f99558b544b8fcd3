//! Background removal CLI binary
//!
//! Thin wrapper around `cutout::cli`; all behavior lives in the library.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    cutout::cli::main().await
}
