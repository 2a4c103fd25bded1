// These Clippy lints are disabled because this is a CLI binary, not a library:
// - print_stdout/print_stderr: CLI tools are expected to print to stdout/stderr for user output.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod logging;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(cli::EXIT_FATAL)
        }
    }
}
