//! Binary entrypoint for the `amsync` CLI.

use std::process::ExitCode;

use amsync::Error;

fn main() -> ExitCode {
    // Only supplies environment variables such as AMSYNC_BIND_PASSWORD.
    dotenvy::dotenv().ok();

    // Recording is handled in commands::dispatch via AMSYNC_RECORD=<file>.
    match amsync::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Usage(err)) => err.exit(),
        Err(err) => {
            if tracing::dispatcher::has_been_set() {
                tracing::error!("{err}");
            } else {
                eprintln!("error: {err}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}
