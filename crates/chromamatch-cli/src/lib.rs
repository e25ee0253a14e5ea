//! Shared helpers for the chromamatch binaries

pub mod output;
pub mod search;

/// Logging is off unless `verbose`, so stdout stays clean JSON
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
