//! Command implementations over the driver facade.

use std::path::Path;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use tokio::time::{sleep, Instant};
use tracing::info;

use wslink_driver::{DriverConfig, WeatherStationDriver};
use wslink_hid_common::hidapi_backend::HidApiControl;

use crate::error::CliError;
use crate::output;

/// How long read commands wait for the console to answer. The console
/// transmits current weather roughly every 13 seconds, so a couple of
/// minutes covers a resynchronisation too.
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Load the driver configuration, defaulting when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DriverConfig, CliError> {
    let config = match path {
        None => DriverConfig::default(),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
            serde_json::from_str(&text)
                .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?
        }
    };
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

fn open_driver(config: DriverConfig) -> Result<WeatherStationDriver, CliError> {
    let usb = HidApiControl::open(config.vendor_id, config.product_id)
        .map_err(|e| CliError::TransceiverNotFound(e.to_string()))?;
    WeatherStationDriver::open(config, usb)
        .map_err(|e| CliError::TransceiverNotFound(e.to_string()))
}

/// Poll `probe` until it yields a value or the timeout expires.
async fn wait_for<T>(
    mut probe: impl FnMut() -> Option<T>,
    timeout: Duration,
    what: &str,
) -> Result<T, CliError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe() {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(CliError::Timeout(what.to_string()));
        }
        sleep(Duration::from_millis(250)).await;
    }
}

/// `check-transceiver`: probe presence, print serial and id.
pub async fn check_transceiver(config: DriverConfig, json: bool) -> Result<(), CliError> {
    let driver = open_driver(config)?;
    output::print_transceiver(&driver, json);
    driver.shutdown().await.ok();
    Ok(())
}

/// `pair`: block until the console pairs.
pub async fn pair(
    config: DriverConfig,
    timeout: Option<u64>,
    json: bool,
) -> Result<(), CliError> {
    let timeout_secs = timeout.unwrap_or(config.pairing_timeout);
    let driver = open_driver(config)?;
    if !json {
        println!("press the SET button on the console...");
    }
    let result = driver.pair(timeout_secs * 1000).await;
    match result {
        Ok(()) => {
            info!(id = %driver.get_transceiver_id(), "paired");
            output::print_transceiver(&driver, json);
            driver.shutdown().await.ok();
            Ok(())
        }
        Err(e) => {
            driver.shutdown().await.ok();
            Err(CliError::PairingFailed(e.to_string()))
        }
    }
}

/// `info`: dump the console configuration.
pub async fn info(config: DriverConfig, json: bool) -> Result<(), CliError> {
    let driver = open_driver(config)?;
    let station_config = wait_for(
        || driver.get_config(),
        READ_TIMEOUT,
        "console configuration not received",
    )
    .await;
    let result = station_config.map(|cfg| output::print_config(&cfg, json));
    driver.shutdown().await.ok();
    result
}

/// `current`: print one observation.
pub async fn current(config: DriverConfig, json: bool) -> Result<(), CliError> {
    let driver = open_driver(config)?;
    let observation = wait_for(
        || driver.take_new_observation(),
        READ_TIMEOUT,
        "no current-weather frame received",
    )
    .await;
    let result = observation.map(|obs| output::print_observation(&obs, json));
    driver.shutdown().await.ok();
    result
}

/// `history`: dump N records or the records of the last N minutes.
pub async fn history(
    config: DriverConfig,
    num_records: Option<usize>,
    since_minutes: Option<i64>,
    json: bool,
) -> Result<(), CliError> {
    let driver = open_driver(config)?;
    let since = since_minutes
        .and_then(|m| TimeDelta::try_minutes(m))
        .map(|delta| Local::now().naive_local() - delta);
    driver
        .start_caching_history(since, num_records)
        .map_err(CliError::from)?;

    // Drain until the target is met or the console reports caught-up.
    let deadline = Instant::now() + READ_TIMEOUT;
    loop {
        let done_by_count =
            num_records.is_some_and(|n| driver.get_history_cache_records().len() >= n);
        let caught_up = driver.get_num_history_scanned() > 0
            && driver.get_uncached_history_count() == 0;
        if done_by_count || caught_up {
            break;
        }
        if Instant::now() >= deadline {
            driver.stop_caching_history();
            driver.shutdown().await.ok();
            return Err(CliError::Timeout("history drain incomplete".into()));
        }
        sleep(Duration::from_millis(250)).await;
    }
    driver.stop_caching_history();

    let records = driver.get_history_cache_records();
    output::print_history(&records, json);
    driver.shutdown().await.ok();
    Ok(())
}

/// `set-interval`: change only the archive interval.
pub async fn set_interval(
    config: DriverConfig,
    minutes: u32,
    json: bool,
) -> Result<(), CliError> {
    let driver = open_driver(config)?;
    // Need the console's image first so only the interval changes.
    wait_for(
        || driver.get_config(),
        READ_TIMEOUT,
        "console configuration not received",
    )
    .await?;
    driver.set_interval(minutes).map_err(CliError::from)?;

    // Wait until the console acknowledges the new interval.
    let applied = wait_for(
        || {
            driver
                .get_config()
                .filter(|cfg| cfg.history_interval.minutes() == minutes)
        },
        READ_TIMEOUT,
        "console did not confirm the new interval",
    )
    .await;
    let result = applied.map(|cfg| output::print_config(&cfg, json));
    driver.shutdown().await.ok();
    result
}
