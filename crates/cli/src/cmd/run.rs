//! Feed stdin lines through a debounced state

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use settle_core::{DebouncedState, TokioScheduler};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::input::Input;
use crate::util;

/// Upper bound on the end-of-input wait, beyond the delay itself
const DRAIN_GRACE: Duration = Duration::from_secs(5);

pub async fn run(
    config_path: Option<&Path>,
    delay_ms: Option<i64>,
    initial: String,
) -> Result<()> {
    let config = util::resolve_config(config_path, delay_ms)?;
    let scheduler = TokioScheduler::current().context("Failed to attach to tokio runtime")?;

    // Latest value the observer has printed
    let (settled_tx, settled_rx) = watch::channel(None::<String>);

    let state = DebouncedState::builder(initial)
        .config(&config)
        .on_settle(move |value: &String| {
            println!("{} {}", "settled".green(), value);
            settled_tx.send_replace(Some(value.clone()));
        })
        .build(Arc::new(scheduler));

    info!("Debouncing stdin (delay: {:?})", state.delay());

    // Last value passed to set_value that a reset has not overridden
    let mut awaiting: Option<String> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        };

        let Some(line) = line else {
            if let Some(last) = awaiting.take() {
                drain(settled_rx.clone(), last, state.delay()).await;
            }
            break;
        };

        match Input::parse(&line) {
            Input::Set(value) => {
                println!("{} {}", "live".dimmed(), value);
                state.set_value(value.clone());
                awaiting = Some(value);
            }
            Input::Reset(value) => {
                println!("{} {}", "reset".yellow(), value);
                state.reset(value);
                awaiting = None;
            }
            Input::Quit => break,
        }
    }

    let (value, debounced) = state.snapshot();
    println!("{} live={:?} settled={:?}", "final".bold(), value, debounced);
    state.teardown();

    Ok(())
}

/// At end of input, wait until the observer has printed `last`
///
/// Bounded by the delay plus a grace period, and cut short by Ctrl-C.
async fn drain(mut settled: watch::Receiver<Option<String>>, last: String, delay: Duration) {
    let printed = settled.wait_for(|value| value.as_deref() == Some(last.as_str()));

    tokio::select! {
        outcome = tokio::time::timeout(delay + DRAIN_GRACE, printed) => {
            if !matches!(outcome, Ok(Ok(_))) {
                warn!("Gave up waiting for the last value to settle");
            }
        }
        _ = tokio::signal::ctrl_c() => debug!("Interrupted while draining"),
    }
}
