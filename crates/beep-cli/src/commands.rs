//! Subcommands and their execution.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, bail};
use beep_store::prelude::*;
use clap::Subcommand;
use serde_json::{Number, Value};
use tokio::sync::mpsc;

use crate::TRACING_TARGET_COMMAND;
use crate::config::{Cli, parse_json};

/// What to do with the store.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the stored value as JSON (`null` when absent or expired)
    Get,

    /// Store a JSON value
    Set {
        /// Value to store
        #[arg(value_parser = parse_json, allow_hyphen_values = true)]
        value: Value,

        /// Keep the expiry of the existing record
        #[arg(long)]
        preserve_expiry: bool,
    },

    /// Add a number to the current value and print the result
    Update {
        /// Amount to add
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        add: f64,

        /// Keep the expiry of the existing record
        #[arg(long)]
        preserve_expiry: bool,
    },

    /// Remove the stored record
    Delete,

    /// Print whether the stored record had expired when the store was opened
    Expired,

    /// Print value and expiry changes until interrupted
    Watch {
        /// Exit once the record expires
        #[arg(long)]
        until_expired: bool,
    },

    /// Print the formatted current time on every tick
    Clock {
        /// `strftime`-style pattern
        #[arg(long)]
        format: Option<String>,

        /// IANA time zone name (system zone when unset)
        #[arg(long)]
        time_zone: Option<String>,

        /// Milliseconds between ticks
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// Exit after printing this many times
        #[arg(long)]
        ticks: Option<u64>,
    },
}

/// Runs the selected command, printing results to stdout.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    execute_to(cli, &mut io::stdout()).await
}

/// Runs the selected command, writing results to `out`.
pub async fn execute_to(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.command {
        Command::Clock {
            format,
            time_zone,
            interval_ms,
            ticks,
        } => clock(format, time_zone, interval_ms, ticks, out).await,
        command => {
            let backing = cli.medium.open()?;
            let store = LocalStore::from_config(backing, &cli.store, cli.initial);
            on_store(&store, command, out).await
        }
    }
}

async fn on_store(
    store: &LocalStore<Value>,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Get => writeln!(out, "{}", store.get().unwrap_or(Value::Null))?,
        Command::Set {
            value,
            preserve_expiry,
        } => {
            store.set_with(value, SetOptions { preserve_expiry });
            tracing::info!(target: TRACING_TARGET_COMMAND, key = %store.key(), "Value stored");
        }
        Command::Update {
            add,
            preserve_expiry,
        } => {
            add_to(&store.value(), add)?;
            store.update_with(
                |current| add_to(&current, add).unwrap_or(current),
                SetOptions { preserve_expiry },
            );
            writeln!(out, "{}", store.value())?;
        }
        Command::Delete => {
            store.delete();
            tracing::info!(target: TRACING_TARGET_COMMAND, key = %store.key(), "Value deleted");
        }
        // Opening the store already erased a lapsed record and reseeded it,
        // so the answer is the flag taken while loading.
        Command::Expired => writeln!(out, "{}", store.expired().get())?,
        Command::Watch { until_expired } => watch(store, until_expired, out).await?,
        Command::Clock { .. } => bail!("clock does not operate on the store"),
    }

    Ok(())
}

async fn watch(
    store: &LocalStore<Value>,
    until_expired: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if store.expired().get() {
        writeln!(out, "expired true")?;
        if until_expired {
            return Ok(());
        }
    }

    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel::<()>();

    let _value = store.subscribe(|value| println!("value {value}"));
    let _expired = store.expired().subscribe(move |expired| {
        println!("expired {expired}");
        if *expired && until_expired {
            let _ = expired_tx.send(());
        }
    });

    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        key = %store.key(),
        polling = store.is_polling(),
        "Watching store"
    );

    tokio::select! {
        _ = expired_rx.recv() => {}
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
    }

    Ok(())
}

async fn clock(
    format: Option<String>,
    time_zone: Option<String>,
    interval_ms: u64,
    ticks: Option<u64>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut options = TickerOptions::default().with_interval(Duration::from_millis(interval_ms));
    if let Some(format) = format {
        options = options.with_format(format);
    }
    if let Some(time_zone) = time_zone {
        options = options.with_time_zone(time_zone);
    }

    let ticker = ClockTicker::new(options).context("invalid clock options")?;
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let _subscription = ticker.subscribe(move |now| {
        let _ = tx.send(now.clone());
    });

    let mut printed = 0u64;
    loop {
        tokio::select! {
            next = rx.recv() => {
                let Some(now) = next else { break };
                writeln!(out, "{now}")?;
                printed += 1;
                if ticks.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    Ok(())
}

/// Adds `delta` to a numeric (or `null`) JSON value.
fn add_to(current: &Value, delta: f64) -> anyhow::Result<Value> {
    match current {
        Value::Null => number(delta),
        Value::Number(n) => match n.as_i64() {
            Some(i) if delta.fract() == 0.0 && delta.abs() < 9.0e15 => {
                Ok(Value::from(i.saturating_add(delta as i64)))
            }
            _ => number(n.as_f64().unwrap_or_default() + delta),
        },
        other => bail!("current value {other} is not a number"),
    }
}

fn number(value: f64) -> anyhow::Result<Value> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Ok(Value::from(value as i64));
    }

    Number::from_f64(value)
        .map(Value::Number)
        .with_context(|| format!("{value} is not a finite number"))
}
