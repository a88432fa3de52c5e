// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tcg_eventlog::{read, Eventlog, LogFormat, ParserConfig};

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Legacy,
    CryptoAgile,
}

impl From<FormatArg> for LogFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => LogFormat::Auto,
            FormatArg::Legacy => LogFormat::Legacy,
            FormatArg::CryptoAgile => LogFormat::CryptoAgile,
        }
    }
}

/// Dump, check and replay a TCG measured-boot event log.
#[derive(Parser)]
#[command(name = "eventlog-dump", version)]
struct Cli {
    /// Event log to read; defaults to the TPM log in securityfs.
    path: Option<PathBuf>,

    /// Read the confidential computing event log (CCEL) instead.
    #[arg(long, conflicts_with = "path")]
    ccel: bool,

    /// JSON file with parser limits and options.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Do not recompute event digests.
    #[arg(long)]
    no_verify: bool,

    /// Print the decoded log as JSON.
    #[arg(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> Result<ParserConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_str(&raw).context("parse parser config")?
        }
        None => ParserConfig::default(),
    };
    if let Some(format) = cli.format {
        config.format = format.into();
    }
    if cli.no_verify {
        config.verify_digests = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let data = if cli.ccel {
        info!("read td: {}", read::CCEL_PATH);
        read::read_ccel()?
    } else {
        let path = cli
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(read::BIOS_MEASUREMENTS_PATH));
        info!("read event log: {}", path.display());
        read::read_log_file(&path)?
    };

    let event_log = Eventlog::parse(&data, &config).context("decode event log")?;
    let banks = event_log.replay()?;

    if cli.json {
        let mut json = event_log.to_json()?;
        json["pcrs"] = serde_json::to_value(&banks)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", event_log);
        println!("{}", banks);
    }

    let failures = event_log.hash_failures();
    for failure in &failures {
        warn!("{}", failure);
    }
    info!(
        "{} records, {} digest mismatches",
        event_log.log.len(),
        failures.len()
    );
    Ok(())
}
