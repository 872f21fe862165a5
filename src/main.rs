use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use colored::*;
use std::path::PathBuf;

use portwatch::{
    config::WatchConfig,
    logging,
    monitor::Monitor,
    output::{print_report, OutputFormat},
    targets::TargetRegistry,
};
use tokio_util::sync::CancellationToken;

fn cli() -> Command {
    Command::new("portwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watches hosts for newly opened TCP ports and alerts on them")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Scan only this host. A host missing from the config uses the default ports and gets its own baseline file in state_dir. Scans every configured target when omitted")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: ~/.portwatch.toml)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Keep scanning every interval_secs until interrupted")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_name("PORTS")
                .help("Default port range, e.g. 1-1024 or 22,80,443"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Probe timeout in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_name("N")
                .help("Simultaneous connection attempts per target")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .value_name("DIR")
                .help("Directory for per-target baselines")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("webhook")
                .long("webhook")
                .value_name("URL")
                .help("Send alerts to this webhook"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .help("Report format: text or json")
                .default_value("text")
                .value_parser(|s: &str| s.parse::<OutputFormat>()),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
}

fn load_config(matches: &clap::ArgMatches) -> anyhow::Result<WatchConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => WatchConfig::from_toml_file(path)?,
        None => WatchConfig::load_default_config()?,
    };

    if let Some(ports) = matches.get_one::<String>("ports") {
        config = config.with_default_ports(ports.clone());
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(timeout);
    }
    if let Some(&concurrency) = matches.get_one::<usize>("concurrency") {
        config = config.with_concurrency(concurrency);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("state-dir") {
        config = config.with_state_dir(dir.clone());
    }
    if let Some(url) = matches.get_one::<String>("webhook") {
        config = config.with_webhook(url.clone());
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    if matches.get_flag("no-color") {
        colored::control::set_override(false);
    }

    let config = load_config(&matches)?;
    logging::init(&config.logging).context("Failed to initialise logging")?;

    let (registry, rejected) = TargetRegistry::from_config(&config)?;
    for skipped in &rejected {
        eprintln!(
            "{} {} {}",
            "[!] Skipping".bright_yellow(),
            skipped.host.bright_cyan(),
            skipped.error
        );
    }

    let targets = match matches.get_one::<String>("target") {
        Some(host) => vec![registry.resolve(host)?],
        None => registry.targets().to_vec(),
    };
    if targets.is_empty() {
        eprintln!("{}", "[!] No targets configured. Add `domains` or [[targets]] to the config, or pass a TARGET.".bright_yellow());
        return Ok(());
    }

    let monitor = Monitor::from_config(&config)?;
    let format = matches
        .get_one::<OutputFormat>("output")
        .copied()
        .unwrap_or_default();

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "[~] Interrupted, stopping after in-flight probes...".bright_blue());
            cancel_for_signal.cancel();
        }
    });

    if matches.get_flag("watch") {
        log::info!(
            "Watching {} target(s) every {}s",
            targets.len(),
            config.interval_secs
        );
        let cycles = monitor
            .watch(&targets, config.interval(), &cancel, |report| print_report(report, format))
            .await;
        log::info!("Stopped after {} complete cycle(s)", cycles);
    } else {
        for report in monitor.run_all(&targets, &cancel).await {
            print_report(&report, format);
        }
    }

    Ok(())
}
