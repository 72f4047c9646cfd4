mod cli;
mod settings_file;

use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use harvester_core::HarvestStatus;
use harvester_engine::{export_report, FetchSettings, HarvestHandle, HarvestJob, StopSignal};
use log::LevelFilter;

use crate::cli::{Cli, Command};
use crate::settings_file::{load_settings, save_settings};

const LOG_FILE: &str = "harvester.log";

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    engine_logging::initialize(cli.log.into(), level, Path::new(LOG_FILE));

    let mut stored = load_settings(&cli.settings);
    if let Some(out) = &cli.out {
        stored.output_dir = out.clone();
    }
    let common = cli.command.common();
    if let Some(speed) = common.speed {
        stored.speed = Some(speed.into());
    }

    let (job, base) = match &cli.command {
        Command::Listings(common) => {
            if let Some(cap) = common.cap {
                stored.listings.cap = cap;
            }
            let job = HarvestJob::Listings {
                url: common.url.clone(),
            };
            (job, stored.listings.clone())
        }
        Command::Reviews { common, sort } => {
            if let Some(cap) = common.cap {
                stored.reviews.cap = cap;
            }
            if let Some(sort) = sort {
                stored.sort = (*sort).into();
            }
            let job = HarvestJob::Reviews {
                url: common.url.clone(),
                sort: stored.sort,
            };
            (job, stored.reviews.clone())
        }
    };
    let settings = match stored.speed {
        Some(speed) => base.with_speed(speed),
        None => base,
    };
    settings.validate().context("invalid harvest settings")?;

    if cli.save_settings {
        save_settings(&cli.settings, &stored);
    }

    engine_info!(
        "Harvesting {} from {} (worst case {:?})",
        job.label(),
        job.url(),
        settings.worst_case_wait()
    );
    println!("Harvesting {}. Type 'stop' and Enter to finish early.", job.label());

    let handle = HarvestHandle::spawn(job, settings, FetchSettings::default())
        .context("could not start the harvest thread")?;
    spawn_stop_reader(handle.stop_signal());

    let report = handle
        .wait(|event| println!("{}: {}", event.phase, event.count))
        .context("harvest thread ended without a report")?;

    for warning in report.warnings() {
        println!("warning: {warning}");
    }
    if let Some(problem) = report.problem() {
        println!("{problem}");
    }
    if report.status() == HarvestStatus::Failed {
        return Ok(ExitCode::FAILURE);
    }

    let summary = export_report(&stored.output_dir, &report, &Utc::now().to_rfc3339())
        .context("could not write the export")?;
    println!(
        "{:?}: {} records written to {}",
        report.status(),
        summary.record_count,
        summary.csv_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// Watch stdin for a `stop` line; the harvest keeps what it has.
fn spawn_stop_reader(stop: StopSignal) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("stop") => {
                    engine_info!("Stop requested from the terminal");
                    stop.signal_stop();
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    engine_warn!("Stopped reading stdin: {}", err);
                    break;
                }
            }
        }
    });
}
