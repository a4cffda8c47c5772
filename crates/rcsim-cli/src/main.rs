//! rcsim command-line interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use rcsim::{
    CancelFlag, Ngspice, RcsConfig, SweepReport, SweepTermination, is_ngspice_available,
    ngspice_version, run_sweep,
};

#[derive(Parser)]
#[command(name = "rcsim")]
#[command(about = "Read-compute-store sweep of an 8T SRAM array through ngspice", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file (fields not given keep their defaults)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Operand width; the array has width+2 rows and width columns
    #[arg(short = 'w', long)]
    bit_width: Option<usize>,

    /// Bit pattern file, one row per line
    #[arg(long, value_name = "FILE")]
    pattern: Option<PathBuf>,

    /// Circuit template containing @PLOT_CMD@ and @MEAS_CMD@ lines
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Digital output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Sample time of the written row (SPICE syntax, e.g. 800p)
    #[arg(long)]
    sample_time: Option<String>,

    /// Voltage threshold for a digital 1
    #[arg(long)]
    threshold: Option<f64>,

    /// ngspice executable
    #[arg(long, value_name = "PATH")]
    ngspice: Option<String>,

    /// Directory for per-iteration ngspice logs
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Also write the sweep report as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Report the ngspice version and exit
    #[arg(long)]
    check: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Defaults, then the config file, then individual flags.
    fn resolve_config(&self) -> Result<RcsConfig> {
        let mut config = match &self.config {
            Some(path) => RcsConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => RcsConfig::default(),
        };

        if let Some(width) = self.bit_width {
            config.bit_width = width;
        }
        if let Some(ref path) = self.pattern {
            config.files.pattern = path.clone();
        }
        if let Some(ref path) = self.template {
            config.files.template = path.clone();
        }
        if let Some(ref path) = self.output {
            config.files.output = path.clone();
        }
        if let Some(ref time) = self.sample_time {
            config.sample_time = time.clone();
        }
        if let Some(threshold) = self.threshold {
            config.digital_threshold = threshold;
        }
        if let Some(ref exe) = self.ngspice {
            config.simulator.executable = exe.clone();
        }
        if let Some(ref dir) = self.log_dir {
            config.files.log_dir = dir.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::builder().filter_level(LevelFilter::Debug).init();
    } else {
        env_logger::builder()
            .filter_level(LevelFilter::Info)
            .parse_default_env()
            .init();
    }

    let config = cli.resolve_config()?;

    if cli.check {
        return check_simulator(&config);
    }

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel())
        .context("Failed to install Ctrl+C handler")?;

    let ngspice = Ngspice::new(config.simulator.clone());
    let report = run_sweep(&config, &ngspice, cancel).context("Sweep failed")?;

    println!();
    println!(
        "Simulation finished. Results written to {}",
        config.files.output.display()
    );
    println!();
    print!("{}", report.to_text());

    if let Some(ref path) = cli.json {
        write_json(&report, path)?;
    }

    Ok(match report.termination {
        SweepTermination::SimulatorMissing => ExitCode::FAILURE,
        SweepTermination::Completed | SweepTermination::Interrupted => ExitCode::SUCCESS,
    })
}

fn check_simulator(config: &RcsConfig) -> Result<ExitCode> {
    if !is_ngspice_available(&config.simulator) {
        eprintln!(
            "Error: {} not found. Make sure it is installed and in your PATH.",
            config.simulator.executable
        );
        return Ok(ExitCode::FAILURE);
    }
    let version = ngspice_version(&config.simulator)?;
    println!("{}", version);
    Ok(ExitCode::SUCCESS)
}

fn write_json(report: &SweepReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "rcsim",
            "--bit-width",
            "4",
            "--threshold",
            "0.8",
            "--sample-time",
            "900p",
            "--ngspice",
            "/opt/ngspice/bin/ngspice",
            "-o",
            "bits.txt",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.bit_width, 4);
        assert_eq!(config.digital_threshold, 0.8);
        assert_eq!(config.sample_time, "900p");
        assert_eq!(config.simulator.executable, "/opt/ngspice/bin/ngspice");
        assert_eq!(config.files.output, PathBuf::from("bits.txt"));
        assert_eq!(config.files.pattern, PathBuf::from("data_in.txt"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["rcsim", "--threshold", "2.5"]);
        assert!(cli.resolve_config().is_err());
    }
}
