use std::{fs::read_to_string, net::IpAddr, str::FromStr, time::Duration};

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;

use engine::{DEVICE_SIMULATION_MODE, SimulationOptions};

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    ///
    /// log level
    ///
    /// An enum representing the available verbosity levels of the logger.
    ///
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Simulation {
    ///
    /// object handling mode
    ///
    /// Only the device simulation mode is supported by this binary; a
    /// configuration carrying any other mode is rejected as a whole.
    ///
    #[serde(default = "Simulation::mode")]
    pub mode: String,
    ///
    /// Number of mixer channels the simulation populates and ticks.
    ///
    #[serde(default = "Simulation::channel_count")]
    pub channel_count: u16,
    ///
    /// Number of coordinate mapping areas the simulation populates.
    ///
    #[serde(default = "Simulation::mapping_count")]
    pub mapping_count: u16,
    ///
    /// Cadence of the simulated value generator in milliseconds. Zero
    /// disables ticking; the store then only changes through writes.
    ///
    #[serde(default = "Simulation::refresh_interval")]
    pub refresh_interval: u64,
}

impl Simulation {
    pub fn options(&self) -> SimulationOptions {
        SimulationOptions {
            channel_count: self.channel_count,
            mapping_count: self.mapping_count,
            refresh_interval: Duration::from_millis(self.refresh_interval),
        }
    }

    fn mode() -> String {
        DEVICE_SIMULATION_MODE.to_string()
    }

    fn channel_count() -> u16 {
        64
    }

    fn mapping_count() -> u16 {
        1
    }

    fn refresh_interval() -> u64 {
        50
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            mode: Self::mode(),
            channel_count: Self::channel_count(),
            mapping_count: Self::mapping_count(),
            refresh_interval: Self::refresh_interval(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Rttrpm {
    ///
    /// The local port the tracking system sends its UDP datagrams to.
    ///
    pub port: u16,
    ///
    /// Coordinate mapping area applied to every address produced from
    /// tracker data; -1 means tracker coordinates are absolute.
    ///
    pub mapping_area: i32,
    ///
    /// Only accept datagrams from this sender. Omitted accepts any sender.
    ///
    #[serde(default)]
    pub expected_sender_ip: Option<IpAddr>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub simulation: Simulation,
    #[serde(default)]
    pub rttrpm: Option<Rttrpm>,
}

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    ///
    /// Specify the configuration file path
    ///
    /// Example: showbridge --config /etc/showbridge/config.json5
    ///
    #[arg(long, short)]
    config: String,
}

impl Config {
    ///
    /// Load configure from config file and command line parameters.
    ///
    pub fn load() -> Result<Self> {
        Self::from_json5(&read_to_string(Cli::parse().config)?)
    }

    ///
    /// Parse and validate a configuration source. Rejecting leaves the
    /// caller's previous configuration untouched.
    ///
    pub fn from_json5(source: &str) -> Result<Self> {
        let config: Self = serde_json5::from_str(source)?;
        if config.simulation.mode != DEVICE_SIMULATION_MODE {
            anyhow::bail!(
                "unsupported object handling mode: {}",
                config.simulation.mode
            );
        }

        Ok(config)
    }
}
