//! Configuration management for climap.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cities::{DEFAULT_NATIONAL_TOP, DEFAULT_PER_STATE_TOP};
use crate::error::{ClimapError, Result};
use crate::grid::GridSpec;
use crate::interpolation::EdgePolicy;
use crate::variant::PipelineVariant;

/// Command-line arguments for climap
#[derive(Parser, Debug)]
#[command(name = "climap")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to JSON configuration file
    #[arg(short, long, env = "CLIMAP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLIMAP_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Batch commands and the server
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert raw PRISM rasters into a quantized store
    PreprocessRasters(PreprocessArgs),
    /// Flatten state boundary polygons into a polyline bundle
    ExtractBoundaries(BoundaryArgs),
    /// Select city markers and write them as GeoJSON
    SelectCities(CityArgs),
    /// Serve a preprocessed store over HTTP
    Serve(ServeArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PreprocessArgs {
    /// Directory holding the raw PRISM `<field>/` subdirectories
    #[arg(short, long, env = "CLIMAP_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Store directory to write
    #[arg(short, long, env = "CLIMAP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Constant set to use (compact, consolidated)
    #[arg(long, env = "CLIMAP_VARIANT")]
    pub variant: Option<String>,

    /// Regrid onto a mesh with this step in degrees
    #[arg(long)]
    pub target_step: Option<f64>,

    /// Regrid policy outside the source envelope (nan, clamp, error)
    #[arg(long)]
    pub edge_policy: Option<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct BoundaryArgs {
    /// State boundaries as a shapefile (.shp) or GeoJSON
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Store directory to write `boundaries.arrow` into
    #[arg(short, long, env = "CLIMAP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CityArgs {
    /// City table in CSV form (city, state_name, population, lat, lng)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Store directory to write `cities.geojson` into
    #[arg(short, long, env = "CLIMAP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of most populous cities kept nationally
    #[arg(long)]
    pub national_top: Option<usize>,

    /// Number of most populous cities kept per state
    #[arg(long)]
    pub per_state_top: Option<usize>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Store directory to serve
    pub store_dir: Option<PathBuf>,

    /// Host address to bind to
    #[arg(short = 'H', long, env = "CLIMAP_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CLIMAP_PORT")]
    pub port: Option<u16>,

    /// Number of worker threads
    #[arg(short, long, env = "CLIMAP_WORKERS")]
    pub workers: Option<usize>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Store directory to serve
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

/// Offline pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw PRISM directory
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// Store directory written by every batch command
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Constant set
    #[serde(default)]
    pub variant: PipelineVariant,

    /// Raster grid definition
    #[serde(default)]
    pub grid: GridSpec,

    /// Optional regrid step in degrees
    #[serde(default)]
    pub target_step: Option<f64>,

    /// Regrid edge handling
    #[serde(default)]
    pub edge_policy: EdgePolicy,

    /// State boundary file
    #[serde(default)]
    pub boundaries_input: Option<PathBuf>,

    /// City table
    #[serde(default)]
    pub cities_input: Option<PathBuf>,
}

/// City selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    #[serde(default = "default_national_top")]
    pub national_top: usize,

    #[serde(default = "default_per_state_top")]
    pub per_state_top: usize,
}

/// Online display configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Clip displayed precipitation above this many inches
    #[serde(default)]
    pub precip_cap: Option<f32>,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// City selection configuration
    #[serde(default)]
    pub cities: CityConfig,

    /// Display configuration
    #[serde(default)]
    pub display: DisplayConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        Self::from_args(Args::parse())
    }

    /// Build configuration from already-parsed arguments
    pub fn from_args(args: Args) -> Result<(Self, Command)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(level) = args.log_level {
            config.log_level = level;
        }
        config.apply_command(&args.command)?;

        Ok((config, args.command))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.server.host = other.server.host;
        self.server.port = other.server.port;
        if other.server.workers.is_some() {
            self.server.workers = other.server.workers;
        }
        if other.server.store_dir.is_some() {
            self.server.store_dir = other.server.store_dir;
        }
        self.pipeline = other.pipeline;
        self.cities = other.cities;
        self.display = other.display;
        self.log_level = other.log_level;
    }

    /// Apply subcommand arguments on top of the file configuration
    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::PreprocessRasters(args) => {
                if let Some(dir) = &args.input_dir {
                    self.pipeline.input_dir = Some(dir.clone());
                }
                if let Some(dir) = &args.output_dir {
                    self.pipeline.output_dir = Some(dir.clone());
                }
                if let Some(variant) = &args.variant {
                    self.pipeline.variant = variant.parse()?;
                }
                if args.target_step.is_some() {
                    self.pipeline.target_step = args.target_step;
                }
                if let Some(policy) = &args.edge_policy {
                    self.pipeline.edge_policy = policy.parse()?;
                }
            }
            Command::ExtractBoundaries(args) => {
                if let Some(input) = &args.input {
                    self.pipeline.boundaries_input = Some(input.clone());
                }
                if let Some(dir) = &args.output_dir {
                    self.pipeline.output_dir = Some(dir.clone());
                }
            }
            Command::SelectCities(args) => {
                if let Some(input) = &args.input {
                    self.pipeline.cities_input = Some(input.clone());
                }
                if let Some(dir) = &args.output_dir {
                    self.pipeline.output_dir = Some(dir.clone());
                }
                if let Some(n) = args.national_top {
                    self.cities.national_top = n;
                }
                if let Some(n) = args.per_state_top {
                    self.cities.per_state_top = n;
                }
            }
            Command::Serve(args) => {
                if let Some(dir) = &args.store_dir {
                    self.server.store_dir = Some(dir.clone());
                }
                if let Some(host) = &args.host {
                    self.server.host = host.clone();
                }
                if let Some(port) = args.port {
                    self.server.port = port;
                }
                if args.workers.is_some() {
                    self.server.workers = args.workers;
                }
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate server host (must be a valid IP or hostname)
        if self.server.host.is_empty() {
            return Err(ClimapError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        // Validate port (0 is not a valid port for users)
        if self.server.port == 0 {
            return Err(ClimapError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.workers == Some(0) {
            return Err(ClimapError::Config {
                message: "Worker count must be at least 1".to_string(),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ClimapError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        self.pipeline.grid.validate()?;
        if let Some(step) = self.pipeline.target_step {
            self.pipeline.grid.with_step(step)?;
        }

        if let Some(cap) = self.display.precip_cap {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(ClimapError::Config {
                    message: format!("Precipitation display cap must be positive, got {}", cap),
                });
            }
        }

        Ok(())
    }

    /// Check the settings a particular command needs are present
    pub fn validate_for(&self, command: &Command) -> Result<()> {
        match command {
            Command::PreprocessRasters(_) => {
                require(&self.pipeline.input_dir, "pipeline.input_dir (--input-dir)")?;
                require(&self.pipeline.output_dir, "pipeline.output_dir (--output-dir)")?;
            }
            Command::ExtractBoundaries(_) => {
                require(&self.pipeline.boundaries_input, "pipeline.boundaries_input (--input)")?;
                require(&self.pipeline.output_dir, "pipeline.output_dir (--output-dir)")?;
            }
            Command::SelectCities(_) => {
                require(&self.pipeline.cities_input, "pipeline.cities_input (--input)")?;
                require(&self.pipeline.output_dir, "pipeline.output_dir (--output-dir)")?;
            }
            Command::Serve(_) => {
                require(&self.server.store_dir, "server.store_dir (STORE_DIR)")?;
            }
        }
        Ok(())
    }
}

/// Unwrap a required path setting
pub fn require<'a>(value: &'a Option<PathBuf>, name: &str) -> Result<&'a Path> {
    value.as_deref().ok_or_else(|| ClimapError::Config {
        message: format!("Missing required setting: {}", name),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            cities: CityConfig::default(),
            display: DisplayConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            store_dir: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            variant: PipelineVariant::default(),
            grid: GridSpec::prism(),
            target_step: None,
            edge_policy: EdgePolicy::default(),
            boundaries_input: None,
            cities_input: None,
        }
    }
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            national_top: default_national_top(),
            per_state_top: default_per_state_top(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_national_top() -> usize {
    DEFAULT_NATIONAL_TOP
}

fn default_per_state_top() -> usize {
    DEFAULT_PER_STATE_TOP
}

fn default_log_level() -> String {
    "info".to_string()
}
