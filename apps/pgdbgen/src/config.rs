//! Run configuration: command line flags, an optional YAML file, and defaults.
//!
//! A flag given on the command line wins over the same key in the YAML file,
//! which wins over the built-in default. The merged result is validated once,
//! before anything connects or generates.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use tokio_postgres::Config as PostgresConfig;

use crate::derive::BackdateRanges;
use crate::error::{GeneratorError, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_USER: &str = "postgres";
pub const DEFAULT_PASSWORD: &str = "postgres";
pub const DEFAULT_DBNAME: &str = "mytestdb";
pub const DEFAULT_NUM_WORKERS: usize = 3;
pub const DEFAULT_RECORDS: u64 = 100;
pub const DEFAULT_PCENT_OUTPUT: u64 = 10;

#[derive(Parser, Debug)]
#[command(author, version, about = "Populate a PostgreSQL database with synthetic accounts, products and payments", long_about = None)]
pub struct Args {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Host address
    #[arg(long)]
    pub host: Option<String>,
    /// Port number
    #[arg(long)]
    pub port: Option<u16>,
    /// Database admin user
    #[arg(long)]
    pub user: Option<String>,
    /// Database admin password
    #[arg(long)]
    pub password: Option<String>,
    /// Database name to generate
    #[arg(long)]
    pub dbname: Option<String>,
    /// Log every derived field of every record
    #[arg(long, alias = "runOnlyFaker", alias = "verbose")]
    pub run_only_faker: bool,
    /// Number of concurrent workers
    #[arg(long, alias = "numWorkers")]
    pub num_workers: Option<usize>,
    /// Number of records to add
    #[arg(long = "records", alias = "dbRecords2Process", alias = "db-records2-process")]
    pub records: Option<u64>,
    /// Print progress every x% of the records
    #[arg(long, alias = "pcentOutput")]
    pub pcent_output: Option<u64>,
    /// Minimum account age at purchase time, in seconds (default 3 days)
    #[arg(long, alias = "minDays", allow_negative_numbers = true)]
    pub min_days: Option<i64>,
    /// Maximum account age at purchase time, in seconds (default 1 year)
    #[arg(long, alias = "maxDays", allow_negative_numbers = true)]
    pub max_days: Option<i64>,
    /// Maximum gap between last login and purchase, in seconds
    #[arg(long, alias = "delayLastLogin", allow_negative_numbers = true)]
    pub delay_last_login: Option<i64>,
    /// Seed for reproducible runs (each worker uses seed + worker id)
    #[arg(long)]
    pub seed: Option<u64>,
    /// Capacity of the queue between the dispatcher and the workers
    #[arg(long, alias = "queueDepth")]
    pub queue_depth: Option<usize>,
}

/// Keys accepted in the YAML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    pub run_only_faker: Option<bool>,
    pub num_workers: Option<usize>,
    #[serde(alias = "dbRecords2Process")]
    pub records: Option<u64>,
    pub pcent_output: Option<u64>,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
    pub delay_last_login: Option<i64>,
    pub seed: Option<u64>,
    pub queue_depth: Option<usize>,
}

impl FileConfig {
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GeneratorError::ConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| GeneratorError::ConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl DatabaseConfig {
    /// Connection settings for the configured database.
    pub fn postgres_config(&self) -> PostgresConfig {
        self.postgres_config_for(&self.dbname)
    }

    /// Connection settings for another database on the same server.
    pub fn postgres_config_for(&self, dbname: &str) -> PostgresConfig {
        let mut config = PostgresConfig::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(dbname);
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Everything the worker pool needs to run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub verbose: bool,
    pub num_workers: usize,
    pub records: u64,
    pub pcent_output: u64,
    pub ranges: BackdateRanges,
    pub seed: Option<u64>,
    pub queue_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            num_workers: DEFAULT_NUM_WORKERS,
            records: DEFAULT_RECORDS,
            pcent_output: DEFAULT_PCENT_OUTPUT,
            ranges: BackdateRanges::default(),
            seed: None,
            queue_depth: DEFAULT_NUM_WORKERS,
        }
    }
}

impl RunConfig {
    /// Records between two progress lines: `records / (100 / pcent_output)`, at least 1.
    pub fn progress_interval(&self) -> u64 {
        let steps = (100 / self.pcent_output.max(1)).max(1);
        (self.records / steps).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(GeneratorError::Config("numWorkers must be at least 1".to_string()));
        }
        if self.queue_depth == 0 {
            return Err(GeneratorError::Config("queueDepth must be at least 1".to_string()));
        }
        if !(1..=100).contains(&self.pcent_output) {
            return Err(GeneratorError::Config(format!(
                "pcentOutput must be between 1 and 100, got {}",
                self.pcent_output
            )));
        }
        if self.ranges.min_days < 0 {
            return Err(GeneratorError::Config(format!(
                "minDays must not be negative, got {}",
                self.ranges.min_days
            )));
        }
        if self.ranges.min_days > self.ranges.max_days {
            return Err(GeneratorError::Config(format!(
                "minDays ({}) must not exceed maxDays ({})",
                self.ranges.min_days, self.ranges.max_days
            )));
        }
        if self.ranges.delay_last_login < 1 {
            return Err(GeneratorError::Config(format!(
                "delayLastLogin must be at least 1, got {}",
                self.ranges.delay_last_login
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub database: DatabaseConfig,
    pub run: RunConfig,
}

impl GeneratorConfig {
    /// Parse the command line, overlay the YAML file if one is named, and validate.
    pub fn load() -> Result<Self> {
        let args = Args::parse();
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: Args, file: FileConfig) -> Result<Self> {
        let defaults = BackdateRanges::default();
        let num_workers = args.num_workers.or(file.num_workers).unwrap_or(DEFAULT_NUM_WORKERS);

        let config = Self {
            database: DatabaseConfig {
                host: args.host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
                user: args.user.or(file.user).unwrap_or_else(|| DEFAULT_USER.to_string()),
                password: args
                    .password
                    .or(file.password)
                    .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
                dbname: args.dbname.or(file.dbname).unwrap_or_else(|| DEFAULT_DBNAME.to_string()),
            },
            run: RunConfig {
                verbose: args.run_only_faker || file.run_only_faker.unwrap_or(false),
                num_workers,
                records: args.records.or(file.records).unwrap_or(DEFAULT_RECORDS),
                pcent_output: args
                    .pcent_output
                    .or(file.pcent_output)
                    .unwrap_or(DEFAULT_PCENT_OUTPUT),
                ranges: BackdateRanges {
                    min_days: args.min_days.or(file.min_days).unwrap_or(defaults.min_days),
                    max_days: args.max_days.or(file.max_days).unwrap_or(defaults.max_days),
                    delay_last_login: args
                        .delay_last_login
                        .or(file.delay_last_login)
                        .unwrap_or(defaults.delay_last_login),
                },
                seed: args.seed.or(file.seed),
                queue_depth: args.queue_depth.or(file.queue_depth).unwrap_or(num_workers),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("host", &self.database.host),
            ("user", &self.database.user),
            ("dbname", &self.database.dbname),
        ] {
            if value.trim().is_empty() {
                return Err(GeneratorError::Config(format!("{} must not be empty", key)));
            }
        }
        self.run.validate()
    }
}
