use crate::configuration::Configuration;
use clap::Parser;
use std::path::PathBuf;

/// Appointment slot booking server
///
/// The backend is chosen by what is configured: a database URL selects
/// PostgreSQL, otherwise a data file selects the JSON file store, otherwise
/// slots are kept in memory only.
#[derive(Parser, Debug, Clone)]
#[command(name = "slot_booker", version, long_about = None)]
pub struct ConfigurationHandler {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of pooled database connections
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 10)]
    pool_size: u32,

    /// JSON file holding slots and bookings when no database is configured
    #[arg(long, env = "DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Directory with static frontend files
    #[arg(long, env = "PUBLIC_DIR")]
    public_dir: Option<PathBuf>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> u16 {
        self.port
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone().filter(|url| !url.is_empty())
    }

    fn database_pool_size(&self) -> u32 {
        self.pool_size
    }

    fn data_file(&self) -> Option<PathBuf> {
        self.data_file.clone()
    }

    fn public_dir(&self) -> Option<PathBuf> {
        self.public_dir.clone()
    }
}
