use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "grocery-expiry")]
#[command(about = "Grocery expiry lookup service with next-day expiry alerts")]
pub struct CliArgs {
    #[arg(long, short, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "LISTEN_PORT", help = "HTTP port (overrides the config file)")]
    pub port: Option<u16>,

    #[arg(long, help = "SQLite database path (overrides the config file)")]
    pub database: Option<String>,

    #[arg(long, help = "Run one notification sweep at startup")]
    pub sweep_now: bool,

    #[arg(long, help = "Disable image enrichment")]
    pub no_images: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub log_json: bool,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliArgs {
    pub fn apply(&self, config: &mut super::AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(database) = &self.database {
            config.storage.database_path = database.clone();
        }
        if self.no_images {
            config.image.enabled = false;
        }
    }
}
