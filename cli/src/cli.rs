//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::builder::FalseyValueParser;

use crate::commands;
use crate::domain::SettingsOverrides;
use crate::infra::config::YamlSettingsStore;
use crate::output::OutputContext;

/// Run bulk torrent downloads on a short-lived DigitalOcean droplet
#[derive(Parser, Debug)]
#[command(name = "dotd", disable_version_flag = true)]
pub struct Cli {
    /// Magnet link to download (repeatable)
    #[arg(short, long = "magnet", value_name = "URI")]
    pub magnets: Vec<String>,

    /// Reuse the running droplet with this public IPv4 address
    #[arg(long, value_name = "ADDRESS")]
    pub ip: Option<String>,

    /// Local directory the finished downloads are synced into
    #[arg(short, long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Droplet size slug, e.g. s-2vcpu-4gb
    #[arg(short, long)]
    pub size: Option<String>,

    /// Print the version and exit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Delete every droplet carrying the configured tag, then exit
    #[arg(long, conflicts_with_all = ["magnets", "ip"])]
    pub cleanup: bool,

    /// Tag to clean up instead of the configured `droplet_tag`
    #[arg(long, requires = "cleanup")]
    pub tag: Option<String>,

    /// Verbose logging, including every remote command
    #[arg(long)]
    pub debug: bool,

    /// Settings file (default: ./do-torrent-downloader.yml, then ~/do-torrent-downloader.yml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,
}

impl Cli {
    /// Execute the requested action.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be loaded or the run fails.
    pub async fn run(self) -> Result<()> {
        if self.version {
            commands::version::run();
            return Ok(());
        }

        let ctx = OutputContext::new(self.no_color, self.quiet);
        let (path, mut settings) = YamlSettingsStore::new(self.config).load()?;
        tracing::info!(path = %path.display(), "settings loaded");
        ctx.kv("config", &path.display().to_string());

        if self.cleanup {
            return commands::cleanup::run(&ctx, &settings, self.tag.as_deref()).await;
        }

        settings.apply(SettingsOverrides {
            size: self.size,
            download_dir: self.download_dir,
        });
        commands::run::run(
            &ctx,
            &settings,
            commands::run::RunArgs {
                magnets: self.magnets,
                ip: self.ip,
            },
        )
        .await
    }
}
