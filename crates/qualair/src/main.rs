//! `qualair` - CLI for the QUALAIR dashboard
//!
//! This binary runs the web dashboard and offers a few commands to inspect
//! the configuration and the measurement database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use qualair::cli::{Cli, Command, ConfigCommand, ServeCommand};
use qualair::{init_logging, web, Config, Database};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    // Execute the command
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, cli.config, config_cmd),
    }
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    cmd.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(web::serve(config))?;
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let db = Database::from_config(config);
    let counts = db.table_counts();

    if json {
        let status = match &counts {
            Ok(counts) => serde_json::json!({
                "database_path": db.path(),
                "available": true,
                "tables": counts,
            }),
            Err(e) => serde_json::json!({
                "database_path": db.path(),
                "available": false,
                "error": e.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("qualair status");
        println!("--------------");
        println!("Database:      {}", db.path().display());
        match &counts {
            Ok(counts) => {
                println!();
                for count in counts {
                    println!("  {:<12} {:>10}", count.table.name(), count.rows);
                }
            }
            Err(e) => println!("Unavailable:   {e}"),
        }
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    config_file: Option<std::path::PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Database]");
                println!("  Path:               {}", config.database_path().display());
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!();
                println!("[Limits]");
                println!("  Table rows:         {}", config.limits.table_rows);
                println!("  Filter rows:        {}", config.limits.filter_rows);
                println!();
                println!("[Report]");
                println!(
                    "  Histogram month:    {}/{:02}",
                    config.report.year, config.report.month
                );
                println!(
                    "  Statistics window:  {} -> {}",
                    config.report.stats_start, config.report.stats_end
                );
                println!();
                println!("[Charts]");
                match &config.charts.font_path {
                    Some(path) => println!("  Font:               {}", path.display()),
                    None => println!("  Font:               (system default)"),
                }
            }
        }
        ConfigCommand::Path => {
            let path = config_file.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_file)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
