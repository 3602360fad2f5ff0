//! `sondebridge` - CLI for the Horus to BaseStation bridge
//!
//! This binary runs the bridge in the foreground and provides commands to
//! inspect the identifier cache and the configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use chrono::Local;
use clap::Parser;

use sondebridge::cli::{CacheCommand, Cli, Command, ConfigCommand, RunCommand};
use sondebridge::identifier::TIMESTAMP_FORMAT;
use sondebridge::{daemon, init_logging, Config, IdentifierCache};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), cli.echo_messages);

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Run(run_cmd) => handle_run(config, &run_cmd),
        Command::Cache(cache_cmd) => handle_cache(&config, cache_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_run(mut config: Config, cmd: &RunCommand) -> Result<(), Box<dyn std::error::Error>> {
    cmd.apply(&mut config);
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(daemon::run_until_interrupted(&config))?;
    Ok(())
}

fn handle_cache(config: &Config, cmd: CacheCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CacheCommand::Show { json } => {
            let cache = IdentifierCache::from_config(config)?;
            let records = cache.snapshot()?;
            if json {
                let entries: Vec<_> = records
                    .iter()
                    .map(|(callsign, record)| {
                        serde_json::json!({
                            "callsign": callsign,
                            "icao": record.identifier.as_str(),
                            "last_used": record.last_used.format(TIMESTAMP_FORMAT).to_string(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Identifier cache ({}/{})", records.len(), cache.capacity());
                println!("{}", "-".repeat(44));
                for (callsign, record) in &records {
                    println!(
                        "{:<16} {:<8} {}",
                        callsign,
                        record.identifier.as_str(),
                        record.last_used.format(TIMESTAMP_FORMAT)
                    );
                }
            }
        }
        CacheCommand::Resolve { callsign } => {
            let cache = IdentifierCache::from_config(config)?;
            let identifier = cache.resolve(&callsign, Local::now().naive_local())?;
            println!("{callsign} -> {identifier}");
        }
        CacheCommand::Clear { yes } => {
            if yes {
                let cache = IdentifierCache::from_config(config)?;
                let removed = cache.clear()?;
                println!("Removed {removed} identifier assignments.");
            } else {
                println!("This will forget every callsign to identifier assignment.");
                println!("Use --yes to confirm.");
            }
        }
        CacheCommand::Path => {
            println!("{}", config.cache_path().display());
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Listener]");
                println!("  Listen address:     {}", config.listen_addr());
                println!("  Max datagram bytes: {}", config.listener.max_datagram_bytes);
                println!("  Queue capacity:     {}", config.listener.queue_capacity);
                println!("  Shared port:        {}", config.listener.reuse_port);
                println!();
                println!("[Sink]");
                println!("  Sink address:       {}", config.sink_addr());
                match config.connect_attempts() {
                    Some(n) => println!("  Connect attempts:   {n}"),
                    None => println!("  Connect attempts:   unlimited"),
                }
                println!("  Retry interval (s): {}", config.sink.connect_retry_secs);
                println!("  Write timeout (s):  {}", config.sink.write_timeout_secs);
                println!();
                println!("[Cache]");
                println!("  State file:         {}", config.cache_path().display());
                println!("  Capacity:           {}", config.cache.capacity);
                println!("  Identifier prefix:  {}", config.cache.identifier_prefix);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
