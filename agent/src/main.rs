//! pushdeploy - Entry Point
//!
//! Listens for signed push notifications and keeps a working tree in sync
//! with the pushed branch.

use std::collections::HashMap;
use std::env;

use colored::Colorize;
use secrecy::ExposeSecret;
use tracing::{error, info};

use pushdeploy::app::options::AppOptions;
use pushdeploy::app::run::run;
use pushdeploy::filesys::file::File;
use pushdeploy::logs::{init_logging, LogOptions};
use pushdeploy::storage::layout::StorageLayout;
use pushdeploy::storage::settings::Settings;
use pushdeploy::utils::version_info;
use pushdeploy::webhook::signature::sign;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Retrieve the settings file
    let settings_file = match cli_args.get("config") {
        Some(path) => File::new(path),
        None => StorageLayout::default().settings_file(),
    };
    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Validate the configuration and exit
    if cli_args.contains_key("check") {
        print_check(&settings_file, &settings);
        return;
    }

    // Print the signature header for a payload file
    if let Some(payload_path) = cli_args.get("sign") {
        match File::new(payload_path).read_bytes().await {
            Ok(payload) => println!(
                "{}",
                sign(settings.deployment.secret.expose_secret().as_bytes(), &payload)
            ),
            Err(e) => {
                eprintln!("{} unable to read {}: {}", "error:".red().bold(), payload_path, e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the server
    let options = AppOptions::from_settings(&settings);
    info!(
        "Running pushdeploy {} ({}) with options: {:?}",
        version.version, version.git_hash, options
    );
    if let Err(e) = run(options, settings, await_shutdown_signal()).await {
        error!("Failed to run the agent: {e}");
        std::process::exit(1);
    }
}

fn print_check(settings_file: &File, settings: &Settings) {
    let deployment = &settings.deployment;
    println!(
        "{} {}",
        "configuration OK:".green().bold(),
        settings_file.path().display()
    );
    println!("  repository:  {}", deployment.repository_path.display());
    println!(
        "  deploys:     {}/{}",
        deployment.remote, deployment.target_branch
    );
    println!("  audit log:   {}", deployment.log_file.display());
    println!(
        "  listening:   {}:{}{}",
        settings.server.host, settings.server.port, settings.server.webhook_path
    );
    if deployment.maintenance_mode {
        println!("  {}", "maintenance mode is ON".yellow());
    }
    if settings.notify.is_enabled() {
        println!("  notify:      {}", settings.notify.email);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
