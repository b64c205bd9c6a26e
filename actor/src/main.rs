//! cfactor - Entry Point
//!
//! Small command line front end over the actor: stage a package, restart an
//! application and wait for it, or delete an application.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use ccv3::{ClientOptions, HttpClient};
use cfactor::config::{default_settings_path, ActorConfig, Config};
use cfactor::logs::{init_logging, LogOptions};
use cfactor::staging::await_staged;
use cfactor::utils::{format_warnings, version_info};
use cfactor::{Actor, ActorError, Warnings};
use colored::Colorize;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
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
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    let settings_path = default_settings_path(|name| env::var(name).ok());
    let config = match ActorConfig::load(&settings_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: config.log_level().clone(),
        json_format: cli_args.contains_key("json-logs"),
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let client_options = ClientOptions {
        skip_ssl_validation: config.skip_ssl_validation(),
        job_polling_interval: config.polling_interval(),
        ..Default::default()
    };
    let token = SecretString::from(config.access_token().expose_secret().to_string());
    let client = match HttpClient::new(config.target(), token, client_options) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create the Cloud Controller client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let actor = Actor::new(Arc::new(client), Arc::new(config));

    tokio::select! {
        code = run_command(&actor, &cli_args) => code,
        _ = await_shutdown_signal() => ExitCode::from(130),
    }
}

async fn run_command(actor: &Actor, cli_args: &HashMap<String, String>) -> ExitCode {
    let (Some(app_name), Some(space_guid)) = (cli_args.get("app"), cli_args.get("space")) else {
        eprintln!("Usage: cfactor (--stage=<package-guid> | --restart | --delete) --app=<name> --space=<guid>");
        return ExitCode::FAILURE;
    };

    let (result, warnings) = if let Some(package_guid) = cli_args.get("stage") {
        stage(actor, package_guid, app_name, space_guid).await
    } else if cli_args.contains_key("restart") {
        restart(actor, app_name, space_guid).await
    } else if cli_args.contains_key("delete") {
        let (result, warnings) = actor.delete_application_by_name_and_space(app_name, space_guid).await;
        (result.map(|()| format!("Deleted app {}", app_name)), warnings)
    } else {
        eprintln!("Nothing to do: pass --stage=<package-guid>, --restart or --delete");
        return ExitCode::FAILURE;
    };

    print_warnings(&warnings);
    match result {
        Ok(summary) => {
            println!("{}", summary.green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.to_string().red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn stage(
    actor: &Actor,
    package_guid: &str,
    app_name: &str,
    space_guid: &str,
) -> (Result<String, ActorError>, Warnings) {
    info!("Staging package {} of app {}", package_guid, app_name);

    let events = actor.stage_package(package_guid, app_name, space_guid);
    let result = await_staged(events, app_name, |warnings| print_warnings(&warnings))
        .await
        .map(|droplet| format!("Staged droplet {} ({})", droplet.guid, droplet.created_at));
    (result, Warnings::new())
}

async fn restart(actor: &Actor, app_name: &str, space_guid: &str) -> (Result<String, ActorError>, Warnings) {
    let (app, mut warnings) = actor.get_application_by_name_and_space(app_name, space_guid).await;
    let app = match app {
        Ok(app) => app,
        Err(e) => return (Err(e), warnings),
    };

    let (result, restart_warnings) = actor
        .restart_application(&app, false, |details| println!("{}", details))
        .await;
    warnings.append(restart_warnings);

    (result.map(|()| format!("App {} is running", app_name)), warnings)
}

fn print_warnings(warnings: &Warnings) {
    for line in format_warnings(warnings) {
        eprintln!("{}", line);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers");
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            return std::future::pending().await;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
