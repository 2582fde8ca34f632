//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{KilnError, KilnResult};
use console::style;
use std::path::PathBuf;

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> KilnResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut config = config.clone();
            set_value(&mut config, &key, &value)?;
            manager.save(&config).await?;
            println!("{} Set {} = {}", style("✓").green(), key, value);
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> KilnResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> KilnResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        println!(
            "{} Config already exists at {}",
            style("!").yellow(),
            path.display()
        );
        println!("  Use --force to overwrite");
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    println!(
        "{} Configuration initialized at {}",
        style("✓").green(),
        path.display()
    );

    Ok(())
}

/// Apply a dot-separated `key = value` assignment to `config`
fn set_value(config: &mut Config, key: &str, value: &str) -> KilnResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(KilnError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )))
            }
        },

        ["cache", "dir"] => config.cache.dir = optional(value).map(PathBuf::from),
        ["cache", "workspace_dir"] => config.cache.workspace_dir = optional(value).map(PathBuf::from),

        ["resolver", "repositories"] => config.resolver.repositories = parse_list(value),
        ["resolver", "timeout_secs"] => config.resolver.timeout_secs = parse_u64(value)?,

        ["compiler", "command"] => config.compiler.command = value.to_string(),
        ["compiler", "extra_args"] => config.compiler.extra_args = parse_list(value),

        ["runtime", "java"] => config.runtime.java = value.to_string(),
        ["runtime", "class_version"] => config.runtime.class_version = optional(value),

        ["bridge", "organization"] => config.bridge.organization = value.to_string(),
        ["bridge", "name"] => config.bridge.name = value.to_string(),
        ["bridge", "revision"] => config.bridge.revision = optional(value),
        ["bridge", "interface_organization"] => {
            config.bridge.interface_organization = value.to_string()
        }
        ["bridge", "interface_name"] => config.bridge.interface_name = value.to_string(),

        _ => {
            return Err(KilnError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "cache.dir",
    "cache.workspace_dir",
    "resolver.repositories",
    "resolver.timeout_secs",
    "compiler.command",
    "compiler.extra_args",
    "runtime.java",
    "runtime.class_version",
    "bridge.organization",
    "bridge.name",
    "bridge.revision",
    "bridge.interface_organization",
    "bridge.interface_name",
];

/// Empty string clears an optional value
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_u64(value: &str) -> KilnResult<u64> {
    value
        .parse()
        .map_err(|_| KilnError::User(format!("Invalid number: {}", value)))
}
