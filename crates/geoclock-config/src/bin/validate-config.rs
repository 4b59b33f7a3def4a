//! Checks a geoclock configuration file and lists the sites it declares.

use geoclock_config::{CURRENT_CONFIG_VERSION, ConfigError};
use geoclock_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-config <config-file>");
            eprintln!();
            eprintln!("Default location: {}", default_config_path().display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    let settings = match geoclock_config::load_config(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => eprintln!("Failed to read file: {}", io_err),
                ConfigError::ParseError(parse_err) => eprintln!("TOML parse error:\n  {}", parse_err),
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => eprintln!(
                    "Unsupported config version: {} (expected {})",
                    ver, CURRENT_CONFIG_VERSION
                ),
            }
            return ExitCode::from(1);
        }
    };

    println!("✓ Configuration is valid");
    println!();
    println!("  Data dir:        {}", settings.service.data_dir.display());
    println!(
        "  Max sample age:  {}s",
        settings.location.max_sample_age.as_secs()
    );
    println!("  Sites:           {}", settings.sites.len());

    for seed in &settings.sites {
        println!(
            "  - {} [{}]: {} within {:.0}m{}",
            seed.id,
            seed.site.location,
            seed.site.name,
            seed.site.radius_meters,
            if seed.active { "" } else { " (inactive)" }
        );
    }

    ExitCode::SUCCESS
}
