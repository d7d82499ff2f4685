//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "built-in defaults"),
    }

    let runtime = &ctx.config.runtime;

    ctx.output.info("");
    ctx.output.info("[runtime]");
    ctx.output.kv("origin", &runtime.origin);
    ctx.output.kv("generation", &runtime.generation);
    ctx.output.kv("manifest_path", &runtime.manifest_path);
    ctx.output.kv("script_path", &runtime.script_path);
    ctx.output.kv("data_endpoint", &runtime.data_endpoint);
    ctx.output.kv("navigation_timeout_ms", &runtime.navigation_timeout_ms.to_string());
    ctx.output.kv("data_timeout_ms", &runtime.data_timeout_ms.to_string());
    ctx.output.kv("image_timeout_ms", &runtime.image_timeout_ms.to_string());
    ctx.output.kv("install_timeout_ms", &runtime.install_timeout_ms.to_string());
    ctx.output.kv("image_retries", &runtime.image_retries.to_string());
    ctx.output.kv("explain_headers", &runtime.explain_headers.to_string());
    ctx.output.kv("query", &format!("{:?}", runtime.query));

    ctx.output.info("");
    ctx.output.info("Denylist:");
    for prefix in &runtime.denylist {
        ctx.output.list_item(prefix);
    }

    ctx.output.info("");
    ctx.output.info("Static prefixes:");
    for prefix in &runtime.static_prefixes {
        ctx.output.list_item(prefix);
    }

    ctx.output.info("");
    ctx.output.info("Shell paths:");
    for path in &runtime.shell_paths {
        ctx.output.list_item(path);
    }

    ctx.output.info("");
    ctx.output.info("[logging]");
    ctx.output.kv("level", &ctx.config.logging.level.to_string());
    ctx.output.kv("format", &format!("{:?}", ctx.config.logging.format));

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("offline.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config()?)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let runtime = &ctx.config.runtime;
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = runtime.validate() {
        ctx.output.error(&format!("Error: {}", e));
        bail!("Configuration is invalid");
    }

    if !runtime.denylist.iter().any(|p| p == &runtime.script_path) {
        warnings.push(format!(
            "denylist does not list script_path '{}'; it is denied regardless",
            runtime.script_path
        ));
    }

    if runtime.static_prefixes.iter().any(|p| runtime.data_endpoint.starts_with(p.as_str())) {
        warnings.push("data_endpoint is under a static prefix; it is still treated as data".to_string());
    }

    if runtime.shell_paths.is_empty() {
        warnings.push("shell_paths is empty; failed navigations go straight to the offline page".to_string());
    }

    if runtime.explain_headers {
        warnings.push("explain_headers is enabled; disable it for production".to_string());
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
