use crate::app_state::AppState;
use crate::form_parameters::FormParameters;
use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::env;
use std::fs::File;
use std::path::PathBuf;

pub const CONFIG_ENV_VAR: &str = "WIKIDISCOVER_CONFIG";

/// Runs a single query given as a query string, e.g.
/// `wikidiscover 'action=wikidiscover&state=closed'`, and prints the JSON result.
pub async fn command_line_usage(app_state: &AppState, mut args: env::Args) -> Result<()> {
    let _ = args.next(); // the actual command
    let argument: String = args
        .next()
        .ok_or_else(|| anyhow!("No command line argument provided"))?;

    let form_parameters = FormParameters::outcome_from_query(&argument);
    let response = app_state.process(&form_parameters).await;
    println!("{}", response.s);

    if response.status.is_success() {
        Ok(())
    } else {
        Err(anyhow!("Query failed with status {}", response.status))
    }
}

/// `$WIKIDISCOVER_CONFIG`, or `config.json` in the current directory.
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let basedir = env::current_dir().context("Can't get CWD")?;
    Ok(basedir.join("config.json"))
}

pub fn get_wikidiscover_config() -> Result<Value> {
    let path = config_path()?;
    let file = File::open(&path)
        .with_context(|| format!("Can not open config file at {}", path.display()))?;
    let config: Value = serde_json::from_reader(file)
        .with_context(|| format!("Can not parse JSON from config file {}", path.display()))?;
    if !config.is_object() {
        return Err(anyhow!(
            "Config file {} does not contain a JSON object",
            path.display()
        ));
    }
    Ok(config)
}
