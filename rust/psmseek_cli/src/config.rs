use psmseek::SearchConfig;
use std::path::Path;
use tracing::info;

use crate::cli::SearchArgs;
use crate::errors::CliError;

/// Reads a config file, or falls back to the defaults when none is given.
/// Keys missing from the file take their default value.
pub fn load_config(path: Option<&Path>) -> Result<SearchConfig, CliError> {
    let Some(path) = path else {
        info!("No config file provided, using defaults");
        return Ok(SearchConfig::default());
    };
    let file = std::fs::File::open(path).map_err(|e| CliError::io(e, path))?;
    let config: SearchConfig =
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
            CliError::ParseError {
                msg: format!("{} ({})", e, path.display()),
            }
        })?;
    Ok(config)
}

/// Command line flags win over the config file.
pub fn apply_search_overrides(config: &mut SearchConfig, args: &SearchArgs) {
    if let Some(score_type) = args.score_type {
        config.score_type = score_type;
    }
    if let Some(decoy_sets) = args.decoy_sets {
        config.number_decoy_sets = decoy_sets;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
}

pub fn write_template(output: Option<&Path>) -> Result<(), CliError> {
    let template = serde_json::to_string_pretty(&SearchConfig::default()).map_err(|e| {
        CliError::ParseError { msg: e.to_string() }
    })?;
    match output {
        Some(path) => {
            std::fs::write(path, template).map_err(|e| CliError::io(e, path))?;
            info!("Wrote config template to {}", path.display());
        }
        None => println!("{}", template),
    }
    Ok(())
}
