use std::path::PathBuf;

use manet_abstract::{ConfigError, EngineError};
use thiserror::Error;

/// Fatal failure of an experiment run: either the configuration never made
/// it past validation, or the engine rejected or aborted the timeline.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Failure to write the tabular export. Degrades gracefully: the console
/// summary already produced stays valid.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not write metrics file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
