use std::path::PathBuf;

use thiserror::Error;

use crate::core::LineId;

pub type PlotResult<T> = Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: i32, height: i32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("line {0} has not been initialized")]
    UnknownLine(LineId),

    #[error("archive i/o failed for `{}`: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed archive: {0}")]
    ArchiveFormat(String),

    #[error("update queue consumer is no longer running")]
    QueueClosed,

    #[error("failed to spawn update queue consumer: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}
