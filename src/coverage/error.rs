/// Error type for the fallible edges of the coverage engine.
///
/// Routing and assignment never fail: an unreachable pair is `f32::INFINITY`
/// and an unserved target is simply absent from the tier maps. Only config
/// loading and raster image construction can produce a `CoverageError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("config field `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: &'static str },

    #[error("raster buffer holds {actual} bytes, expected {expected} for RGBA8")]
    ImageSize { expected: usize, actual: usize },

    #[error("raster image has zero width or height")]
    EmptyImage,
}

pub type CoverageResult<T> = Result<T, CoverageError>;
