use std::path::PathBuf;

use thiserror::Error;

/// Every way a split can fail. All of them are fatal for the archive being processed.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("could not find {0}; is this the right path to your NetCDF file?")]
    NotFound(PathBuf),

    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("netcdf: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("missing variable '{0}'")]
    MissingVariable(String),

    #[error("missing global attribute '{0}'")]
    MissingGlobalAttribute(String),

    #[error("variable '{variable}' is missing attribute '{attribute}'")]
    MissingVariableAttribute { variable: String, attribute: String },

    #[error("attribute '{name}' should be {expected}")]
    AttributeType { name: String, expected: &'static str },

    #[error("not programmed to handle variables with more than 2 dimensions ({0})")]
    TooManyDimensions(String),

    #[error("variable '{variable}' has {found} dimensions, expected {expected}")]
    Dimensionality { variable: String, found: usize, expected: usize },

    #[error("variable '{variable}' runs along '{found}', not the sample axis '{expected}'")]
    SampleAxis { variable: String, found: String, expected: String },

    #[error("variable '{variable}' has unsupported type {kind}")]
    UnsupportedType { variable: String, kind: String },

    #[error("variable '{0}' holds {1} values, expected {2}")]
    Shape(String, usize, usize),

    #[error("cannot decode time units '{0}'")]
    TimeUnits(String),

    #[error("time value {0} is out of range")]
    TimeRange(f64),

    #[error("station {index} does not exist ({count} stations)")]
    StationOutOfRange { index: usize, count: usize },

    #[error("station {0} has no valid pressure samples")]
    EmptyProfile(usize),

    #[error("cannot encode '{variable}' as {target}")]
    Encoding { variable: String, target: &'static str },

    #[error("bad attribute template '{0}'")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, SplitError>;
