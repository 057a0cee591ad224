//! Splits a multi-station CTD cruise file into one NetCDF file per station.
//!
//! ```no_run
//! # fn main() -> ctd_station_split::Result<()> {
//! use ctd_station_split::{split_archive, Config};
//! let written = split_archive("data/cruise.nc".as_ref(), ".".as_ref(), &Config::default(), chrono::Utc::now())?;
//! println!("{} stations", written.len());
//! # Ok(()) }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use glob::glob;

pub mod archive;
pub mod cf;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod parent;
pub mod policy;
pub mod station;

pub use config::Config;
pub use error::{Result, SplitError};
pub use parent::ParentArchive;
pub use station::{extract_station, StationArchive};

/// Loads and repairs one cruise file, then writes every station under
/// `<output_root>/<id>/`. Nothing is written if loading or repair fails.
pub fn split_archive(
    path: &Path,
    output_root: &Path,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    let parent = ParentArchive::load(path, config)?;
    log::info!(
        "{}: {} stations, output in {}",
        path.display(),
        parent.station_count(),
        parent.identifier(&config.fields)?
    );

    let mut written = Vec::with_capacity(parent.station_count());
    for index in 0..parent.station_count() {
        log::info!("Position: {index}");
        let station = extract_station(&parent, index, config, now)?;
        written.push(station.write(output_root)?);
    }
    Ok(written)
}

/// What a run over several cruise files produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, SplitError)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Splits every cruise file in turn. A failing file is logged and skipped,
/// unless `fail_fast` is set, in which case its error is returned at once.
pub fn split_all(
    parents: &[PathBuf],
    output_root: &Path,
    config: &Config,
    fail_fast: bool,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    for parent in parents {
        log::info!("Parent file: {}", parent.display());
        match split_archive(parent, output_root, config, Utc::now()) {
            Ok(written) => {
                log::info!("{}: {} station files", parent.display(), written.len());
                report.written.extend(written);
            }
            Err(e) => {
                log::error!("{}: {e}", parent.display());
                if fail_fast {
                    return Err(e);
                }
                report.failed.push((parent.clone(), e));
            }
        }
    }
    if !report.is_success() {
        log::error!("{} of {} cruise files failed", report.failed.len(), parents.len());
    }
    Ok(report)
}

/// Entries of `dir`, sorted. Only `*.nc` unless `all_files` is set.
pub fn list_archives(dir: &Path, all_files: bool) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", dir.display());
    let paths = glob(&pattern).map_err(|e| {
        SplitError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })?;

    let mut v = Vec::new();
    for path in paths.filter_map(std::result::Result::ok) {
        let is_nc = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("nc"));
        if all_files || (is_nc && path.is_file()) {
            v.push(path);
        } else {
            log::warn!("skipping {}: not a .nc file", path.display());
        }
    }
    v.sort();
    Ok(v)
}
