use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::archive;
use crate::cf;
use crate::config::{Config, FieldNames};
use crate::dataset::Dataset;
use crate::error::{Result, SplitError};
use crate::policy;

/// Lowest and highest pressure found in one station's row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureBounds {
    pub min: f64,
    pub max: f64,
}

/// Per-station position and time, in station order.
#[derive(Debug, Clone, Default)]
pub struct Coordinates {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub times: Vec<DateTime<Utc>>,
}

/// The cruise file, loaded once, repaired once and then only read from.
#[derive(Debug, Clone)]
pub struct ParentArchive {
    pub path: PathBuf,
    pub dataset: Dataset,
    pub coordinates: Coordinates,
    /// `None` for a station whose pressure row holds no valid sample.
    pub pressure_bounds: Vec<Option<PressureBounds>>,
}

impl ParentArchive {
    pub fn load(path: &Path, config: &Config) -> Result<Self> {
        let dataset = archive::read(path)?;
        Self::from_dataset(path, dataset, config)
    }

    /// Repairs the global attributes and derives the per-station arrays.
    pub fn from_dataset(path: &Path, mut dataset: Dataset, config: &Config) -> Result<Self> {
        repair_global_attributes(&mut dataset, config)?;
        let coordinates = collect_coordinates(&dataset, &config.fields)?;
        let pressure_bounds = collect_pressure_bounds(&dataset, &config.fields)?;

        if pressure_bounds.len() != coordinates.latitudes.len() {
            return Err(SplitError::Shape(
                config.fields.pressure.clone(),
                pressure_bounds.len(),
                coordinates.latitudes.len(),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            dataset,
            coordinates,
            pressure_bounds,
        })
    }

    pub fn station_count(&self) -> usize {
        self.coordinates.latitudes.len()
    }

    /// Name of the per-cruise output directory.
    pub fn identifier(&self, fields: &FieldNames) -> Result<&str> {
        self.dataset.attrs.required_text(&fields.identifier)
    }
}

/// Applies the configured rule table to the global attributes. On error the
/// dataset must be discarded.
pub fn repair_global_attributes(dataset: &mut Dataset, config: &Config) -> Result<()> {
    policy::apply_rules(&mut dataset.attrs, &config.global_rules)
}

pub fn collect_coordinates(dataset: &Dataset, fields: &FieldNames) -> Result<Coordinates> {
    let numeric = |name: &str| -> Result<Vec<f64>> {
        dataset
            .required_variable(name)?
            .values
            .as_numeric()
            .map(<[f64]>::to_vec)
            .ok_or_else(|| SplitError::UnsupportedType {
                variable: name.to_string(),
                kind: "text".into(),
            })
    };

    let latitudes = numeric(&fields.latitude)?;
    let longitudes = numeric(&fields.longitude)?;
    let time = dataset.required_variable(&fields.time)?;
    let units = time.required_text("units")?;
    let times = cf::decode_time(&numeric(&fields.time)?, units)?;

    for (name, n) in [(&fields.longitude, longitudes.len()), (&fields.time, times.len())] {
        if n != latitudes.len() {
            return Err(SplitError::Shape(name.clone(), n, latitudes.len()));
        }
    }
    Ok(Coordinates { latitudes, longitudes, times })
}

/// Min and max of each station's pressure row, skipping missing cells.
pub fn collect_pressure_bounds(
    dataset: &Dataset,
    fields: &FieldNames,
) -> Result<Vec<Option<PressureBounds>>> {
    let pres = dataset.required_variable(&fields.pressure)?;
    if pres.ndim() != 2 {
        return Err(SplitError::Dimensionality {
            variable: pres.name.clone(),
            found: pres.ndim(),
            expected: 2,
        });
    }

    let mut bounds = Vec::with_capacity(pres.shape[0]);
    for station in 0..pres.shape[0] {
        let row = pres.row(station).ok_or_else(|| SplitError::MissingVariable(pres.name.clone()))?;
        let row = row.as_numeric().ok_or_else(|| SplitError::UnsupportedType {
            variable: pres.name.clone(),
            kind: "text".into(),
        })?;
        let b = row.iter().filter(|v| !v.is_nan()).fold(None, |acc, &v| match acc {
            None => Some(PressureBounds { min: v, max: v }),
            Some(PressureBounds { min, max }) => Some(PressureBounds {
                min: min.min(v),
                max: max.max(v),
            }),
        });
        bounds.push(b);
    }
    Ok(bounds)
}
