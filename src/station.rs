use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use netcdf::AttributeValue;

use crate::archive;
use crate::cf;
use crate::config::Config;
use crate::dataset::{Attributes, Dataset, Dimension, Variable};
use crate::encoding::{encoding_for, Encoding};
use crate::error::{Result, SplitError};
use crate::parent::{ParentArchive, PressureBounds};

/// `78.3517` → `78-3517`
pub fn coordinate_string(value: f64) -> String {
    format!("{value:.4}").replace('.', "-")
}

/// `2020-10-20T07:35:31Z` → `2020-10-20T07-35-31Z`
pub fn timestamp_string(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H-%M-%SZ").to_string()
}

fn iso_seconds(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ─────────────────────────────────────────────────────────────────────
// Extractor
// ─────────────────────────────────────────────────────────────────────

/// One station of a parent archive, with everything derived from its index.
pub struct Station<'a> {
    parent: &'a ParentArchive,
    config: &'a Config,
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
    pub bounds: PressureBounds,
    pub lat_string: String,
    pub lon_string: String,
    pub timestamp: String,
    pub filename: String,
}

impl<'a> Station<'a> {
    pub fn new(parent: &'a ParentArchive, config: &'a Config, index: usize) -> Result<Self> {
        let count = parent.station_count();
        if index >= count {
            return Err(SplitError::StationOutOfRange { index, count });
        }
        let bounds = parent.pressure_bounds[index].ok_or(SplitError::EmptyProfile(index))?;
        let coords = &parent.coordinates;
        let (latitude, longitude, time) =
            (coords.latitudes[index], coords.longitudes[index], coords.times[index]);

        let lat_string = coordinate_string(latitude);
        let lon_string = coordinate_string(longitude);
        let timestamp = timestamp_string(&time);
        let naming = &config.naming;
        let filename = format!(
            "{}_lat_{lat_string}_lon_{lon_string}_dt_{timestamp}.{}",
            naming.file_prefix, naming.extension
        );

        Ok(Self {
            parent,
            config,
            index,
            latitude,
            longitude,
            time,
            bounds,
            lat_string,
            lon_string,
            timestamp,
            filename,
        })
    }

    /// Filename up to the first dot.
    pub fn title(&self) -> &str {
        self.filename.split('.').next().unwrap_or(&self.filename)
    }

    /// `[i_min, i_max)`: first occurrence of the row minimum up to, but not
    /// including, the first occurrence of the row maximum.
    pub fn window(&self) -> Result<Range<usize>> {
        let fields = &self.config.fields;
        let pres = self.parent.dataset.required_variable(&fields.pressure)?;
        let row = pres
            .row(self.index)
            .ok_or_else(|| SplitError::MissingVariable(pres.name.clone()))?;
        let row = row.as_numeric().ok_or_else(|| SplitError::UnsupportedType {
            variable: pres.name.clone(),
            kind: "text".into(),
        })?;

        let first = |target: f64| row.iter().position(|&v| v == target);
        let (i_min, i_max) = match (first(self.bounds.min), first(self.bounds.max)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(SplitError::EmptyProfile(self.index)),
        };
        if i_max <= i_min {
            log::warn!(
                "station {}: maximum pressure precedes minimum, writing an empty profile",
                self.index
            );
            return Ok(i_min..i_min);
        }
        Ok(i_min..i_max)
    }

    /// Slices every 2-D variable to the station's window along a new pressure
    /// dimension and repairs the copied variable attributes.
    pub fn extract_variables(&self) -> Result<Dataset> {
        let fields = &self.config.fields;
        let window = self.window()?;
        let n = window.len();
        let pres = self.parent.dataset.required_variable(&fields.pressure)?;
        let (axis, axis_len) = (&pres.dims[1], pres.shape[1]);

        let mut sliced = Vec::new();
        for var in self.parent.dataset.data_variables() {
            match var.ndim() {
                2 => {
                    if &var.dims[1] != axis || var.shape[1] != axis_len {
                        return Err(SplitError::SampleAxis {
                            variable: var.name.clone(),
                            found: var.dims[1].clone(),
                            expected: axis.clone(),
                        });
                    }
                    let row = var.row(self.index).ok_or(SplitError::StationOutOfRange {
                        index: self.index,
                        count: var.shape[0],
                    })?;
                    sliced.push((var, row.slice(window.clone())));
                }
                d if d > 2 => return Err(SplitError::TooManyDimensions(var.name.clone())),
                _ => log::debug!("skipping {} ({}-D)", var.name, var.ndim()),
            }
        }

        if !sliced.iter().any(|(v, _)| v.name == fields.pressure) {
            return Err(SplitError::MissingVariable(fields.pressure.clone()));
        }
        let carried: HashSet<&str> = sliced.iter().map(|(v, _)| v.name.as_str()).collect();

        let mut ds = Dataset {
            dims: vec![Dimension { name: fields.pressure.clone(), len: n }],
            ..Dataset::default()
        };
        for (var, values) in &sliced {
            ds.variables.push(Variable {
                name: var.name.clone(),
                dims: vec![fields.pressure.clone()],
                shape: vec![n],
                values: values.clone(),
                attrs: self.repair_variable_attributes(var, &carried),
            });
        }
        Ok(ds)
    }

    fn repair_variable_attributes(&self, var: &Variable, carried: &HashSet<&str>) -> Attributes {
        let fields = &self.config.fields;
        let mut attrs = var.attrs.clone();

        if !fields.is_quality(&var.name) && !fields.is_data_mode(&var.name) {
            attrs.set("coverage_content_type", "physicalMeasurement");
            for key in ["valid_min", "valid_max"] {
                if let Some(scaled) = attrs
                    .get(key)
                    .and_then(|v| cf::scale_attribute(v, self.config.valid_range_scale))
                {
                    attrs.set(key, scaled);
                }
            }
        }

        if let Some(AttributeValue::Str(refs)) = attrs.get(&fields.ancillary_variables).cloned() {
            let kept: Vec<&str> = refs
                .split_whitespace()
                .filter(|r| carried.contains(r))
                .collect();
            if kept.is_empty() {
                attrs.remove(&fields.ancillary_variables);
            } else {
                let kept = kept.join(" ");
                attrs.set(&fields.ancillary_variables, AttributeValue::Str(kept));
            }
        }
        attrs
    }

    /// Parent globals, overwritten with this station's extent and identity.
    pub fn global_attributes(&self, now: DateTime<Utc>) -> Result<Attributes> {
        let fields = &self.config.fields;
        let naming = &self.config.naming;
        let mut attrs = self.parent.dataset.attrs.clone();

        attrs.set("geospatial_lat_min", self.latitude);
        attrs.set("geospatial_lat_max", self.latitude);
        attrs.set("geospatial_lon_min", self.longitude);
        attrs.set("geospatial_lon_max", self.longitude);
        attrs.set("geospatial_vertical_min", self.bounds.min);
        attrs.set("geospatial_vertical_max", self.bounds.max);
        attrs.set("geospatial_vertical_units", naming.vertical_units.as_str());
        attrs.set("geospatial_vertical_resolution", naming.vertical_resolution.as_str());

        let start = iso_seconds(&self.time);
        attrs.set("time_coverage_start", start.as_str());
        attrs.set("time_coverage_end", start.as_str());

        let created = iso_seconds(&now);
        attrs.set("date_created", created.as_str());
        attrs.set("date_update", created.as_str());
        let history = format!(
            "Created at {created} using {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        attrs.set("history", AttributeValue::Str(history));

        let id = format!(
            "{}_{}_{}",
            attrs.required_text(&fields.identifier)?,
            self.lat_string,
            self.lon_string
        );
        attrs.set(&fields.identifier, AttributeValue::Str(id));
        attrs.set("title", self.title());
        attrs
            .remove(&fields.doi)
            .ok_or_else(|| SplitError::MissingGlobalAttribute(fields.doi.clone()))?;
        attrs.set("comment", naming.comment.as_str());
        Ok(attrs)
    }

    /// Picks each variable's on-disk encoding. Data mode `flag_values` are
    /// turned from `"R, A, D"` into `["R", "A", "D"]` on the way.
    pub fn encodings(&self, ds: &mut Dataset) -> Result<HashMap<String, Encoding>> {
        let fields = &self.config.fields;
        let mut out = HashMap::new();
        for var in ds.variables.iter_mut() {
            let encoding = encoding_for(&var.name, fields);
            if let Encoding::Char { .. } = encoding {
                let flags = split_flag_values(var, &fields.flag_values)?;
                var.attrs.set(&fields.flag_values, flags);
            }
            out.insert(var.name.clone(), encoding);
        }
        Ok(out)
    }

    /// Builds the complete, ready-to-write station archive.
    pub fn extract(&self, now: DateTime<Utc>) -> Result<StationArchive> {
        let mut dataset = self.extract_variables()?;
        dataset.attrs = self.global_attributes(now)?;
        let encodings = self.encodings(&mut dataset)?;
        Ok(StationArchive {
            index: self.index,
            filename: self.filename.clone(),
            directory: self.parent.identifier(&self.config.fields)?.to_string(),
            dataset,
            encodings,
        })
    }
}

fn split_flag_values(var: &Variable, key: &str) -> Result<AttributeValue> {
    match var.attrs.get(key) {
        Some(AttributeValue::Str(s)) => Ok(AttributeValue::Strs(
            s.replace(' ', "").split(',').map(str::to_string).collect(),
        )),
        Some(AttributeValue::Strs(v)) => Ok(AttributeValue::Strs(v.clone())),
        Some(_) => Err(SplitError::AttributeType {
            name: format!("{}:{key}", var.name),
            expected: "a comma separated string",
        }),
        None => Err(SplitError::MissingVariableAttribute {
            variable: var.name.clone(),
            attribute: key.to_string(),
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────

/// One station, fully materialised. Written once, never changed afterwards.
#[derive(Debug, Clone)]
pub struct StationArchive {
    pub index: usize,
    pub filename: String,
    /// Named after the parent's identifier.
    pub directory: String,
    pub dataset: Dataset,
    pub encodings: HashMap<String, Encoding>,
}

impl StationArchive {
    /// Writes to `<root>/<directory>/<filename>`, creating the directory if
    /// needed and overwriting an earlier run's file.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let dir = root.join(&self.directory);
        fs::create_dir_all(&dir)?;
        let path = dir.join(&self.filename);
        archive::write(&self.dataset, &self.encodings, &path)?;
        log::info!("File created: {}", self.filename);
        Ok(path)
    }
}

/// Builds the archive for station `index` of `parent`.
pub fn extract_station(
    parent: &ParentArchive,
    index: usize,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<StationArchive> {
    Station::new(parent, config, index)?.extract(now)
}
