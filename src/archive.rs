//! NetCDF adapter: eager, CF-decoded reads into a [`Dataset`] and encoded writes back out.

use std::collections::HashMap;
use std::path::Path;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;

use crate::cf;
use crate::dataset::{Attributes, Dataset, Dimension, Values, Variable};
use crate::encoding::Encoding;
use crate::error::{Result, SplitError};

// ─────────────────────────────────────────────────────────────────────
// Read
// ─────────────────────────────────────────────────────────────────────

/// Loads the whole file. The handle is closed before returning, on every path.
pub fn read(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(SplitError::NotFound(path.to_path_buf()));
    }
    let file = netcdf::open(path).map_err(|source| SplitError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut ds = Dataset {
        dims: file
            .dimensions()
            .map(|d| Dimension { name: d.name(), len: d.len() })
            .collect(),
        ..Dataset::default()
    };
    ds.attrs = read_attributes(file.attributes())?;

    for var in file.variables() {
        ds.variables.push(read_variable(&var)?);
    }
    Ok(ds)
}

fn read_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Result<Attributes> {
    attrs
        .map(|a| Ok((a.name().to_string(), a.value()?)))
        .collect()
}

fn read_variable(var: &netcdf::Variable) -> Result<Variable> {
    let name = var.name();
    let mut dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let mut shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let mut attrs = read_attributes(var.attributes())?;
    let total: usize = shape.iter().product();

    let values = match var.vartype() {
        kind @ (NcVariableType::Int(_) | NcVariableType::Float(_)) => {
            let mut v = if total > 0 { read_numeric(var, &kind)? } else { Vec::new() };
            cf::unpack(&mut v, &mut attrs);
            Values::Numeric(v)
        }
        NcVariableType::Char => {
            // The last dimension is the string length.
            let mut raw = vec![0_u8; total];
            if total > 0 {
                var.get_raw_values_into(&mut raw, ..)?;
            }
            let width = shape.pop().unwrap_or(1).max(1);
            dims.pop();
            attrs.remove("_FillValue");
            Values::Text(
                raw.chunks(width)
                    .map(|c| String::from_utf8_lossy(c).trim_end_matches('\0').to_string())
                    .collect(),
            )
        }
        NcVariableType::String => {
            let mut text = Vec::with_capacity(total);
            for flat in 0..total {
                let index = unravel(flat, &shape);
                text.push(var.get_string(index.as_slice())?);
            }
            attrs.remove("_FillValue");
            Values::Text(text)
        }
        other => {
            return Err(SplitError::UnsupportedType {
                variable: name,
                kind: format!("{other:?}"),
            })
        }
    };

    Ok(Variable { name, dims, shape, values, attrs })
}

/// Reads in the stored type and widens to `f64`.
fn read_numeric(var: &netcdf::Variable, kind: &NcVariableType) -> Result<Vec<f64>> {
    fn widen<T: Into<f64>>(v: Vec<T>) -> Vec<f64> {
        v.into_iter().map(Into::into).collect()
    }
    let v = match kind {
        NcVariableType::Int(IntType::I8) => widen(var.get_values::<i8, _>(..)?),
        NcVariableType::Int(IntType::U8) => widen(var.get_values::<u8, _>(..)?),
        NcVariableType::Int(IntType::I16) => widen(var.get_values::<i16, _>(..)?),
        NcVariableType::Int(IntType::U16) => widen(var.get_values::<u16, _>(..)?),
        NcVariableType::Int(IntType::I32) => widen(var.get_values::<i32, _>(..)?),
        NcVariableType::Int(IntType::U32) => widen(var.get_values::<u32, _>(..)?),
        NcVariableType::Int(IntType::I64) => {
            var.get_values::<i64, _>(..)?.into_iter().map(|x| x as f64).collect()
        }
        NcVariableType::Int(IntType::U64) => {
            var.get_values::<u64, _>(..)?.into_iter().map(|x| x as f64).collect()
        }
        NcVariableType::Float(FloatType::F32) => widen(var.get_values::<f32, _>(..)?),
        _ => var.get_values::<f64, _>(..)?,
    };
    Ok(v)
}

fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (i, n) in shape.iter().enumerate().rev() {
        index[i] = flat % n;
        flat /= n;
    }
    index
}

// ─────────────────────────────────────────────────────────────────────
// Write
// ─────────────────────────────────────────────────────────────────────

const CHAR_DIM: &str = "string1";

/// Writes `ds` to `path`, replacing any existing file. Variables without an
/// entry in `encodings` are written as `f32` without fill.
pub fn write(ds: &Dataset, encodings: &HashMap<String, Encoding>, path: &Path) -> Result<()> {
    let mut nc = netcdf::create(path)?;

    for d in &ds.dims {
        nc.add_dimension(&d.name, d.len)?;
    }
    // Single characters are stored with a trailing length-1 string dimension.
    let has_chars = ds.variables.iter().any(|v| {
        matches!(encodings.get(&v.name), Some(Encoding::Char { .. }))
    });
    if has_chars && !ds.dims.iter().any(|d| d.name == CHAR_DIM) {
        nc.add_dimension(CHAR_DIM, 1)?;
    }
    for (k, v) in ds.attrs.iter() {
        nc.add_attribute(k, v.clone())?;
    }

    for var in &ds.variables {
        let dims: Vec<&str> = var.dims.iter().map(String::as_str).collect();
        let encoding = encodings
            .get(&var.name)
            .copied()
            .unwrap_or(Encoding::Float32 { fill: None });

        match encoding {
            Encoding::Float32 { fill } => {
                let data = encoding.to_f32(var)?;
                let mut v = nc.add_variable::<f32>(&var.name, &dims)?;
                if let Some(f) = fill {
                    v.set_fill_value(f)?;
                }
                put_attributes(&mut v, &var.attrs)?;
                if !data.is_empty() {
                    v.put_values(&data, ..)?;
                }
            }
            Encoding::Int8 { fill } => {
                let data = encoding.to_i8(var)?;
                let mut v = nc.add_variable::<i8>(&var.name, &dims)?;
                v.set_fill_value(fill)?;
                put_attributes(&mut v, &var.attrs)?;
                if !data.is_empty() {
                    v.put_values(&data, ..)?;
                }
            }
            Encoding::Char { fill } => {
                let data = encoding.to_chars(var)?;
                let mut dims = dims.clone();
                dims.push(CHAR_DIM);
                let mut v = nc.add_variable_with_type(&var.name, &dims, &NcVariableType::Char)?;
                v.put_attribute("_FillValue", AttributeValue::Str((fill as char).to_string()))?;
                put_attributes(&mut v, &var.attrs)?;
                if !data.is_empty() {
                    v.put_raw_values(&data, ..)?;
                }
            }
        }
        log::trace!("wrote {} as {:?}", var.name, encoding);
    }

    drop(nc);
    Ok(())
}

fn put_attributes(v: &mut netcdf::VariableMut, attrs: &Attributes) -> Result<()> {
    for (k, value) in attrs.iter().filter(|(k, _)| *k != "_FillValue") {
        v.put_attribute(k, value.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unravel_is_row_major() {
        assert_eq!(unravel(5, &[2, 3]), vec![1, 2]);
        assert_eq!(unravel(0, &[2, 3]), vec![0, 0]);
        assert_eq!(unravel(3, &[4]), vec![3]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read(Path::new("no/such/cruise.nc")).unwrap_err();
        assert!(matches!(err, SplitError::NotFound(_)));
    }
}
