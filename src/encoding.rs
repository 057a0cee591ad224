use crate::config::FieldNames;
use crate::dataset::{Values, Variable};
use crate::error::{Result, SplitError};

/// Fill for measured quantities; kept for compatibility with the published files.
pub const FILL_F32: f32 = -2_147_483_647.0;
pub const FILL_QC: i8 = -127;
pub const FILL_DM: u8 = b' ';

/// On-disk type and missing-value marker of one output variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Float32 { fill: Option<f32> },
    Int8 { fill: i8 },
    Char { fill: u8 },
}

/// Pressure, then data mode, then quality flags, then everything else.
pub fn encoding_for(name: &str, fields: &FieldNames) -> Encoding {
    if name == fields.pressure {
        Encoding::Float32 { fill: None }
    } else if fields.is_data_mode(name) {
        Encoding::Char { fill: FILL_DM }
    } else if fields.is_quality(name) {
        Encoding::Int8 { fill: FILL_QC }
    } else {
        Encoding::Float32 { fill: Some(FILL_F32) }
    }
}

impl Encoding {
    fn mismatch(var: &Variable, target: &'static str) -> SplitError {
        SplitError::Encoding { variable: var.name.clone(), target }
    }

    /// NaN becomes the fill, or stays NaN when there is none.
    pub fn to_f32(&self, var: &Variable) -> Result<Vec<f32>> {
        let fill = match self {
            Encoding::Float32 { fill } => *fill,
            _ => None,
        };
        let values = var.values.as_numeric().ok_or_else(|| Self::mismatch(var, "f32"))?;
        Ok(values
            .iter()
            .map(|&v| match (v.is_nan(), fill) {
                (true, Some(f)) => f,
                _ => v as f32,
            })
            .collect())
    }

    pub fn to_i8(&self, var: &Variable) -> Result<Vec<i8>> {
        let fill = match self {
            Encoding::Int8 { fill } => *fill,
            _ => FILL_QC,
        };
        match &var.values {
            Values::Numeric(values) => values
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        Ok(fill)
                    } else if (f64::from(i8::MIN)..=f64::from(i8::MAX)).contains(&v.round()) {
                        Ok(v.round() as i8)
                    } else {
                        Err(Self::mismatch(var, "i8"))
                    }
                })
                .collect(),
            // Flags stored as digit characters.
            Values::Text(values) => values
                .iter()
                .map(|s| match s.trim() {
                    "" => Ok(fill),
                    t => t.parse::<i8>().map_err(|_| Self::mismatch(var, "i8")),
                })
                .collect(),
        }
    }

    /// One byte per element; empty strings become the fill.
    pub fn to_chars(&self, var: &Variable) -> Result<Vec<u8>> {
        let fill = match self {
            Encoding::Char { fill } => *fill,
            _ => FILL_DM,
        };
        match &var.values {
            Values::Text(values) => values
                .iter()
                .map(|s| match s.as_bytes() {
                    [] | [0] => Ok(fill),
                    [b] => Ok(*b),
                    _ => Err(Self::mismatch(var, "a single character")),
                })
                .collect(),
            Values::Numeric(values) => values
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        Ok(fill)
                    } else if (0.0..=255.0).contains(&v) && v.fract() == 0.0 {
                        Ok(v as u8)
                    } else {
                        Err(Self::mismatch(var, "a single character"))
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(values: Values) -> Variable {
        let n = values.len();
        Variable::new("X", &[("PRES", n)], values).unwrap()
    }

    #[test]
    fn selection_order() {
        let f = FieldNames::default();
        assert_eq!(encoding_for("PRES", &f), Encoding::Float32 { fill: None });
        assert_eq!(encoding_for("PRES_DM", &f), Encoding::Char { fill: b' ' });
        assert_eq!(encoding_for("PRES_QC", &f), Encoding::Int8 { fill: -127 });
        assert_eq!(encoding_for("TEMP", &f), Encoding::Float32 { fill: Some(-2147483647.0) });
    }

    #[test]
    fn missing_values_become_fill() {
        let e = Encoding::Float32 { fill: Some(FILL_F32) };
        let out = e.to_f32(&var(Values::Numeric(vec![1.5, f64::NAN]))).unwrap();
        assert_eq!(out, vec![1.5, FILL_F32]);

        let e = Encoding::Int8 { fill: FILL_QC };
        let out = e.to_i8(&var(Values::Numeric(vec![1.0, f64::NAN, 4.0]))).unwrap();
        assert_eq!(out, vec![1, -127, 4]);

        let e = Encoding::Char { fill: FILL_DM };
        let out = e
            .to_chars(&var(Values::Text(vec!["R".into(), "".into(), "D".into()])))
            .unwrap();
        assert_eq!(out, b"R D".to_vec());
    }

    #[test]
    fn out_of_range_flags_are_rejected() {
        let e = Encoding::Int8 { fill: FILL_QC };
        assert!(e.to_i8(&var(Values::Numeric(vec![300.0]))).is_err());
        let e = Encoding::Char { fill: FILL_DM };
        assert!(e.to_chars(&var(Values::Text(vec!["RA".into()]))).is_err());
    }
}
