//! The handful of CF conventions the splitter relies on: packed values,
//! fill values, `<unit> since <reference>` time axes and numeric attributes.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use netcdf::AttributeValue;

use crate::dataset::Attributes;
use crate::error::{Result, SplitError};

/// Attributes consumed while decoding; they do not survive into the dataset.
pub const DECODING_ATTRIBUTES: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

/// First number held by a numeric attribute.
pub fn as_f64(value: &AttributeValue) -> Option<f64> {
    as_f64s(value).and_then(|v| v.first().copied())
}

/// Every number held by a numeric attribute.
pub fn as_f64s(value: &AttributeValue) -> Option<Vec<f64>> {
    fn all<T: Copy + Into<f64>>(v: &[T]) -> Vec<f64> {
        v.iter().map(|&x| x.into()).collect()
    }
    let v = match value {
        AttributeValue::Uchar(x) => vec![f64::from(*x)],
        AttributeValue::Schar(x) => vec![f64::from(*x)],
        AttributeValue::Ushort(x) => vec![f64::from(*x)],
        AttributeValue::Short(x) => vec![f64::from(*x)],
        AttributeValue::Uint(x) => vec![f64::from(*x)],
        AttributeValue::Int(x) => vec![f64::from(*x)],
        AttributeValue::Ulonglong(x) => vec![*x as f64],
        AttributeValue::Longlong(x) => vec![*x as f64],
        AttributeValue::Float(x) => vec![f64::from(*x)],
        AttributeValue::Double(x) => vec![*x],
        AttributeValue::Uchars(v) => all(v),
        AttributeValue::Schars(v) => all(v),
        AttributeValue::Ushorts(v) => all(v),
        AttributeValue::Shorts(v) => all(v),
        AttributeValue::Uints(v) => all(v),
        AttributeValue::Ints(v) => all(v),
        AttributeValue::Ulonglongs(v) => v.iter().map(|&x| x as f64).collect(),
        AttributeValue::Longlongs(v) => v.iter().map(|&x| x as f64).collect(),
        AttributeValue::Floats(v) => all(v),
        AttributeValue::Doubles(v) => v.clone(),
        _ => return None,
    };
    Some(v)
}

/// Numeric attribute multiplied by `factor`, widened to double. `None` for text.
pub fn scale_attribute(value: &AttributeValue, factor: f64) -> Option<AttributeValue> {
    let scaled: Vec<f64> = as_f64s(value)?.into_iter().map(|x| x * factor).collect();
    let is_list = matches!(
        value,
        AttributeValue::Uchars(_)
            | AttributeValue::Schars(_)
            | AttributeValue::Ushorts(_)
            | AttributeValue::Shorts(_)
            | AttributeValue::Uints(_)
            | AttributeValue::Ints(_)
            | AttributeValue::Ulonglongs(_)
            | AttributeValue::Longlongs(_)
            | AttributeValue::Floats(_)
            | AttributeValue::Doubles(_)
    );
    Some(if is_list {
        AttributeValue::Doubles(scaled)
    } else {
        AttributeValue::Double(scaled[0])
    })
}

/// Masks fill cells as NaN, then applies `scale_factor`/`add_offset`.
/// The attributes used are removed from `attrs`.
pub fn unpack(values: &mut [f64], attrs: &mut Attributes) {
    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|k| attrs.get(k).and_then(as_f64s))
        .flatten()
        .collect();
    let scale = attrs.get("scale_factor").and_then(as_f64).unwrap_or(1.0);
    let offset = attrs.get("add_offset").and_then(as_f64).unwrap_or(0.0);

    for v in values.iter_mut() {
        if fills.iter().any(|f| f == v) {
            *v = f64::NAN;
        } else {
            *v = *v * scale + offset;
        }
    }
    for k in DECODING_ATTRIBUTES {
        attrs.remove(k);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Time
// ─────────────────────────────────────────────────────────────────────

fn unit_millis(unit: &str) -> Option<f64> {
    let ms = match unit.to_ascii_lowercase().trim_end_matches('s') {
        "day" | "d" => 86_400_000.0,
        "hour" | "hr" | "h" => 3_600_000.0,
        "minute" | "min" => 60_000.0,
        "second" | "sec" => 1_000.0,
        "millisecond" | "msec" => 1.0,
        _ => return None,
    };
    Some(ms)
}

fn parse_reference(text: &str) -> Option<NaiveDateTime> {
    let t = text.trim().trim_end_matches(" UTC").trim_end_matches('Z').replace('T', " ");
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&t, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(&t, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Decodes `<unit> since <reference>` offsets into UTC instants (millisecond precision).
pub fn decode_time(values: &[f64], units: &str) -> Result<Vec<DateTime<Utc>>> {
    let bad_units = || SplitError::TimeUnits(units.to_string());
    let (unit, reference) = units.split_once(" since ").ok_or_else(bad_units)?;
    let step = unit_millis(unit.trim()).ok_or_else(bad_units)?;
    let origin = parse_reference(reference).ok_or_else(bad_units)?.and_utc();

    values
        .iter()
        .map(|&v| {
            let ms = (v * step).round();
            if !ms.is_finite() || ms.abs() > i64::MAX as f64 / 2.0 {
                return Err(SplitError::TimeRange(v));
            }
            origin
                .checked_add_signed(Duration::milliseconds(ms as i64))
                .ok_or(SplitError::TimeRange(v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_masks_then_scales() {
        let mut attrs = Attributes::new();
        attrs.set("_FillValue", AttributeValue::Int(-99));
        attrs.set("scale_factor", AttributeValue::Double(0.001));
        attrs.set("valid_min", AttributeValue::Int(-2000));
        let mut v = vec![1500.0, -99.0];
        unpack(&mut v, &mut attrs);
        assert!((v[0] - 1.5).abs() < 1e-12);
        assert!(v[1].is_nan());
        assert!(!attrs.contains("scale_factor"));
        assert!(!attrs.contains("_FillValue"));
        assert!(attrs.contains("valid_min"));
    }

    #[test]
    fn scale_attribute_widens_to_double() {
        let s = scale_attribute(&AttributeValue::Int(40000), 0.001).unwrap();
        assert!(matches!(s, AttributeValue::Double(x) if (x - 40.0).abs() < 1e-9));
        let s = scale_attribute(&AttributeValue::Shorts(vec![1000, 2000]), 0.001).unwrap();
        assert!(matches!(s, AttributeValue::Doubles(v) if v.len() == 2));
        assert!(scale_attribute(&AttributeValue::Str("x".into()), 0.001).is_none());
    }

    #[test]
    fn decode_days_since_1950() {
        let t = decode_time(&[25494.75], "days since 1950-01-01T00:00:00Z").unwrap();
        assert_eq!(t[0].format("%Y-%m-%dT%H:%M:%S").to_string(), "2019-10-20T18:00:00");
    }

    #[test]
    fn decode_seconds_with_plain_date() {
        let t = decode_time(&[90.0], "seconds since 1970-01-01").unwrap();
        assert_eq!(t[0].timestamp(), 90);
    }

    #[test]
    fn bad_units_are_rejected() {
        assert!(matches!(decode_time(&[0.0], "fortnights since 1970-01-01"), Err(SplitError::TimeUnits(_))));
        assert!(matches!(decode_time(&[0.0], "days"), Err(SplitError::TimeUnits(_))));
        assert!(matches!(decode_time(&[f64::NAN], "days since 1970-01-01"), Err(SplitError::TimeRange(_))));
    }
}
