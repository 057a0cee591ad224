//! Fixture shared by the integration tests: a small two-station cruise file.
#![allow(dead_code)]

use std::path::Path;

use netcdf::types::NcVariableType;
use netcdf::AttributeValue;

pub const ID: &str = "AR_PR_CT_58GS_2020113";

/// Pressures of [`write_parent`]: the second station is one sample shorter.
pub const PRES: [f32; 8] = [0.0, 10.0, 20.0, 30.0, 5.0, 15.0, 25.0, -999.0];

/// Two stations; the second one is one sample shorter and padded with fill.
pub fn write_parent(path: &Path, with_doi: bool) {
    write_parent_with_pressure(path, with_doi, &PRES);
}

/// As [`write_parent`], with `-999` marking missing pressure cells.
pub fn write_parent_with_pressure(path: &Path, with_doi: bool, pres: &[f32; 8]) {
    let mut nc = netcdf::create(path).unwrap();
    nc.add_dimension("POSITION", 2).unwrap();
    nc.add_dimension("DEPTH", 4).unwrap();
    nc.add_dimension("STRING4", 4).unwrap();

    let mut globals = vec![
        ("id", ID),
        ("title", "Nansen Legacy CTD cruise"),
        ("summary", "CTD profiles."),
        ("creator_name", "Institute of Marine Research"),
        ("creator_url", "https://www.hi.no"),
        ("creator_email", "someone@hi.no"),
        ("last_latitude_observation", "79.5"),
        ("last_longitude_observation", "-5.25"),
        ("format_version", "1.2"),
        ("last_date_observation", "2019-10-21"),
    ];
    if with_doi {
        globals.push(("doi", "10.21335/NMDC-2039932526"));
    }
    for (k, v) in globals {
        nc.add_attribute(k, v).unwrap();
    }

    {
        let mut v = nc.add_variable::<i32>("POSITION", &["POSITION"]).unwrap();
        v.put_values(&[0, 1], ..).unwrap();
    }
    {
        let mut v = nc.add_variable::<f64>("LATITUDE", &["POSITION"]).unwrap();
        v.put_values(&[78.35171, 79.5], ..).unwrap();
    }
    {
        let mut v = nc.add_variable::<f64>("LONGITUDE", &["POSITION"]).unwrap();
        v.put_values(&[34.76381, -5.25], ..).unwrap();
    }
    {
        let mut v = nc.add_variable::<f64>("TIME", &["POSITION"]).unwrap();
        v.put_attribute("units", "days since 1950-01-01T00:00:00Z").unwrap();
        v.put_values(&[25494.75, 25495.5], ..).unwrap();
    }
    {
        let mut v = nc.add_variable::<f32>("PRES", &["POSITION", "DEPTH"]).unwrap();
        v.set_fill_value(-999.0_f32).unwrap();
        v.put_attribute("units", "dbar").unwrap();
        v.put_attribute("ancillary_variables", "PRES_QC PRES_DM").unwrap();
        v.put_values(pres, ..).unwrap();
    }
    {
        let mut v = nc.add_variable::<i32>("TEMP", &["POSITION", "DEPTH"]).unwrap();
        v.set_fill_value(i32::MIN).unwrap();
        v.put_attribute("scale_factor", 0.001_f64).unwrap();
        v.put_attribute("valid_min", AttributeValue::Int(-2000)).unwrap();
        v.put_attribute("valid_max", AttributeValue::Int(40000)).unwrap();
        v.put_attribute("ancillary_variables", "TEMP_QC TEMP_DM").unwrap();
        v.put_values(&[1000, 2000, 3000, 4000, 5000, 6000, 7000, i32::MIN], ..)
            .unwrap();
    }
    for name in ["TEMP_QC", "PRES_QC"] {
        let mut v = nc.add_variable::<i8>(name, &["POSITION", "DEPTH"]).unwrap();
        v.set_fill_value(-127_i8).unwrap();
        v.put_attribute("flag_values", AttributeValue::Schars(vec![0, 1, 4])).unwrap();
        v.put_values(&[1_i8, 1, 1, 4, 1, 1, 1, -127], ..).unwrap();
    }
    {
        let mut v = nc.add_string_variable("PRES_DM", &["POSITION", "DEPTH"]).unwrap();
        v.put_attribute("flag_values", "R, A, D").unwrap();
        for (i, row) in [["R", "R", "A", "A"], ["D", "D", "D", ""]].iter().enumerate() {
            for (j, mode) in row.iter().enumerate() {
                v.put_string(mode, [i, j]).unwrap();
            }
        }
    }
    {
        // Char array: read back as one string per station and left out.
        let mut v = nc
            .add_variable_with_type("TEMP_DM", &["POSITION", "STRING4"], &NcVariableType::Char)
            .unwrap();
        v.put_raw_values(b"RRRRDDD ", ..).unwrap();
    }
}
