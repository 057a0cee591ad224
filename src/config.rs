use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::{AttributeRule, RuleAction};

/// Everything that ties the splitter to one data product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fields: FieldNames,
    pub naming: Naming,
    /// Applied to `valid_min`/`valid_max` of physical variables, since the reader
    /// unpacks `scale_factor` but leaves the valid range in packed units.
    pub valid_range_scale: f64,
    /// Applied once to the parent's global attributes, in order.
    pub global_rules: Vec<AttributeRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fields: FieldNames::default(),
            naming: Naming::default(),
            valid_range_scale: 0.001,
            global_rules: nansen_legacy_rules(),
        }
    }
}

impl Config {
    /// Reads a JSON config. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub latitude: String,
    pub longitude: String,
    pub time: String,
    pub pressure: String,
    pub quality_marker: String,
    pub data_mode_marker: String,
    pub identifier: String,
    pub doi: String,
    pub ancillary_variables: String,
    pub flag_values: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            latitude: "LATITUDE".into(),
            longitude: "LONGITUDE".into(),
            time: "TIME".into(),
            pressure: "PRES".into(),
            quality_marker: "QC".into(),
            data_mode_marker: "DM".into(),
            identifier: "id".into(),
            doi: "doi".into(),
            ancillary_variables: "ancillary_variables".into(),
            flag_values: "flag_values".into(),
        }
    }
}

impl FieldNames {
    pub fn is_quality(&self, variable: &str) -> bool {
        variable.contains(&self.quality_marker)
    }

    pub fn is_data_mode(&self, variable: &str) -> bool {
        variable.contains(&self.data_mode_marker)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    pub file_prefix: String,
    pub extension: String,
    pub comment: String,
    pub vertical_units: String,
    pub vertical_resolution: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            file_prefix: "Nansen_Legacy_CTD_data_single_station".into(),
            extension: "nc".into(),
            comment: "Descending CTD profile".into(),
            vertical_units: "dbar".into(),
            vertical_resolution: "1 dbar".into(),
        }
    }
}

const DERIVED_FROM: &str = "These data are created from the CTD data published by NMDC \
                            for the whole cruise ({doi}). The values have not been changed.";

fn nansen_legacy_rules() -> Vec<AttributeRule> {
    let set = |name: &str, value: &str| AttributeRule::new(name, RuleAction::Set { value: value.into() });
    let template =
        |name: &str, t: String| AttributeRule::new(name, RuleAction::Template { template: t });
    let delete = |name: &str| AttributeRule::new(name, RuleAction::Delete);

    vec![
        set("project", "The Nansen Legacy Project (RCN # 276730)"),
        template(
            "acknowledgement",
            format!(
                "The Nansen Legacy project is funded by the Research Council of Norway \
                 (RCN # 276730). {DERIVED_FROM} For information about this process, please \
                 contact Luke Marsden at data.nleg@unis.no"
            ),
        ),
        template("summary", format!("{{summary}} {DERIVED_FROM}")),
        template("references", "https://doi.org/{doi}".into()),
        set("naming_authority", "no.unis"),
        template("creator_institution", "{creator_name}".into()),
        template("publisher_name", "{creator_name}".into()),
        set("creator_email", "datahjelp@imr.no"),
        template("publisher_email", "{creator_email}".into()),
        template("publisher_url", "{creator_url}".into()),
        delete("last_latitude_observation"),
        delete("last_longitude_observation"),
        delete("format_version"),
        delete("last_date_observation"),
    ]
}
