use netcdf::AttributeValue;
use serde::{Deserialize, Serialize};

use crate::dataset::Attributes;
use crate::error::{Result, SplitError};

/// One line of the global attribute correction table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeRule {
    pub name: String,
    #[serde(flatten)]
    pub action: RuleAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    /// Overwrite with a fixed string.
    Set { value: String },
    /// Render `{name}` placeholders from the attributes as they are when the rule runs.
    Template { template: String },
    /// Remove; the attribute has to exist.
    Delete,
}

impl AttributeRule {
    pub fn new(name: &str, action: RuleAction) -> Self {
        Self { name: name.to_string(), action }
    }
}

/// Applies `rules` in order. Stops at the first failure, leaving `attrs` half-done.
pub fn apply_rules(attrs: &mut Attributes, rules: &[AttributeRule]) -> Result<()> {
    for rule in rules {
        match &rule.action {
            RuleAction::Set { value } => attrs.set(&rule.name, value.as_str()),
            RuleAction::Template { template } => {
                let value = render(template, attrs)?;
                attrs.set(&rule.name, AttributeValue::Str(value));
            }
            RuleAction::Delete => {
                attrs
                    .remove(&rule.name)
                    .ok_or_else(|| SplitError::MissingGlobalAttribute(rule.name.clone()))?;
            }
        }
        log::trace!("global attribute rule applied: {}", rule.name);
    }
    Ok(())
}

/// Substitutes `{name}` with the attribute's value. `{{` and `}}` are literal braces.
pub fn render(template: &str, attrs: &Attributes) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => return Err(SplitError::Template(template.to_string())),
                    }
                }
                let value = attrs
                    .get(&key)
                    .ok_or_else(|| SplitError::MissingGlobalAttribute(key.clone()))?;
                out.push_str(&display(value));
            }
            '}' => return Err(SplitError::Template(template.to_string())),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Plain text form of an attribute, as it would read in a sentence.
pub fn display(value: &AttributeValue) -> String {
    fn join<T: ToString>(v: &[T]) -> String {
        v.iter().map(T::to_string).collect::<Vec<_>>().join(", ")
    }
    match value {
        AttributeValue::Str(s) => s.clone(),
        AttributeValue::Strs(v) => v.join(", "),
        AttributeValue::Uchar(x) => x.to_string(),
        AttributeValue::Schar(x) => x.to_string(),
        AttributeValue::Ushort(x) => x.to_string(),
        AttributeValue::Short(x) => x.to_string(),
        AttributeValue::Uint(x) => x.to_string(),
        AttributeValue::Int(x) => x.to_string(),
        AttributeValue::Ulonglong(x) => x.to_string(),
        AttributeValue::Longlong(x) => x.to_string(),
        AttributeValue::Float(x) => x.to_string(),
        AttributeValue::Double(x) => x.to_string(),
        AttributeValue::Uchars(v) => join(v),
        AttributeValue::Schars(v) => join(v),
        AttributeValue::Ushorts(v) => join(v),
        AttributeValue::Shorts(v) => join(v),
        AttributeValue::Uints(v) => join(v),
        AttributeValue::Ints(v) => join(v),
        AttributeValue::Ulonglongs(v) => join(v),
        AttributeValue::Longlongs(v) => join(v),
        AttributeValue::Floats(v) => join(v),
        AttributeValue::Doubles(v) => join(v),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn cruise_attrs() -> Attributes {
        let mut a = Attributes::new();
        for (k, v) in [
            ("id", "AR_PR_CT_58GS_2020113"),
            ("doi", "10.21335/NMDC-1234"),
            ("summary", "CTD data from cruise."),
            ("creator_name", "Institute of Marine Research"),
            ("creator_url", "https://www.hi.no"),
            ("creator_email", "someone@hi.no"),
            ("last_latitude_observation", "78.1"),
            ("last_longitude_observation", "30.2"),
            ("format_version", "1.2"),
            ("last_date_observation", "2020-10-20"),
        ] {
            a.set(k, v);
        }
        a
    }

    #[test]
    fn default_rules_repair_cruise_attributes() {
        let mut a = cruise_attrs();
        apply_rules(&mut a, &Config::default().global_rules).unwrap();

        assert_eq!(a.text("references").unwrap(), Some("https://doi.org/10.21335/NMDC-1234"));
        assert_eq!(a.text("publisher_name").unwrap(), Some("Institute of Marine Research"));
        assert_eq!(a.text("creator_institution").unwrap(), Some("Institute of Marine Research"));
        assert_eq!(a.text("creator_email").unwrap(), Some("datahjelp@imr.no"));
        assert_eq!(a.text("publisher_email").unwrap(), Some("datahjelp@imr.no"));
        assert_eq!(a.text("publisher_url").unwrap(), Some("https://www.hi.no"));
        assert_eq!(a.text("naming_authority").unwrap(), Some("no.unis"));

        let summary = a.required_text("summary").unwrap();
        assert!(summary.starts_with("CTD data from cruise. These data"));
        assert!(summary.contains("(10.21335/NMDC-1234)"));
        assert!(a.required_text("acknowledgement").unwrap().contains("(10.21335/NMDC-1234)"));

        for gone in ["last_latitude_observation", "format_version", "last_date_observation"] {
            assert!(!a.contains(gone));
        }
        assert!(a.contains("doi"));
    }

    #[test]
    fn missing_doi_is_fatal() {
        let mut a = cruise_attrs();
        a.remove("doi");
        let err = apply_rules(&mut a, &Config::default().global_rules).unwrap_err();
        assert!(matches!(err, SplitError::MissingGlobalAttribute(name) if name == "doi"));
    }

    #[test]
    fn deleting_absent_attribute_is_fatal() {
        let mut a = cruise_attrs();
        a.remove("format_version");
        let err = apply_rules(&mut a, &Config::default().global_rules).unwrap_err();
        assert!(matches!(err, SplitError::MissingGlobalAttribute(name) if name == "format_version"));
    }

    #[test]
    fn render_handles_escapes_and_numbers() {
        let mut a = Attributes::new();
        a.set("n", AttributeValue::Int(7));
        assert_eq!(render("{{n}} = {n}", &a).unwrap(), "{n} = 7");
        assert!(matches!(render("{n", &a), Err(SplitError::Template(_))));
    }

    #[test]
    fn rules_deserialize_from_json() {
        let rules: Vec<AttributeRule> = serde_json::from_str(
            r#"[
                { "name": "project", "action": "set", "value": "P" },
                { "name": "title", "action": "template", "template": "{project}!" },
                { "name": "project", "action": "delete" }
            ]"#,
        )
        .unwrap();
        let mut a = Attributes::new();
        apply_rules(&mut a, &rules).unwrap();
        assert_eq!(a.text("title").unwrap(), Some("P!"));
        assert!(!a.contains("project"));
    }
}
