//! Reusable attribute validators

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

fn invalid(request: &ValidatorRequest, summary: String, detail: String) -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: vec![Diagnostic::error(summary, detail).with_attribute(request.path.clone())],
    }
}

fn valid() -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: vec![],
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!(
            "string length must be between {} and {}",
            self.min.unwrap_or(0),
            self.max.map_or("unbounded".to_string(), |m| m.to_string())
        )
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_string() else {
            return valid();
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                return invalid(
                    &request,
                    format!("{} must have minimum length of {}", request.path, min),
                    format!("Got length {}", len),
                );
            }
        }
        if let Some(max) = self.max {
            if len > max {
                return invalid(
                    &request,
                    format!("{} must have maximum length of {}", request.path, max),
                    format!("Got length {}", len),
                );
            }
        }
        valid()
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    /// Matches Oracle Cloud identifiers such as `ocid1.instance.oc1.phx.abc`
    pub fn ocid() -> Self {
        Self {
            pattern: regex::Regex::new(r"^ocid1\.[a-z0-9_]+\.[a-z0-9_-]*\.[a-z0-9_-]*\.[A-Za-z0-9._-]*$")
                .expect("static OCID pattern"),
            description: "an OCID".to_string(),
        }
    }

    /// Matches IPv4 CIDR notation such as `10.0.0.0/16`
    pub fn ipv4_cidr() -> Self {
        Self {
            pattern: regex::Regex::new(
                r"^((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)/(3[0-2]|[12]?\d)$",
            )
            .expect("static CIDR pattern"),
            description: "an IPv4 CIDR block".to_string(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must be {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match request.config_value.value.as_string() {
            Some(s) if !self.pattern.is_match(s) => invalid(
                &request,
                format!("{} must be {}", request.path, self.description),
                format!("Value '{}' does not match pattern", s),
            ),
            _ => valid(),
        }
    }
}

pub struct StringOneOfValidator {
    pub allowed: Vec<String>,
}

impl StringOneOfValidator {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match request.config_value.value.as_string() {
            Some(s) if !self.allowed.iter().any(|a| a == s) => invalid(
                &request,
                format!("Invalid value for {}", request.path),
                format!(
                    "Expected one of [{}], got '{}'",
                    self.allowed.join(", "),
                    s
                ),
            ),
            _ => valid(),
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!(
            "list must have between {} and {} items",
            self.min.unwrap_or(0),
            self.max.map_or("unbounded".to_string(), |m| m.to_string())
        )
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Dynamic::List(items) = &request.config_value.value else {
            return valid();
        };
        if let Some(min) = self.min {
            if items.len() < min {
                return invalid(
                    &request,
                    format!("{} must have at least {} items", request.path, min),
                    format!("Got {} items", items.len()),
                );
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                return invalid(
                    &request,
                    format!("{} must have at most {} items", request.path, max),
                    format!("Got {} items", items.len()),
                );
            }
        }
        valid()
    }
}
