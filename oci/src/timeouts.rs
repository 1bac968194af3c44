//! `timeouts { create = "15m" }` blocks

use std::time::Duration;
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode, Validator,
    ValidatorRequest, ValidatorResponse,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const OPERATIONS: [&str; 3] = ["create", "update", "delete"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceTimeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

impl ResourceTimeouts {
    /// Reads the `timeouts` block from resource config or state. Unset
    /// operations keep the default.
    pub fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let mut timeouts = Self::default();

        let block = match config.get(&AttributePath::new("timeouts")) {
            Some(Dynamic::Map(m)) => m,
            Some(Dynamic::List(items)) => match items.first() {
                Some(Dynamic::Map(m)) => m,
                _ => return Ok(timeouts),
            },
            _ => return Ok(timeouts),
        };

        for op in OPERATIONS {
            let Some(raw) = block.get(op).and_then(Dynamic::as_string) else {
                continue;
            };
            let value = parse_duration(raw).map_err(|e| {
                Diagnostic::error("Invalid timeout", e)
                    .with_attribute(AttributePath::new("timeouts").attribute(op))
            })?;
            match op {
                "create" => timeouts.create = value,
                "update" => timeouts.update = value,
                _ => timeouts.delete = value,
            }
        }

        Ok(timeouts)
    }
}

/// Largest duration Go can represent: i64::MAX nanoseconds, about 292 years
const MAX_DURATION_SECS: f64 = 9_223_372_036.854_775;

/// Parses Go-style durations: "15m", "1h30m", "45s", "500ms", "1.5h"
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let input = s.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = input;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration {:?}: expected a number", input));
        }
        let number: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid duration {:?}", input))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(format!("invalid duration {:?}: missing unit", input)),
            unit => return Err(format!("invalid duration {:?}: unknown unit {:?}", input, unit)),
        };
        rest = &rest[unit_len..];
        total += number * seconds;
    }

    if !(total.is_finite() && total <= MAX_DURATION_SECS) {
        return Err(format!("invalid duration {:?}: out of range", input));
    }
    Duration::try_from_secs_f64(total).map_err(|_| format!("invalid duration {:?}", input))
}

/// Rejects strings `parse_duration` can't read
pub struct DurationValidator;

impl Validator for DurationValidator {
    fn description(&self) -> String {
        "value must be a duration such as \"15m\" or \"1h30m\"".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = request.config_value.value.as_string() {
            if let Err(e) = parse_duration(s) {
                diagnostics.push(Diagnostic::error("Invalid timeout", e).with_attribute(request.path));
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub fn timeouts_block() -> NestedBlock {
    let mut builder = NestedBlockBuilder::new("timeouts", NestingMode::Single).max_items(1);
    for op in OPERATIONS {
        builder = builder.attribute(
            AttributeBuilder::new(op, AttributeType::String)
                .description(&format!("Time to wait for the {} operation", op))
                .optional()
                .validator(DurationValidator)
                .build(),
        );
    }
    builder.build()
}
