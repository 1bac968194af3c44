//! Resource implementations

pub mod core;

pub use self::core::{InstanceResource, SubnetResource, VirtualNetworkResource};

use crate::provider_data::OciProviderData;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tfplug::resource::{ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceResponse};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub(crate) fn provider_not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// Shared body of `ResourceWithConfigure::configure`
pub(crate) fn configure_provider_data(
    slot: &mut Option<OciProviderData>,
    request: ConfigureResourceRequest,
) -> ConfigureResourceResponse {
    let mut diagnostics = vec![];

    match request.provider_data {
        Some(data) => match data.downcast_ref::<OciProviderData>() {
            Some(provider_data) => *slot = Some(provider_data.clone()),
            None => diagnostics.push(Diagnostic::error(
                "Invalid provider data",
                "Failed to extract OciProviderData from provider data",
            )),
        },
        None => diagnostics.push(Diagnostic::error(
            "No provider data",
            "No provider data was provided to the resource",
        )),
    }

    ConfigureResourceResponse { diagnostics }
}

/// A create that did not finish. Once the remote object exists `state`
/// holds its id, so Terraform keeps tracking it and can destroy it later.
pub(crate) struct CreateFailure {
    pub state: Option<DynamicValue>,
    pub diagnostic: Diagnostic,
}

impl CreateFailure {
    pub fn after_create(mut state: DynamicValue, diagnostic: Diagnostic) -> Self {
        clear_unknowns(&mut state.value);
        Self {
            state: Some(state),
            diagnostic,
        }
    }
}

impl From<Diagnostic> for CreateFailure {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            state: None,
            diagnostic,
        }
    }
}

/// Shared body of `Resource::create`
pub(crate) fn create_response(
    planned_state: &DynamicValue,
    result: Result<(DynamicValue, Vec<Diagnostic>), CreateFailure>,
) -> CreateResourceResponse {
    match result {
        Ok((new_state, diagnostics)) => CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        },
        Err(failure) => CreateResourceResponse {
            new_state: failure.state.unwrap_or_else(|| planned_state.clone()),
            private: vec![],
            diagnostics: vec![failure.diagnostic],
        },
    }
}

/// Computed values still unknown after a failed create are stored as null
fn clear_unknowns(value: &mut Dynamic) {
    match value {
        Dynamic::Unknown => *value = Dynamic::Null,
        Dynamic::List(items) => items.iter_mut().for_each(clear_unknowns),
        Dynamic::Map(entries) => entries.values_mut().for_each(clear_unknowns),
        _ => {}
    }
}

/// Renders timestamps the way the OCI Go SDK prints them in state: the
/// fraction keeps at most nanosecond digits and drops trailing zeros
pub(crate) fn format_time(time: Option<DateTime<Utc>>) -> String {
    let Some(t) = time else {
        return String::new();
    };

    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = t.timestamp_subsec_nanos() % 1_000_000_000;
    if nanos > 0 {
        let digits = format!("{:09}", nanos);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out.push_str(" +0000 UTC");
    out
}

/// Writes `value`, or "" when absent
pub(crate) fn set_string_or_empty(state: &mut DynamicValue, name: &str, value: Option<&str>) {
    let _ = state.set_string(&AttributePath::new(name), value.unwrap_or_default().to_string());
}

/// Keeps string entries and JSON-encodes everything else
pub(crate) fn json_map_to_strings(map: &HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

/// Inverse of `json_map_to_strings`: values that parse as JSON objects or
/// arrays are sent as structured JSON
pub(crate) fn strings_to_json_map(map: &HashMap<String, String>) -> HashMap<String, serde_json::Value> {
    map.iter()
        .map(|(k, v)| {
            let value = match serde_json::from_str::<serde_json::Value>(v) {
                Ok(parsed @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => parsed,
                _ => serde_json::Value::String(v.clone()),
            };
            (k.clone(), value)
        })
        .collect()
}

pub(crate) fn string_map_dynamic(map: &HashMap<String, String>) -> Dynamic {
    Dynamic::Map(
        map.iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect(),
    )
}

pub(crate) fn required_string(config: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    config.get_string(&AttributePath::new(name)).map_err(|_| {
        Diagnostic::error(
            "Missing required argument",
            format!("The argument \"{}\" is required.", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

/// Resource id from prior state, or an error diagnostic
pub(crate) fn state_id(state: &DynamicValue) -> Result<String, Diagnostic> {
    state
        .get_string(&AttributePath::new("id"))
        .ok()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            Diagnostic::error("Missing id", "The resource state has no 'id'")
                .with_attribute(AttributePath::new("id"))
        })
}
