//! Acceptance-test helpers
//!
//! State is compared in Terraform's flatmap form (`instances.#`,
//! `instances.0.metadata.%`, `instances.0.shape`) so checks read the same
//! way they would against a real `terraform.tfstate`.

use crate::types::{Dynamic, DynamicValue};
use std::collections::{BTreeMap, HashMap};

/// Flattens a state object into flatmap keys.
///
/// Maps that sit directly in a list (or at the root) are treated as objects
/// and do not get a `%` count; maps stored under an object key are treated
/// as map attributes and do. Null and unknown values are omitted.
pub fn flatten(state: &DynamicValue) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Dynamic::Map(m) = &state.value {
        flatten_object(m, "", &mut out);
    }
    out
}

fn flatten_object(m: &HashMap<String, Dynamic>, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (k, v) in m {
        flatten_value(v, &join(prefix, k), true, out);
    }
}

fn flatten_value(value: &Dynamic, key: &str, counted: bool, out: &mut BTreeMap<String, String>) {
    match value {
        Dynamic::Null | Dynamic::Unknown => {}
        Dynamic::String(s) => {
            out.insert(key.to_string(), s.clone());
        }
        Dynamic::Bool(b) => {
            out.insert(key.to_string(), b.to_string());
        }
        Dynamic::Number(n) => {
            out.insert(key.to_string(), format_number(*n));
        }
        Dynamic::List(items) => {
            out.insert(format!("{}.#", key), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                let item_key = format!("{}.{}", key, i);
                match item {
                    Dynamic::Map(m) => flatten_object(m, &item_key, out),
                    other => flatten_value(other, &item_key, false, out),
                }
            }
        }
        Dynamic::Map(m) => {
            if counted {
                out.insert(format!("{}.%", key), m.len().to_string());
            }
            for (k, v) in m {
                flatten_value(v, &format!("{}.{}", key, k), true, out);
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn is_count_key(key: &str) -> bool {
    key.ends_with(".#") || key.ends_with(".%")
}

/// Applied state keyed by address, e.g. `data.oci_core_instances.t`
#[derive(Debug, Clone, Default)]
pub struct TestState {
    resources: HashMap<String, DynamicValue>,
}

impl TestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str, state: DynamicValue) {
        self.resources.insert(address.to_string(), state);
    }

    pub fn get(&self, address: &str) -> Option<&DynamicValue> {
        self.resources.get(address)
    }

    pub fn remove(&mut self, address: &str) -> Option<DynamicValue> {
        self.resources.remove(address)
    }

    fn flat(&self, address: &str) -> Result<BTreeMap<String, String>, String> {
        self.get(address)
            .map(flatten)
            .ok_or_else(|| format!("Not found: {} in state", address))
    }
}

pub type TestCheckFunc = Box<dyn Fn(&TestState) -> Result<(), String> + Send + Sync>;

/// Runs every check in order, failing on the first error
pub fn compose_checks(checks: Vec<TestCheckFunc>) -> TestCheckFunc {
    Box::new(move |state| {
        let total = checks.len();
        for (i, check) in checks.iter().enumerate() {
            check(state).map_err(|e| format!("Check {}/{} error: {}", i + 1, total, e))?;
        }
        Ok(())
    })
}

/// `key` must equal `value`. An expected "" also accepts a missing key and
/// an expected "0" accepts a missing `.#` / `.%` count.
pub fn check_resource_attr(address: &str, key: &str, value: &str) -> TestCheckFunc {
    let (address, key, value) = (address.to_string(), key.to_string(), value.to_string());
    Box::new(move |state| {
        let flat = state.flat(&address)?;
        match flat.get(&key) {
            Some(actual) if *actual == value => Ok(()),
            Some(actual) => Err(format!(
                "{}: Attribute '{}' expected {:?}, got {:?}",
                address, key, value, actual
            )),
            None if value.is_empty() => Ok(()),
            None if value == "0" && is_count_key(&key) => Ok(()),
            None => Err(format!(
                "{}: Attribute '{}' expected {:?}, got none",
                address, key, value
            )),
        }
    })
}

/// `key` must exist with a non-empty value
pub fn check_resource_attr_set(address: &str, key: &str) -> TestCheckFunc {
    let (address, key) = (address.to_string(), key.to_string());
    Box::new(move |state| {
        let flat = state.flat(&address)?;
        match flat.get(&key) {
            Some(v) if !v.is_empty() => Ok(()),
            _ => Err(format!("{}: Attribute '{}' expected to be set", address, key)),
        }
    })
}

/// Neither `key` nor anything nested under it may be present, apart from
/// zero-valued counts
pub fn check_no_resource_attr(address: &str, key: &str) -> TestCheckFunc {
    let (address, key) = (address.to_string(), key.to_string());
    Box::new(move |state| {
        let flat = state.flat(&address)?;
        let nested = format!("{}.", key);
        let offending = flat.iter().find(|(k, v)| {
            (**k == key || k.starts_with(&nested)) && !(is_count_key(k) && v.as_str() == "0")
        });
        match offending {
            Some((k, v)) => Err(format!(
                "{}: Attribute '{}' found when not expected ({} = {:?})",
                address, key, k, v
            )),
            None => Ok(()),
        }
    })
}

/// Compares applied and imported state, returning every mismatch.
/// Keys starting with any of `ignore` are skipped on both sides.
pub fn verify_import_state(
    applied: &DynamicValue,
    imported: &DynamicValue,
    ignore: &[&str],
) -> Vec<String> {
    let keep = |k: &String| !ignore.iter().any(|prefix| k.starts_with(prefix));
    let applied: BTreeMap<_, _> = flatten(applied).into_iter().filter(|(k, _)| keep(k)).collect();
    let imported: BTreeMap<_, _> = flatten(imported)
        .into_iter()
        .filter(|(k, _)| keep(k))
        .collect();

    let mut diffs = Vec::new();
    for (k, v) in &applied {
        match imported.get(k) {
            Some(iv) if iv == v => {}
            Some(iv) => diffs.push(format!("{}: applied {:?}, imported {:?}", k, v, iv)),
            None => diffs.push(format!("{}: applied {:?}, missing after import", k, v)),
        }
    }
    for (k, v) in &imported {
        if !applied.contains_key(k) {
            diffs.push(format!("{}: imported {:?}, missing in applied state", k, v));
        }
    }
    diffs
}

/// Random display-name token so parallel runs don't see each other's
/// resources
pub fn random_token() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("tf-{}", &id[..10])
}
