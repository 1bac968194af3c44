//! Client-side `filter { name, values, regex }` blocks for list data sources
//!
//! Filters are ANDed together; the values of one filter are ORed. `name` is
//! a dot-separated path into the item (`metadata.user_data`), and list
//! attributes match when any element matches.

use regex::Regex;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::ListLengthValidator;

#[derive(Debug, Clone)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
    pub regex: bool,
}

pub fn filter_block() -> NestedBlock {
    NestedBlockBuilder::new("filter", NestingMode::List)
        .description("Client-side filter on the listed objects")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("Attribute to match, dot-separated for nested maps")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("values", AttributeType::List(Box::new(AttributeType::String)))
                .description("Accepted values; any one of them may match")
                .required()
                .validator(ListLengthValidator {
                    min: Some(1),
                    max: None,
                })
                .build(),
        )
        .attribute(
            AttributeBuilder::new("regex", AttributeType::Bool)
                .description("Treat values as regular expressions")
                .optional()
                .build(),
        )
        .build()
}

/// Reads every `filter` block from the data source config
pub fn filters_from_config(config: &DynamicValue) -> Result<Vec<Filter>, Diagnostic> {
    let Some(blocks) = config
        .get(&AttributePath::new("filter"))
        .and_then(Dynamic::as_list)
    else {
        return Ok(Vec::new());
    };

    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let path = AttributePath::new("filter").index(i as i64);
            let map = block.as_map().ok_or_else(|| {
                Diagnostic::error("Invalid filter", "filter must be a block").with_attribute(path.clone())
            })?;

            let name = map
                .get("name")
                .and_then(Dynamic::as_string)
                .ok_or_else(|| {
                    Diagnostic::error("Invalid filter", "filter.name is required")
                        .with_attribute(path.clone().attribute("name"))
                })?
                .to_string();

            let values = map
                .get("values")
                .and_then(Dynamic::as_list)
                .map(|l| {
                    l.iter()
                        .filter_map(|v| v.as_string().map(str::to_string))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            let regex = map.get("regex").and_then(Dynamic::as_bool).unwrap_or(false);

            Ok(Filter {
                name,
                values,
                regex,
            })
        })
        .collect()
}

enum Matcher {
    Exact(Vec<String>),
    Pattern(Vec<Regex>),
}

impl Matcher {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Matcher::Exact(values) => values.iter().any(|v| v == candidate),
            Matcher::Pattern(patterns) => patterns.iter().any(|r| r.is_match(candidate)),
        }
    }
}

/// Keeps the items matching every filter. An invalid regex is an error.
pub fn apply_filters(items: Vec<Dynamic>, filters: &[Filter]) -> Result<Vec<Dynamic>, Diagnostic> {
    if filters.is_empty() {
        return Ok(items);
    }

    let mut compiled = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        let matcher = if filter.regex {
            let patterns = filter
                .values
                .iter()
                .map(|v| Regex::new(v))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    Diagnostic::error("Invalid filter regex", e.to_string()).with_attribute(
                        AttributePath::new("filter").index(i as i64).attribute("values"),
                    )
                })?;
            Matcher::Pattern(patterns)
        } else {
            Matcher::Exact(filter.values.clone())
        };
        let path: Vec<&str> = filter.name.split('.').collect();
        compiled.push((path, matcher));
    }

    let before = items.len();
    let kept: Vec<Dynamic> = items
        .into_iter()
        .filter(|item| {
            compiled.iter().all(|(path, matcher)| {
                lookup(item, path).is_some_and(|value| value_matches(value, matcher))
            })
        })
        .collect();

    tracing::debug!("Filters kept {} of {} items", kept.len(), before);
    Ok(kept)
}

fn lookup<'a>(item: &'a Dynamic, path: &[&str]) -> Option<&'a Dynamic> {
    path.iter()
        .try_fold(item, |current, key| current.as_map().and_then(|m| m.get(*key)))
}

fn value_matches(value: &Dynamic, matcher: &Matcher) -> bool {
    match value {
        Dynamic::String(s) => matcher.matches(s),
        Dynamic::Bool(b) => matcher.matches(&b.to_string()),
        Dynamic::Number(n) => matcher.matches(&number_string(*n)),
        Dynamic::List(items) => items.iter().any(|v| value_matches(v, matcher)),
        Dynamic::Map(_) | Dynamic::Null | Dynamic::Unknown => false,
    }
}

fn number_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}
