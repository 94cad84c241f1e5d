use crate::error::{Result, WikiDiscoverError};
use crate::form_parameters::FormParameters;
use crate::wiki_query::{InvocationMode, MAX_LIMIT, QueryRequest, SiteProp, WikiState};
use std::collections::BTreeSet;
use tracing::warn;

pub const MODULE_NAME: &str = "wikidiscover";
pub const MODULE_PREFIX: &str = "wd";

/// Values of a multi-value parameter are `|`-separated, unless the value
/// starts with U+001F, in which case that character is the separator.
const MULTI_SEPARATOR: char = '|';
const ALT_MULTI_SEPARATOR: char = '\u{1f}';

/// Looks up a module parameter; the prefixed form (`wdstate`) wins over the bare one (`state`).
fn module_param<'a>(form_parameters: &'a FormParameters, name: &str) -> Option<&'a str> {
    form_parameters
        .get(&format!("{MODULE_PREFIX}{name}"))
        .or_else(|| form_parameters.get(name))
}

fn split_multi(value: &str) -> Vec<&str> {
    let parts: Vec<&str> = match value.strip_prefix(ALT_MULTI_SEPARATOR) {
        Some(rest) => rest.split(ALT_MULTI_SEPARATOR).collect(),
        None => value.split(MULTI_SEPARATOR).collect(),
    };
    parts
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses a multi-value enum parameter. `None` means "use the default".
fn parse_multi<T: Ord>(
    form_parameters: &FormParameters,
    name: &str,
    from_name: fn(&str) -> Option<T>,
) -> Result<Option<BTreeSet<T>>> {
    let Some(value) = module_param(form_parameters, name) else {
        return Ok(None);
    };
    let mut ret = BTreeSet::new();
    for part in split_multi(value) {
        match from_name(part) {
            Some(v) => {
                ret.insert(v);
            }
            None => {
                return Err(WikiDiscoverError::validation(
                    name,
                    format!("Unrecognized value '{part}'"),
                ));
            }
        }
    }
    Ok(if ret.is_empty() { None } else { Some(ret) })
}

fn parse_limit(form_parameters: &FormParameters) -> Result<usize> {
    let Some(value) = module_param(form_parameters, "limit") else {
        return Ok(MAX_LIMIT);
    };
    let value = value.trim();
    if value == "max" {
        return Ok(MAX_LIMIT);
    }
    let limit = match value.parse::<i64>() {
        Ok(requested) => {
            let limit = requested.clamp(1, MAX_LIMIT as i64) as usize;
            if limit as i64 != requested {
                warn!(requested, limit, "limit out of range, clamped");
            }
            limit
        }
        // Too many digits for i64: still an integer, clamp by sign.
        Err(_) if is_integer_literal(value) => {
            let limit = if value.starts_with('-') { 1 } else { MAX_LIMIT };
            warn!(requested = value, limit, "limit out of range, clamped");
            limit
        }
        Err(_) => {
            return Err(WikiDiscoverError::validation(
                "limit",
                format!("Invalid integer value '{value}'"),
            ));
        }
    };
    Ok(limit)
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Items are trimmed, so `a, b` restricts to `a` and `b` rather than to
/// `a` and ` b`. Empty items are dropped.
fn parse_wikis_list(form_parameters: &FormParameters) -> Option<BTreeSet<String>> {
    let ret: BTreeSet<String> = module_param(form_parameters, "wikislist")?
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if ret.is_empty() { None } else { Some(ret) }
}

fn parse_mode(form_parameters: &FormParameters) -> Result<InvocationMode> {
    if let Some(generator) = form_parameters.get("generator") {
        return if generator == MODULE_NAME {
            Ok(InvocationMode::Generator)
        } else {
            Err(WikiDiscoverError::validation(
                "generator",
                format!("Unrecognized value '{generator}'"),
            ))
        };
    }
    match form_parameters.get("action") {
        None => Ok(InvocationMode::Direct),
        Some(MODULE_NAME) => Ok(InvocationMode::Direct),
        Some("query") => match form_parameters.get("list") {
            Some(MODULE_NAME) => Ok(InvocationMode::Direct),
            other => Err(WikiDiscoverError::validation(
                "list",
                format!("Unrecognized value '{}'", other.unwrap_or_default()),
            )),
        },
        Some(other) => Err(WikiDiscoverError::validation(
            "action",
            format!("Unrecognized value '{other}'"),
        )),
    }
}

impl QueryRequest {
    /// Validates raw request parameters, filling in defaults.
    pub fn new_from_parameters(form_parameters: &FormParameters) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            states: parse_multi(form_parameters, "state", WikiState::from_name)?
                .unwrap_or(defaults.states),
            site_props: parse_multi(form_parameters, "siteprop", SiteProp::from_name)?
                .unwrap_or(defaults.site_props),
            limit: parse_limit(form_parameters)?,
            wikis_list: parse_wikis_list(form_parameters),
            mode: parse_mode(form_parameters)?,
        })
    }
}
