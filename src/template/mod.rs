//! Placeholder substitution for bundle documents.
//!
//! Supports `{{path.to.const}}` and `${path.to.const}`, with optional
//! whitespace around the path. Substitution is best-effort: a placeholder
//! whose path does not name a scalar in scope is left in the text as-is.

mod scope;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use scope::Scope;

const OPENERS: [(&str, &str); 2] = [("{{", "}}"), ("${", "}")];

/// Replaces every resolvable placeholder in `text`.
///
/// Substituted values are not rescanned, so a constant whose value contains
/// placeholder syntax is inserted literally.
pub fn substitute(scope: &Scope<'_>, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((start, open, close)) = next_opening(rest) {
        out.push_str(&rest[..start]);
        let after = &rest[start + open.len()..];

        let resolved = after.find(close).and_then(|end| {
            let value = placeholder_path(&after[..end]).and_then(|path| scope.lookup(path))?;
            Some((value, end))
        });

        match resolved {
            Some((value, end)) => {
                out.push_str(&value.to_string());
                rest = &after[end + close.len()..];
            }
            None => {
                // Only step over the first opener character so an inner
                // opener (`${{a}}`) still gets a chance to match.
                let step = rest[start..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&rest[start..start + step]);
                rest = &rest[start + step..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn next_opening(text: &str) -> Option<(usize, &'static str, &'static str)> {
    OPENERS
        .iter()
        .filter_map(|&(open, close)| text.find(open).map(|at| (at, open, close)))
        .min_by_key(|&(at, _, _)| at)
}

fn placeholder_path(inner: &str) -> Option<&str> {
    let path = inner.trim();
    let valid = !path.is_empty()
        && !path.contains(|c: char| c.is_whitespace() || c == '{' || c == '}')
        && path.split('.').all(|segment| !segment.is_empty());
    valid.then_some(path)
}

/// Substitutes every string inside a YAML value, including strings nested
/// in sequences and mappings. Keys are left alone.
pub fn substitute_value(scope: &Scope<'_>, value: &mut serde_yaml::Value) {
    use serde_yaml::Value;

    match value {
        Value::String(s) => *s = substitute(scope, s),
        Value::Sequence(items) => {
            for item in items {
                substitute_value(scope, item);
            }
        }
        Value::Mapping(mapping) => {
            for (_key, item) in mapping.iter_mut() {
                substitute_value(scope, item);
            }
        }
        Value::Tagged(tagged) => substitute_value(scope, &mut tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Returns a copy of `definition` with every string field substituted.
pub fn render<T>(definition: &T, scope: &Scope<'_>) -> Result<T, serde_yaml::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_yaml::to_value(definition)?;
    substitute_value(scope, &mut value);
    serde_yaml::from_value(value)
}
