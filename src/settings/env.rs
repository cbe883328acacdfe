//! Environment variable settings source.
//!
//! `LIVEBOT__DISCORD__TOKEN=...` lands at `discord.token`: the prefix and
//! separator are stripped, the rest is split on the separator and
//! lower-cased.

use toml::Value;

use super::source::{SettingsEntry, SettingsSource};
use super::SettingsError;

#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    fn entries_from(&self, vars: impl IntoIterator<Item = (String, String)>) -> Vec<SettingsEntry> {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries = Vec::new();

        for (key, value) in vars {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            if path_str.is_empty() {
                continue;
            }

            let path: Vec<String> = path_str
                .split(&self.separator)
                .map(str::to_lowercase)
                .collect();
            entries.push(SettingsEntry::at_path(path, coerce_value(&value)));
        }

        entries
    }
}

impl SettingsSource for EnvSource {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError> {
        Ok(self.entries_from(std::env::vars()))
    }
}

/// Picks the most specific type for an environment value: boolean,
/// integer, float, then string.
fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_and_path_mapping() {
        let source = EnvSource::new("LIVEBOT", "__");
        let entries = source.entries_from(vars(&[
            ("LIVEBOT__DISCORD__TOKEN", "abc.def"),
            ("LIVEBOT__DEV_MODE", "TRUE"),
            ("LIVEBOT__", "ignored"),
            ("OTHER__DISCORD__TOKEN", "ignored"),
        ]));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, vec!["discord", "token"]);
        assert_eq!(entries[0].value, Value::String("abc.def".into()));
        assert_eq!(entries[1].path, vec!["dev_mode"]);
        assert_eq!(entries[1].value, Value::Boolean(true));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce_value("42"), Value::Integer(42));
        assert_eq!(coerce_value("-7"), Value::Integer(-7));
        assert_eq!(coerce_value("1.5"), Value::Float(1.5));
        assert_eq!(coerce_value("https://x.y/b.zip"), Value::String("https://x.y/b.zip".into()));
        // too large for i64: stays text
        assert_eq!(
            coerce_value("99999999999999999999"),
            Value::String("99999999999999999999".into())
        );
    }
}
