// Environment variable loading

use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Prefix used for client settings, e.g. `NSGIFTS_BASE_URL`.
pub const DEFAULT_PREFIX: &str = "NSGIFTS";

/// Environment variable loader
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader for variables starting with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load all prefixed environment variables
    pub fn load(&self) -> HashMap<String, Value> {
        self.load_from(env::vars())
    }

    /// Load prefixed variables from an explicit set of pairs.
    ///
    /// Keys are stripped of the prefix and lowercased, so `NSGIFTS_MAX_RETRIES`
    /// becomes `max_retries`. Values are coerced to numbers or booleans when
    /// they parse as such.
    pub fn load_from<I>(&self, vars: I) -> HashMap<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{}_", self.prefix);
        vars.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_lowercase(), coerce(&value)))
            })
            .collect()
    }

}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Turn a raw environment string into the closest JSON scalar.
pub(crate) fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = trimmed.parse::<f64>()
        && f.is_finite()
    {
        return Value::from(f);
    }
    match trimmed.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_is_stripped_and_lowercased() {
        let loader = EnvLoader::default();
        let loaded = loader.load_from(pairs(&[
            ("NSGIFTS_BASE_URL", "https://example.com"),
            ("NSGIFTS_MAX_RETRIES", "5"),
            ("OTHER_VAR", "ignored"),
            ("NSGIFTS_", "ignored"),
        ]));

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["base_url"], Value::from("https://example.com"));
        assert_eq!(loaded["max_retries"], Value::from(5));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce("42"), Value::from(42));
        assert_eq!(coerce("1.5"), Value::from(1.5));
        assert_eq!(coerce("TRUE"), Value::Bool(true));
        assert_eq!(coerce("false"), Value::Bool(false));
        assert_eq!(coerce("hello"), Value::from("hello"));
    }
}
