// ABOUTME: Loosely typed field bag submitted by the presentation layer
// ABOUTME: Every action reads its inputs from here, trimmed and defaulted

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Form submission: string fields by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData {
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FormData::set`]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Raw value, untrimmed
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed value, empty when the field is missing
    pub fn field(&self, name: &str) -> String {
        self.get(name).map(str::trim).unwrap_or_default().to_string()
    }

    /// Trimmed value, or `default` when the field is missing or blank
    pub fn field_or(&self, name: &str, default: &str) -> String {
        let value = self.field(name);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_trimmed_and_defaulted() {
        let form = FormData::new()
            .with("name", "  Local  ")
            .with("pattern", "   ");

        assert_eq!(form.field("name"), "Local");
        assert_eq!(form.field("missing"), "");
        assert_eq!(form.field_or("pattern", "*"), "*");
        assert_eq!(form.get("name"), Some("  Local  "));
    }
}
