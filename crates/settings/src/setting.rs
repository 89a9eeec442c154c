use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use livebase_core::{
    DomainError, DomainResult, Entity, Record, Timestamps, optional_text, required_text,
};

/// Declared type of a setting's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    Json,
}

impl SettingType {
    /// Coerce `raw` to this type. Strings are parsed for the non-string
    /// types; already-typed JSON values are accepted as they are.
    pub fn coerce(self, raw: Value) -> DomainResult<Value> {
        match (self, raw) {
            (SettingType::String, Value::String(s)) => Ok(Value::String(s)),
            (SettingType::String, other) => Err(type_error("string", &other)),

            (SettingType::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (SettingType::Number, Value::String(s)) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Value::from(i));
                }
                let f = trimmed
                    .parse::<f64>()
                    .map_err(|_| DomainError::validation(format!("'{s}' is not a number")))?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| DomainError::validation("number must be finite"))
            }
            (SettingType::Number, other) => Err(type_error("number", &other)),

            (SettingType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (SettingType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(DomainError::validation(format!("'{s}' is not a boolean"))),
            },
            (SettingType::Boolean, other) => Err(type_error("boolean", &other)),

            (SettingType::Json, Value::String(s)) => serde_json::from_str(&s)
                .map_err(|e| DomainError::validation(format!("invalid JSON: {e}"))),
            (SettingType::Json, other) => Ok(other),
        }
    }
}

fn type_error(expected: &str, got: &Value) -> DomainError {
    DomainError::validation(format!("expected a {expected} value, got {got}"))
}

fn validate_key(raw: &str) -> DomainResult<String> {
    let key = raw.trim().to_string();
    if key.is_empty()
        || key.len() > 64
        || !key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
    {
        return Err(DomainError::validation(
            "setting key must be 1-64 characters of a-z, 0-9, '_' and '.'",
        ));
    }
    Ok(key)
}

/// A typed key-value configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSetting {
    pub key: String,
    pub value: Value,
    pub value_type: SettingType,
    pub category: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl Entity for GlobalSetting {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Record for GlobalSetting {
    const KIND: &'static str = "settings";

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingInput {
    pub key: String,
    pub value: Value,
    pub value_type: SettingType,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingUpdate {
    pub value: Option<Value>,
    pub value_type: Option<SettingType>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl GlobalSetting {
    pub fn create(input: SettingInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            key: validate_key(&input.key)?,
            value: input.value_type.coerce(input.value)?,
            value_type: input.value_type,
            category: required_text("category", &input.category, 32)?,
            description: optional_text("description", input.description.as_deref(), 500)?,
            is_system: false,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn update(&mut self, patch: SettingUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(t) = patch.value_type {
            if t != self.value_type {
                if self.is_system {
                    return Err(DomainError::invariant(format!(
                        "type of system setting '{}' cannot change",
                        self.key
                    )));
                }
                self.value_type = t;
                if patch.value.is_none() {
                    self.value = t.coerce(self.value.clone())?;
                }
            }
        }
        if let Some(category) = patch.category {
            let category = required_text("category", &category, 32)?;
            if self.is_system && category != self.category {
                return Err(DomainError::invariant(format!(
                    "category of system setting '{}' cannot change",
                    self.key
                )));
            }
            self.category = category;
        }
        if let Some(value) = patch.value {
            self.value = self.value_type.coerce(value)?;
        }
        if patch.description.is_some() {
            self.description = optional_text("description", patch.description.as_deref(), 500)?;
        }
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_system {
            return Err(DomainError::invariant(format!(
                "system setting '{}' cannot be deleted",
                self.key
            )));
        }
        Ok(())
    }

    fn system(key: &str, value: Value, value_type: SettingType, category: &str, description: &str, now: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            value,
            value_type,
            category: category.to_string(),
            description: Some(description.to_string()),
            is_system: true,
            timestamps: Timestamps::new(now),
            version: 0,
        }
    }

    /// Built-in settings every tenant has until it overrides them.
    pub fn system_defaults(now: DateTime<Utc>) -> Vec<Self> {
        vec![
            Self::system(
                "site.name",
                Value::from("LiveBase"),
                SettingType::String,
                "general",
                "Name shown in the admin header",
                now,
            ),
            Self::system(
                "site.default_locale",
                Value::from("zh-CN"),
                SettingType::String,
                "general",
                "Locale used when the client sends none",
                now,
            ),
            Self::system(
                "inventory.low_stock_threshold",
                Value::from(10),
                SettingType::Number,
                "inventory",
                "Quantity below which stock is reported as low",
                now,
            ),
            Self::system(
                "purchasing.require_expected_date",
                Value::Bool(false),
                SettingType::Boolean,
                "purchasing",
                "Whether purchase orders need an expected arrival date",
                now,
            ),
            Self::system(
                "uploads.allowed_types",
                serde_json::json!(["image/jpeg", "image/png", "image/webp"]),
                SettingType::Json,
                "uploads",
                "Content types accepted by the upload endpoint",
                now,
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingFilter {
    pub category: Option<String>,
    pub keyword: Option<String>,
}

impl SettingFilter {
    pub fn matches(&self, s: &GlobalSetting) -> bool {
        self.category.as_deref().is_none_or(|c| c == s.category)
            && livebase_core::matches_keyword(
                self.keyword.as_deref(),
                &[&s.key, s.description.as_deref().unwrap_or_default()],
            )
    }
}
