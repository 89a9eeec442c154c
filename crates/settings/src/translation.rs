use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use livebase_core::{
    DomainError, DomainResult, EntityId, Timestamps, entity_id, impl_record, required_text,
};

entity_id!(
    /// Derived from (locale, namespace, key).
    TranslationId,
    "TranslationId"
);

impl TranslationId {
    pub fn for_key(locale: &str, namespace: &str, key: &str) -> Self {
        let name = format!("{locale}\u{1f}{namespace}\u{1f}{key}");
        Self(EntityId::from_uuid(Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            name.as_bytes(),
        )))
    }
}

/// Namespace → key → text for one locale.
pub type Bundle = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub locale: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(Translation, TranslationId, "translations");

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationInput {
    pub locale: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// Language tag such as `en`, `zh-CN` or `pt-BR`; the region is uppercased.
pub fn normalize_locale(raw: &str) -> DomainResult<String> {
    let raw = raw.trim().replace('_', "-");
    let mut parts = raw.split('-');
    let lang = parts.next().unwrap_or_default();
    let region = parts.next();
    let valid_lang = (2..=3).contains(&lang.len()) && lang.chars().all(|c| c.is_ascii_alphabetic());
    let valid_region = region.is_none_or(|r| {
        (2..=4).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
    });
    if !valid_lang || !valid_region || parts.next().is_some() {
        return Err(DomainError::validation(format!("invalid locale '{raw}'")));
    }
    Ok(match region {
        Some(r) => format!("{}-{}", lang.to_ascii_lowercase(), r.to_ascii_uppercase()),
        None => lang.to_ascii_lowercase(),
    })
}

impl Translation {
    pub fn create(input: TranslationInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let locale = normalize_locale(&input.locale)?;
        let namespace = required_text("namespace", &input.namespace, 64)?;
        let key = required_text("key", &input.key, 128)?;
        Ok(Self {
            id: TranslationId::for_key(&locale, &namespace, &key),
            locale,
            namespace,
            key,
            value: input.value,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    pub fn set_value(&mut self, value: String, now: DateTime<Utc>) {
        self.value = value;
        self.timestamps.touch(now);
    }
}

/// Group translations of one locale by namespace.
pub fn build_bundle<'a>(locale: &str, translations: impl IntoIterator<Item = &'a Translation>) -> Bundle {
    let mut bundle = Bundle::new();
    for t in translations.into_iter().filter(|t| t.locale == locale) {
        bundle
            .entry(t.namespace.clone())
            .or_default()
            .insert(t.key.clone(), t.value.clone());
    }
    bundle
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationFilter {
    pub locale: Option<String>,
    pub namespace: Option<String>,
    pub keyword: Option<String>,
}

impl TranslationFilter {
    pub fn matches(&self, t: &Translation) -> bool {
        self.locale
            .as_deref()
            .is_none_or(|l| normalize_locale(l).is_ok_and(|l| l == t.locale))
            && self.namespace.as_deref().is_none_or(|n| n == t.namespace)
            && livebase_core::matches_keyword(self.keyword.as_deref(), &[&t.key, &t.value])
    }
}
