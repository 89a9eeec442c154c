//! Settings domain module: typed global settings, currency rates with
//! conversion, and UI translations.
//!
//! Pure domain logic: no IO, no HTTP, no storage.

pub mod rate;
pub mod setting;
pub mod translation;

pub use rate::{CurrencyRate, CurrencyRateId, CurrencyRateInput, RateFilter, convert};
pub use setting::{GlobalSetting, SettingFilter, SettingInput, SettingType, SettingUpdate};
pub use translation::{
    Bundle, Translation, TranslationFilter, TranslationId, TranslationInput, build_bundle,
    normalize_locale,
};
