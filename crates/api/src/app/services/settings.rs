//! Currency rates, global settings and translations.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use livebase_auth::Action;
use livebase_core::{DomainError, Page, PageRequest, paginate};
use livebase_infra::{StoreError, WriteBatch};
use livebase_settings::{
    build_bundle, convert, normalize_locale, Bundle, CurrencyRate, CurrencyRateId,
    CurrencyRateInput, GlobalSetting, RateFilter, SettingFilter, SettingInput, SettingUpdate,
    Translation, TranslationFilter, TranslationId, TranslationInput,
};

use super::{Change, TenantServices};
use crate::app::dto::{Conversion, ConvertQuery};
use crate::app::errors::ServiceResult;

pub const CURRENCY_RATES: &str = "currency_rates";
const UPLOAD_TYPES_KEY: &str = "uploads.allowed_types";

pub const SETTINGS: &str = "settings";
pub const TRANSLATIONS: &str = "translations";

impl TenantServices {
    // -------------------------
    // Currency rates
    // -------------------------

    pub async fn list_rates(&self, filter: RateFilter, page: PageRequest) -> ServiceResult<Page<CurrencyRate>> {
        self.require(CURRENCY_RATES, Action::Read)?;
        let mut rates: Vec<CurrencyRate> = self.list_all().await?;
        rates.retain(|r| filter.matches(r));
        rates.sort_by(|a, b| {
            (a.base_currency, a.quote_currency)
                .cmp(&(b.base_currency, b.quote_currency))
                .then_with(|| b.effective_on.cmp(&a.effective_on))
        });
        Ok(paginate(rates, &page))
    }

    /// Insert the rate or replace the one for the same pair and date.
    pub async fn upsert_rate(&self, input: CurrencyRateInput) -> ServiceResult<CurrencyRate> {
        self.require(CURRENCY_RATES, Action::Write)?;
        let now = self.now();
        let incoming = CurrencyRate::create(input, now)?;
        let (mut rate, action) = match self.repo::<CurrencyRate>().get(&incoming.id).await? {
            Some(mut existing) => {
                existing.replace_with(incoming, now);
                (existing, "updated")
            }
            None => (incoming, "created"),
        };
        self.save(CURRENCY_RATES, &mut rate, action).await?;
        info!(
            tenant_id = %self.tenant_id(),
            pair = %format!("{}/{}", rate.base_currency, rate.quote_currency),
            effective_on = %rate.effective_on,
            rate = %rate.rate,
            "currency rate saved"
        );
        Ok(rate)
    }

    pub async fn delete_rate(&self, id: CurrencyRateId) -> ServiceResult<()> {
        self.require(CURRENCY_RATES, Action::Delete)?;
        let rate: CurrencyRate = self.find(&id).await?;
        self.remove(CURRENCY_RATES, &rate).await
    }

    pub async fn convert_amount(&self, query: ConvertQuery) -> ServiceResult<Conversion> {
        self.require(CURRENCY_RATES, Action::Read)?;
        let on = query.on.unwrap_or_else(|| self.today());
        let rates: Vec<CurrencyRate> = if query.from == query.to {
            Vec::new()
        } else {
            self.list_all().await?
        };
        let converted = convert(query.amount, query.from, query.to, on, &rates)?;
        Ok(Conversion {
            amount: query.amount,
            from: query.from,
            to: query.to,
            on,
            converted,
        })
    }

    // -------------------------
    // Global settings
    // -------------------------

    /// Stored settings, with any missing system defaults written first.
    async fn seeded_settings(&self) -> ServiceResult<Vec<GlobalSetting>> {
        let mut settings: Vec<GlobalSetting> = self.list_all().await?;
        let present: BTreeSet<String> = settings.iter().map(|s| s.key.clone()).collect();
        let mut missing: Vec<GlobalSetting> = GlobalSetting::system_defaults(self.now())
            .into_iter()
            .filter(|s| !present.contains(&s.key))
            .collect();
        if missing.is_empty() {
            return Ok(settings);
        }

        let mut batch = WriteBatch::new();
        for setting in &mut missing {
            batch.put(setting)?;
        }
        match self.app.store.commit(self.tenant_id(), batch).await {
            Ok(()) => {
                debug!(tenant_id = %self.tenant_id(), count = missing.len(), "system settings seeded");
                settings.extend(missing);
                Ok(settings)
            }
            // Another request seeded them first.
            Err(StoreError::Conflict(_)) => Ok(self.list_all().await?),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_settings(&self, filter: SettingFilter, page: PageRequest) -> ServiceResult<Page<GlobalSetting>> {
        self.require(SETTINGS, Action::Read)?;
        let mut settings = self.seeded_settings().await?;
        settings.retain(|s| filter.matches(s));
        settings.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.key.cmp(&b.key)));
        Ok(paginate(settings, &page))
    }

    pub async fn get_setting(&self, key: &str) -> ServiceResult<GlobalSetting> {
        self.require(SETTINGS, Action::Read)?;
        self.seeded_settings()
            .await?
            .into_iter()
            .find(|s| s.key == key)
            .ok_or_else(|| DomainError::not_found(format!("setting '{key}'")).into())
    }

    /// Content types the tenant accepts for uploads; read on behalf of the
    /// upload endpoint, so no settings permission is needed.
    pub(crate) async fn allowed_upload_types(&self) -> ServiceResult<Vec<String>> {
        let types = self
            .seeded_settings()
            .await?
            .into_iter()
            .find(|s| s.key == UPLOAD_TYPES_KEY)
            .and_then(|s| serde_json::from_value::<Vec<String>>(s.value).ok())
            .unwrap_or_default();
        Ok(types.into_iter().map(|t| t.trim().to_ascii_lowercase()).collect())
    }

    pub async fn create_setting(&self, input: SettingInput) -> ServiceResult<GlobalSetting> {
        self.require(SETTINGS, Action::Write)?;
        let mut setting = GlobalSetting::create(input, self.now())?;
        if self
            .seeded_settings()
            .await?
            .iter()
            .any(|s| s.key == setting.key)
        {
            return Err(DomainError::conflict(format!("setting '{}' already exists", setting.key)).into());
        }
        self.save(SETTINGS, &mut setting, "created").await?;
        info!(tenant_id = %self.tenant_id(), key = %setting.key, "setting created");
        Ok(setting)
    }

    pub async fn update_setting(&self, key: &str, patch: SettingUpdate) -> ServiceResult<GlobalSetting> {
        self.require(SETTINGS, Action::Write)?;
        let mut setting = self.get_setting(key).await?;
        setting.update(patch, self.now())?;
        self.save(SETTINGS, &mut setting, "updated").await?;
        info!(tenant_id = %self.tenant_id(), key = %setting.key, "setting updated");
        Ok(setting)
    }

    pub async fn delete_setting(&self, key: &str) -> ServiceResult<()> {
        self.require(SETTINGS, Action::Delete)?;
        let setting: GlobalSetting = self.find(&key.to_string()).await?;
        setting.ensure_deletable()?;
        self.remove(SETTINGS, &setting).await
    }

    // -------------------------
    // Translations
    // -------------------------

    pub async fn list_translations(
        &self,
        filter: TranslationFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Translation>> {
        self.require(TRANSLATIONS, Action::Read)?;
        let locale = filter.locale.as_deref().map(normalize_locale).transpose()?;
        let filter = TranslationFilter { locale, ..filter };
        let mut items: Vec<Translation> = self.list_all().await?;
        items.retain(|t| filter.matches(t));
        items.sort_by(|a, b| {
            (&a.locale, &a.namespace, &a.key).cmp(&(&b.locale, &b.namespace, &b.key))
        });
        Ok(paginate(items, &page))
    }

    async fn stage_translation(
        &self,
        batch: &mut WriteBatch,
        changes: &mut Vec<Change>,
        input: TranslationInput,
    ) -> ServiceResult<Translation> {
        let now = self.now();
        let incoming = Translation::create(input, now)?;
        let (mut translation, action) = match self.repo::<Translation>().get(&incoming.id).await? {
            Some(mut existing) => {
                existing.set_value(incoming.value, now);
                (existing, "updated")
            }
            None => (incoming, "created"),
        };
        batch.put(&mut translation)?;
        changes.push(Change::new(TRANSLATIONS, translation.id, action));
        Ok(translation)
    }

    pub async fn upsert_translation(&self, input: TranslationInput) -> ServiceResult<Translation> {
        self.require(TRANSLATIONS, Action::Write)?;
        let mut batch = WriteBatch::new();
        let mut changes = Vec::new();
        let translation = self.stage_translation(&mut batch, &mut changes, input).await?;
        self.commit(batch, changes).await?;
        self.translations()
            .invalidate(self.tenant_id(), &translation.locale);
        Ok(translation)
    }

    /// Upsert many translations in one commit.
    pub async fn bulk_upsert_translations(&self, inputs: Vec<TranslationInput>) -> ServiceResult<usize> {
        self.require(TRANSLATIONS, Action::Write)?;
        if inputs.is_empty() {
            return Ok(0);
        }
        let mut batch = WriteBatch::new();
        let mut changes = Vec::new();
        let mut locales = BTreeSet::new();
        let mut seen = BTreeSet::new();
        for input in inputs {
            let translation = self.stage_translation(&mut batch, &mut changes, input).await?;
            if !seen.insert(translation.id) {
                return Err(DomainError::validation(format!(
                    "duplicate translation {}/{}/{} in bulk request",
                    translation.locale, translation.namespace, translation.key
                ))
                .into());
            }
            locales.insert(translation.locale);
        }
        let count = seen.len();
        self.commit(batch, changes).await?;
        for locale in &locales {
            self.translations().invalidate(self.tenant_id(), locale);
        }
        info!(tenant_id = %self.tenant_id(), count, locales = locales.len(), "translations imported");
        Ok(count)
    }

    pub async fn delete_translation(&self, id: TranslationId) -> ServiceResult<()> {
        self.require(TRANSLATIONS, Action::Delete)?;
        let translation: Translation = self.find(&id).await?;
        self.remove(TRANSLATIONS, &translation).await?;
        self.translations()
            .invalidate(self.tenant_id(), &translation.locale);
        Ok(())
    }

    /// All translations of `locale` grouped by namespace, cached per tenant.
    pub async fn translation_bundle(&self, locale: &str) -> ServiceResult<Arc<Bundle>> {
        self.require(TRANSLATIONS, Action::Read)?;
        let locale = normalize_locale(locale)?;
        if let Some(bundle) = self.translations().get(self.tenant_id(), &locale) {
            return Ok(bundle);
        }
        let seen = self.translations().generation(self.tenant_id(), &locale);
        let items: Vec<Translation> = self.list_all().await?;
        let bundle = build_bundle(&locale, &items);
        debug!(tenant_id = %self.tenant_id(), locale = %locale, namespaces = bundle.len(), "translation bundle built");
        Ok(self
            .translations()
            .insert_if_current(self.tenant_id(), &locale, seen, bundle))
    }
}

