use anyhow::{Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Locales with a message catalog
pub const SUPPORTED_LOCALES: &[&str] = &["en", "ru"];

/// Locale used when the user's language has no catalog
pub const DEFAULT_LOCALE: &str = "en";

/// Localization manager for the dictrainer bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Load every supported catalog from the locales directory
    pub fn new() -> Result<Self> {
        Self::from_dir(locales_dir())
    }

    /// Load catalogs from `dir/<locale>/main.ftl`
    pub fn from_dir(dir: PathBuf) -> Result<Self> {
        let mut bundles = HashMap::new();

        for locale_str in SUPPORTED_LOCALES {
            let locale: LanguageIdentifier = locale_str
                .parse()
                .with_context(|| format!("Invalid locale identifier {locale_str}"))?;
            let path = dir.join(locale_str).join("main.ftl");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read catalog {}", path.display()))?;
            bundles.insert(locale_str.to_string(), Self::create_bundle(locale, content)?);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: LanguageIdentifier, content: String) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Isolation marks end up verbatim in Telegram messages
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(content)
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid catalog for {}: {:?}", locale, errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate messages for {}: {:?}", locale, errors))?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&FluentArgs<'_>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LOCALE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match bundle.get_message(key).and_then(|msg| msg.value()) {
            Some(pattern) => pattern,
            None => return format!("Missing translation: {}", key),
        };

        let mut errors = Vec::new();
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, language = %language, errors = ?errors, "Failed to format message");
        }
        value.into_owned()
    }

    /// Get a localized message with arguments in a specific language
    pub fn get_message_with_args_in_language(
        &self,
        key: &str,
        language: &str,
        args: &[(&str, &str)],
    ) -> String {
        let fluent_args = FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, argument_value(v))));
        self.get_message_in_language(key, language, Some(&fluent_args))
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }
}

/// Integers become numbers so plural selectors can match them; anything that
/// would not print back identically, such as `007`, stays a string
fn argument_value(value: &str) -> FluentValue<'_> {
    match value.parse::<i64>() {
        Ok(number) if number.to_string() == value => FluentValue::from(number),
        _ => FluentValue::from(value),
    }
}

/// Directory holding the message catalogs; `LOCALES_DIR` overrides the
/// directory shipped with the crate
pub fn locales_dir() -> PathBuf {
    std::env::var("LOCALES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("locales"))
}

/// Create the shared localization manager
pub fn create_localization_manager() -> Result<Arc<LocalizationManager>> {
    Ok(Arc::new(LocalizationManager::new()?))
}

/// Detect the appropriate language based on user's Telegram language code
pub fn detect_language(localization: &LocalizationManager, language_code: Option<&str>) -> String {
    if let Some(code) = language_code {
        // "ru-RU" -> "ru", "en_US" -> "en"
        let lang = code.split(['-', '_']).next().unwrap_or(DEFAULT_LOCALE).to_lowercase();
        if localization.is_language_supported(&lang) {
            return lang;
        }
    }

    DEFAULT_LOCALE.to_string()
}

/// Convenience function to get a localized message in user's language
pub fn t_lang(localization: &LocalizationManager, key: &str, language_code: Option<&str>) -> String {
    let language = detect_language(localization, language_code);
    localization.get_message_in_language(key, &language, None)
}

/// Convenience function to get a localized message with arguments in user's language
pub fn t_args_lang(
    localization: &LocalizationManager,
    key: &str,
    args: &[(&str, &str)],
    language_code: Option<&str>,
) -> String {
    let language = detect_language(localization, language_code);
    localization.get_message_with_args_in_language(key, &language, args)
}

/// Like [`t_args_lang`] for owned argument values
pub fn t_owned_args_lang(
    localization: &LocalizationManager,
    key: &str,
    args: &[(&str, String)],
    language_code: Option<&str>,
) -> String {
    let borrowed: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
    t_args_lang(localization, key, &borrowed, language_code)
}
