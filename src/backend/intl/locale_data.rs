//! Locale data provider for list formatting.

use std::fmt;

use crate::backend::error::{JsError, JsResult};

use super::{canonicalize_language_tag, ListStyle, ListType};

/// Joining patterns for one locale, type and style
///
/// Each pattern contains `{0}` and `{1}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPatterns {
    pub pair: String,
    pub start: String,
    pub middle: String,
    pub end: String,
}

impl ListPatterns {
    fn new(pair: &str, start: &str, middle: &str, end: &str) -> Self {
        ListPatterns {
            pair: pair.to_string(),
            start: start.to_string(),
            middle: middle.to_string(),
            end: end.to_string(),
        }
    }

    /// Patterns of the form "{0}, {1}" everywhere except the last join
    fn with_final(separator: &str, pair: &str, end: &str) -> Self {
        let sep = format!("{{0}}{}{{1}}", separator);
        ListPatterns::new(pair, &sep, &sep, end)
    }
}

/// Source of locale availability and formatting resources
pub trait LocaleData: Send + Sync + fmt::Debug {
    /// Locale used when no requested locale is available
    fn default_locale(&self) -> &str;

    /// Whether `locale` (canonical form) is supported
    fn is_available(&self, locale: &str) -> bool;

    /// Load list patterns; failures surface as `ResourceUnavailable`
    fn list_patterns(&self, locale: &str, list_type: ListType, style: ListStyle)
        -> JsResult<ListPatterns>;
}

/// Locale data compiled into the crate
///
/// `available` is what the provider advertises; a locale may be advertised
/// without bundled patterns, in which case loading its resources fails.
#[derive(Debug, Clone)]
pub struct BuiltinLocaleData {
    default_locale: String,
    available: Vec<String>,
}

impl BuiltinLocaleData {
    pub fn new(default_locale: &str, available: &[String]) -> Self {
        let canonical = |tag: &str| canonicalize_language_tag(tag).unwrap_or_else(|_| tag.to_string());
        BuiltinLocaleData {
            default_locale: canonical(default_locale),
            available: available.iter().map(|tag| canonical(tag)).collect(),
        }
    }
}

impl Default for BuiltinLocaleData {
    fn default() -> Self {
        let available: Vec<String> = ["en", "de", "fr", "es"].iter().map(|s| s.to_string()).collect();
        BuiltinLocaleData::new("en", &available)
    }
}

impl LocaleData for BuiltinLocaleData {
    fn default_locale(&self) -> &str {
        &self.default_locale
    }

    fn is_available(&self, locale: &str) -> bool {
        self.available.iter().any(|l| l == locale)
    }

    fn list_patterns(
        &self,
        locale: &str,
        list_type: ListType,
        style: ListStyle,
    ) -> JsResult<ListPatterns> {
        let language = locale.split('-').next().unwrap_or(locale);
        bundled_patterns(language, list_type, style).ok_or_else(|| {
            JsError::ResourceUnavailable(format!(
                "No list format data for locale '{}'",
                locale
            ))
        })
    }
}

fn bundled_patterns(language: &str, list_type: ListType, style: ListStyle) -> Option<ListPatterns> {
    use ListStyle::*;
    use ListType::*;

    let patterns = match (language, list_type, style) {
        ("en", Conjunction, Long) => ListPatterns::with_final(", ", "{0} and {1}", "{0}, and {1}"),
        ("en", Conjunction, Short) => ListPatterns::with_final(", ", "{0} & {1}", "{0}, & {1}"),
        ("en", Conjunction, Narrow) => ListPatterns::with_final(", ", "{0}, {1}", "{0}, {1}"),
        ("en", Disjunction, _) => ListPatterns::with_final(", ", "{0} or {1}", "{0}, or {1}"),
        ("en", Unit, Long) | ("en", Unit, Short) => {
            ListPatterns::with_final(", ", "{0}, {1}", "{0}, {1}")
        }
        ("en", Unit, Narrow) => ListPatterns::with_final(" ", "{0} {1}", "{0} {1}"),

        ("de", Conjunction, _) => ListPatterns::with_final(", ", "{0} und {1}", "{0} und {1}"),
        ("de", Disjunction, _) => ListPatterns::with_final(", ", "{0} oder {1}", "{0} oder {1}"),
        ("de", Unit, Narrow) => ListPatterns::with_final(" ", "{0} {1}", "{0} {1}"),
        ("de", Unit, _) => ListPatterns::with_final(", ", "{0}, {1}", "{0} und {1}"),

        ("fr", Conjunction, _) => ListPatterns::with_final(", ", "{0} et {1}", "{0} et {1}"),
        ("fr", Disjunction, _) => ListPatterns::with_final(", ", "{0} ou {1}", "{0} ou {1}"),
        ("fr", Unit, Narrow) => ListPatterns::with_final(" ", "{0} {1}", "{0} {1}"),
        ("fr", Unit, _) => ListPatterns::with_final(", ", "{0} et {1}", "{0} et {1}"),

        ("es", Conjunction, _) => ListPatterns::with_final(", ", "{0} y {1}", "{0} y {1}"),
        ("es", Disjunction, _) => ListPatterns::with_final(", ", "{0} o {1}", "{0} o {1}"),
        ("es", Unit, Narrow) => ListPatterns::with_final(" ", "{0} {1}", "{0} {1}"),
        ("es", Unit, _) => ListPatterns::with_final(", ", "{0} y {1}", "{0} y {1}"),

        _ => return None,
    };
    Some(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_languages() {
        let data = BuiltinLocaleData::default();
        for locale in ["en", "de", "fr", "es"] {
            assert!(data.is_available(locale));
            assert!(data
                .list_patterns(locale, ListType::Conjunction, ListStyle::Long)
                .is_ok());
        }
    }

    #[test]
    fn test_region_falls_back_to_language_patterns() {
        let data = BuiltinLocaleData::default();
        let patterns = data
            .list_patterns("en-GB", ListType::Disjunction, ListStyle::Long)
            .unwrap();
        assert_eq!(patterns.pair, "{0} or {1}");
    }

    #[test]
    fn test_advertised_locale_without_data() {
        let data = BuiltinLocaleData::new("en", &["en".to_string(), "tlh".to_string()]);
        assert!(data.is_available("tlh"));
        let err = data
            .list_patterns("tlh", ListType::Conjunction, ListStyle::Long)
            .unwrap_err();
        assert!(matches!(err, JsError::ResourceUnavailable(_)));
    }
}
