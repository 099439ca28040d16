//! Locale / options initializer collaborator for list formatting.
//!
//! `ListFormatInitializer::initialize(locales, options)` validates the option
//! value sets and their combination, resolves a locale against the data
//! provider, and returns an immutable [`ListFormatConfig`]. The formatting
//! resource itself is built lazily on first use; missing data surfaces then as
//! [`JsError::ResourceUnavailable`].

mod locale_data;

use std::fmt;
use std::sync::{Arc, OnceLock};

use itertools::Itertools;
use smallvec::SmallVec;
use tracing::debug;

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::{ObjectRef, PropertyKey, Value};

pub use locale_data::{BuiltinLocaleData, ListPatterns, LocaleData};

/// Requested locale list after canonicalization
pub type LocaleList = SmallVec<[String; 4]>;

/// The `type` option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Conjunction,
    Disjunction,
    Unit,
}

impl ListType {
    pub const VALUES: [&'static str; 3] = ["conjunction", "disjunction", "unit"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conjunction" => Some(ListType::Conjunction),
            "disjunction" => Some(ListType::Disjunction),
            "unit" => Some(ListType::Unit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Conjunction => "conjunction",
            ListType::Disjunction => "disjunction",
            ListType::Unit => "unit",
        }
    }
}

/// The `style` option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Long,
    Short,
    Narrow,
}

impl ListStyle {
    pub const VALUES: [&'static str; 3] = ["long", "short", "narrow"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "long" => Some(ListStyle::Long),
            "short" => Some(ListStyle::Short),
            "narrow" => Some(ListStyle::Narrow),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListStyle::Long => "long",
            ListStyle::Short => "short",
            ListStyle::Narrow => "narrow",
        }
    }
}

/// The `localeMatcher` option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleMatcher {
    Lookup,
    BestFit,
}

impl LocaleMatcher {
    pub const VALUES: [&'static str; 2] = ["lookup", "best fit"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lookup" => Some(LocaleMatcher::Lookup),
            "best fit" => Some(LocaleMatcher::BestFit),
            _ => None,
        }
    }
}

/// Validated, immutable list-format configuration
#[derive(Debug)]
pub struct ListFormatConfig {
    requested_locales: LocaleList,
    locale: String,
    list_type: ListType,
    style: ListStyle,
    locale_matcher: LocaleMatcher,
    data: Arc<dyn LocaleData>,
    formatter: OnceLock<JsResult<Arc<ListFormatter>>>,
}

impl ListFormatConfig {
    pub fn requested_locales(&self) -> &[String] {
        &self.requested_locales
    }

    /// The resolved locale
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn list_type(&self) -> ListType {
        self.list_type
    }

    pub fn style(&self) -> ListStyle {
        self.style
    }

    pub fn locale_matcher(&self) -> LocaleMatcher {
        self.locale_matcher
    }

    /// Whether the formatting resource has been built (successfully or not)
    pub fn is_formatter_built(&self) -> bool {
        self.formatter.get().is_some()
    }

    /// The formatting resource, built on first call
    pub fn formatter(&self) -> JsResult<Arc<ListFormatter>> {
        self.formatter
            .get_or_init(|| {
                debug!(
                    target: "spectree::intl",
                    locale = %self.locale,
                    list_type = self.list_type.as_str(),
                    style = self.style.as_str(),
                    "building list formatter"
                );
                self.data
                    .list_patterns(&self.locale, self.list_type, self.style)
                    .map(|patterns| Arc::new(ListFormatter::new(patterns)))
            })
            .clone()
    }

    /// Format `items` with this configuration
    pub fn format(&self, items: &[&str]) -> JsResult<String> {
        Ok(self.formatter()?.format(items))
    }
}

/// Joins a list of strings using a locale's patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFormatter {
    patterns: ListPatterns,
}

impl ListFormatter {
    pub fn new(patterns: ListPatterns) -> Self {
        ListFormatter { patterns }
    }

    pub fn format(&self, items: &[&str]) -> String {
        match items {
            [] => String::new(),
            [only] => only.to_string(),
            [first, second] => fill(&self.patterns.pair, first, second),
            [first, middle @ .., second_last, last] => {
                let mut tail = fill(&self.patterns.end, second_last, last);
                for item in middle.iter().rev() {
                    tail = fill(&self.patterns.middle, item, &tail);
                }
                fill(&self.patterns.start, first, &tail)
            }
        }
    }
}

/// Substitute `{0}` and `{1}` in one pass, so placeholders inside the
/// inserted text are left alone
fn fill(pattern: &str, first: &str, second: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + first.len() + second.len());
    let mut rest = pattern;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{0}") {
            out.push_str(first);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{1}") {
            out.push_str(second);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Builds [`ListFormatConfig`]s against one locale data provider
#[derive(Debug, Clone)]
pub struct ListFormatInitializer {
    data: Arc<dyn LocaleData>,
}

impl ListFormatInitializer {
    pub fn new(data: Arc<dyn LocaleData>) -> Self {
        ListFormatInitializer { data }
    }

    pub fn locale_data(&self) -> &Arc<dyn LocaleData> {
        &self.data
    }

    /// Validate `locales` and `options` and produce a configuration
    pub fn initialize(&self, locales: &Value, options: &Value) -> JsResult<ListFormatConfig> {
        let requested = canonicalize_locale_list(locales)?;
        let options = create_options_object(options)?;

        let matcher = get_string_option(options.as_ref(), "localeMatcher", &LocaleMatcher::VALUES, "best fit")?;
        let list_type = get_string_option(options.as_ref(), "type", &ListType::VALUES, "conjunction")?;
        let style = get_string_option(options.as_ref(), "style", &ListStyle::VALUES, "long")?;

        // get_string_option only returns members of the allowed sets
        let locale_matcher = LocaleMatcher::parse(&matcher).unwrap_or(LocaleMatcher::BestFit);
        let list_type = ListType::parse(&list_type).unwrap_or(ListType::Conjunction);
        let style = ListStyle::parse(&style).unwrap_or(ListStyle::Long);

        if style == ListStyle::Narrow && list_type != ListType::Unit {
            return Err(JsError::Range(
                "When style is 'narrow', 'unit' is the only allowed value for the type option."
                    .to_string(),
            ));
        }

        let locale = resolve_locale(&requested, self.data.as_ref());
        debug!(
            target: "spectree::intl",
            requested = ?requested.as_slice(),
            %locale,
            "resolved list format locale"
        );

        Ok(ListFormatConfig {
            requested_locales: requested,
            locale,
            list_type,
            style,
            locale_matcher,
            data: Arc::clone(&self.data),
            formatter: OnceLock::new(),
        })
    }
}

impl Default for ListFormatInitializer {
    fn default() -> Self {
        ListFormatInitializer::new(Arc::new(BuiltinLocaleData::default()))
    }
}

/// Canonicalize a BCP 47 language tag
///
/// Accepts `language[-script][-region][-variant...]` plus extension and
/// private-use tails. Language is lower case, script title case, region
/// upper case.
pub fn canonicalize_language_tag(tag: &str) -> JsResult<String> {
    let invalid = || JsError::Range(format!("Incorrect locale information provided: {}", tag));

    let subtags: Vec<&str> = tag.split('-').collect();
    if subtags
        .iter()
        .any(|s| s.is_empty() || s.len() > 8 || !s.bytes().all(|b| b.is_ascii_alphanumeric()))
    {
        return Err(invalid());
    }

    let language = subtags[0];
    if !(matches!(language.len(), 2 | 3 | 5..=8) && language.bytes().all(|b| b.is_ascii_alphabetic())) {
        return Err(invalid());
    }

    let mut out = vec![language.to_ascii_lowercase()];
    let mut in_extension = false;
    for (position, subtag) in subtags.iter().enumerate().skip(1) {
        let alpha = subtag.bytes().all(|b| b.is_ascii_alphabetic());
        let digits = subtag.bytes().all(|b| b.is_ascii_digit());
        let canonical = if in_extension {
            subtag.to_ascii_lowercase()
        } else if subtag.len() == 1 {
            in_extension = true;
            subtag.to_ascii_lowercase()
        } else if position == 1 && subtag.len() == 4 && alpha {
            title_case(subtag)
        } else if position == 1 && subtag.len() == 3 && alpha {
            subtag.to_ascii_lowercase()
        } else if (subtag.len() == 2 && alpha) || (subtag.len() == 3 && digits) {
            subtag.to_ascii_uppercase()
        } else if subtag.len() >= 4 {
            subtag.to_ascii_lowercase()
        } else {
            return Err(invalid());
        };
        out.push(canonical);
    }
    if in_extension && subtags.last().map_or(false, |s| s.len() == 1) {
        // dangling singleton
        return Err(invalid());
    }
    Ok(out.join("-"))
}

fn title_case(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

/// Canonicalize the `locales` argument into a duplicate-free list
pub fn canonicalize_locale_list(locales: &Value) -> JsResult<LocaleList> {
    let raw: Vec<Value> = match locales {
        Value::Undefined => return Ok(LocaleList::new()),
        Value::Null => {
            return Err(JsError::Type(
                "Cannot convert undefined or null to object".to_string(),
            ))
        }
        Value::String(_) => vec![locales.clone()],
        // Holes are skipped; indices stored sparsely still count
        Value::Object(obj) => (0..obj.length())
            .map(PropertyKey::Index)
            .filter(|key| obj.has_own(key))
            .map(|key| obj.get(&key))
            .collect(),
        _ => return Ok(LocaleList::new()),
    };

    raw.iter()
        .map(|value| match value {
            Value::String(tag) => canonicalize_language_tag(tag),
            other => Err(JsError::Type(format!(
                "Language ID should be string or object, got {}",
                other.type_name()
            ))),
        })
        .collect::<JsResult<Vec<String>>>()
        .map(|tags| tags.into_iter().unique().collect())
}

/// Options argument: `undefined` means no options, `null` is an error
fn create_options_object(options: &Value) -> JsResult<Option<ObjectRef>> {
    match options {
        Value::Undefined => Ok(None),
        Value::Null => Err(JsError::Type(
            "Cannot convert undefined or null to object".to_string(),
        )),
        Value::Object(obj) => Ok(Some(ObjectRef::clone(obj))),
        _ => Ok(None),
    }
}

fn get_string_option(
    options: Option<&ObjectRef>,
    name: &str,
    allowed: &[&str],
    default: &str,
) -> JsResult<String> {
    let value = match options.and_then(|obj| obj.get_named(name)) {
        None | Some(Value::Undefined) => return Ok(default.to_string()),
        Some(value) => value.to_display_string(),
    };
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(JsError::Range(format!(
            "Value {} out of range for Intl.ListFormat options property {}",
            value, name
        )))
    }
}

/// Lookup matching: first requested locale, or a truncation of it, that the
/// provider supports; otherwise the provider default
fn resolve_locale(requested: &[String], data: &dyn LocaleData) -> String {
    for locale in requested {
        let mut candidate = locale.as_str();
        loop {
            if data.is_available(candidate) {
                return candidate.to_string();
            }
            let Some(cut) = candidate.rfind('-') else { break };
            candidate = &candidate[..cut];
            // never leave a dangling singleton
            if candidate.len() >= 2 && candidate.as_bytes()[candidate.len() - 2] == b'-' {
                candidate = &candidate[..candidate.len() - 2];
            }
        }
    }
    data.default_locale().to_string()
}

impl fmt::Display for ListFormatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ListFormat({}, {}, {})",
            self.locale,
            self.list_type.as_str(),
            self.style.as_str()
        )
    }
}
