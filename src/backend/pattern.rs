//! Pattern compilation collaborator.
//!
//! The node tree only ever sees two operations:
//!
//! - `compile(pattern, flags)` validates flags and syntax eagerly and returns
//!   an immutable [`CompiledPattern`] handle, or fails with
//!   [`JsError::PatternSyntax`] before any handle exists.
//! - `CompiledPattern::execute(subject, start)` runs the matcher.
//!
//! The default engine is backed by the `regex` crate. Constructs that crate
//! does not support (backreferences, lookaround) are reported as syntax errors.
//! Offsets are byte offsets into the UTF-8 subject. Without the `u` flag the
//! class escapes `\d \w \b` and their negations are ASCII-only.

use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::Value;

/// Parsed pattern flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
    pub dot_all: bool,
    pub unicode: bool,
    pub sticky: bool,
}

impl PatternFlags {
    /// Parse a flag string; unknown or repeated flags are rejected
    pub fn parse(flags: &str) -> Result<Self, String> {
        let mut parsed = PatternFlags::default();
        for c in flags.chars() {
            let slot = match c {
                'g' => &mut parsed.global,
                'i' => &mut parsed.ignore_case,
                'm' => &mut parsed.multiline,
                's' => &mut parsed.dot_all,
                'u' => &mut parsed.unicode,
                'y' => &mut parsed.sticky,
                other => return Err(format!("Invalid flag '{}'", other)),
            };
            if *slot {
                return Err(format!("Repeated flag '{}'", c));
            }
            *slot = true;
        }
        Ok(parsed)
    }
}

impl fmt::Display for PatternFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, c) in [
            (self.global, 'g'),
            (self.ignore_case, 'i'),
            (self.multiline, 'm'),
            (self.dot_all, 's'),
            (self.unicode, 'u'),
            (self.sticky, 'y'),
        ] {
            if set {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// Result of a successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Whole-match range followed by one entry per capture group
    groups: SmallVec<[Option<Range<usize>>; 4]>,
}

impl MatchResult {
    pub fn start(&self) -> usize {
        self.range().start
    }

    pub fn end(&self) -> usize {
        self.range().end
    }

    /// Range of the whole match
    pub fn range(&self) -> Range<usize> {
        self.groups
            .first()
            .cloned()
            .flatten()
            .unwrap_or(0..0)
    }

    /// Number of capture groups, excluding the whole match
    pub fn capture_count(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    /// Range of group `i` (0 is the whole match), `None` when it did not participate
    pub fn group(&self, i: usize) -> Option<Range<usize>> {
        self.groups.get(i).cloned().flatten()
    }

    /// Text of group `i` within `subject`
    pub fn group_str<'s>(&self, subject: &'s str, i: usize) -> Option<&'s str> {
        self.group(i).and_then(|r| subject.get(r))
    }
}

/// An immutable compiled matcher handle
#[derive(Debug)]
pub struct CompiledPattern {
    source: String,
    flags: PatternFlags,
    regex: Regex,
}

impl CompiledPattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    /// Run the matcher from byte offset `start`
    ///
    /// With the sticky flag the match must begin exactly at `start`. A start
    /// past the end of the subject, or inside a UTF-8 sequence, never matches.
    pub fn execute(&self, subject: &str, start: usize) -> Option<MatchResult> {
        if start > subject.len() || !subject.is_char_boundary(start) {
            return None;
        }
        let captures = self.regex.captures_at(subject, start)?;
        let whole = captures.get(0)?;
        if self.flags.sticky && whole.start() != start {
            return None;
        }
        let groups = captures
            .iter()
            .map(|m| m.map(|m| m.start()..m.end()))
            .collect();
        Some(MatchResult { groups })
    }
}

/// The pattern compilation interface consumed by the node tree
pub trait PatternEngine: Send + Sync {
    /// Compile `pattern` with `flags`, validating both eagerly
    fn compile(&self, pattern: &str, flags: &str) -> JsResult<Arc<CompiledPattern>>;

    /// Compile from loosely-typed call arguments: `(pattern)` or `(pattern, flags)`
    fn compile_from_args(&self, args: &[Value]) -> JsResult<Arc<CompiledPattern>> {
        if !(args.len() == 1 || args.len() == 2) {
            return Err(JsError::Arity {
                expected: 2,
                actual: args.len(),
            });
        }
        let pattern = match &args[0] {
            Value::String(s) => s.clone(),
            other => {
                return Err(JsError::UnsupportedType(format!(
                    "pattern must be a string, got {}",
                    other.type_name()
                )))
            }
        };
        let flags = match args.get(1) {
            None => Arc::from(""),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(JsError::UnsupportedType(format!(
                    "flags must be a string, got {}",
                    other.type_name()
                )))
            }
        };
        self.compile(&pattern, &flags)
    }
}

/// Pattern engine backed by the `regex` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexPatternEngine;

impl PatternEngine for RegexPatternEngine {
    fn compile(&self, pattern: &str, flags: &str) -> JsResult<Arc<CompiledPattern>> {
        let syntax_error = |message: String| JsError::PatternSyntax {
            pattern: pattern.to_string(),
            message,
        };
        let parsed = PatternFlags::parse(flags).map_err(syntax_error)?;
        let translated = if parsed.unicode {
            Cow::Borrowed(pattern)
        } else {
            ascii_class_escapes(pattern)
        };
        let regex = RegexBuilder::new(&translated)
            .case_insensitive(parsed.ignore_case)
            .multi_line(parsed.multiline)
            .dot_matches_new_line(parsed.dot_all)
            .build()
            .map_err(|e| syntax_error(e.to_string()))?;
        debug!(target: "spectree::pattern", pattern, flags = %parsed, "compiled pattern");
        Ok(Arc::new(CompiledPattern {
            source: pattern.to_string(),
            flags: parsed,
            regex,
        }))
    }
}

/// Rewrite `\d \D \w \W \b \B` to their ASCII-only forms
///
/// Without the `u` flag these escapes only cover ASCII digits and word
/// characters, while the `regex` crate reads them as Unicode classes. Inside a
/// bracket class only the class escapes are rewritten.
fn ascii_class_escapes(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains('\\') {
        return Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push(c);
                    break;
                };
                let rewritten = match (next, in_class) {
                    ('d', false) => "[0-9]",
                    ('D', false) => "[^0-9]",
                    ('w', false) => "[0-9A-Za-z_]",
                    ('W', false) => "[^0-9A-Za-z_]",
                    ('b', false) => r"(?-u:\b)",
                    ('B', false) => r"(?-u:\B)",
                    ('d', true) => "0-9",
                    ('D', true) => "[^0-9]",
                    ('w', true) => "0-9A-Za-z_",
                    ('W', true) => "[^0-9A-Za-z_]",
                    _ => {
                        out.push(c);
                        out.push(next);
                        continue;
                    }
                };
                out.push_str(rewritten);
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Memoizes compiled handles of another engine in an LRU cache
///
/// Failed compilations are not cached, so every call with a bad pattern
/// reports its syntax error again.
pub struct CachingPatternEngine<E = RegexPatternEngine> {
    inner: E,
    cache: Mutex<LruCache<(String, String), Arc<CompiledPattern>>>,
}

impl<E: PatternEngine> CachingPatternEngine<E> {
    /// Create a cache holding at most `capacity` patterns (minimum 1)
    pub fn new(inner: E, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        CachingPatternEngine {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached handles
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl<E: PatternEngine> PatternEngine for CachingPatternEngine<E> {
    fn compile(&self, pattern: &str, flags: &str) -> JsResult<Arc<CompiledPattern>> {
        let key = (pattern.to_string(), flags.to_string());
        if let Some(hit) = self.cache.lock().get(&key) {
            trace!(target: "spectree::pattern", pattern, flags, "pattern cache hit");
            return Ok(Arc::clone(hit));
        }
        // Compile outside the lock; a concurrent miss on the same key just
        // overwrites with an equivalent handle.
        let compiled = self.inner.compile(pattern, flags)?;
        self.cache.lock().put(key, Arc::clone(&compiled));
        Ok(compiled)
    }
}

impl<E> fmt::Debug for CachingPatternEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingPatternEngine")
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}
