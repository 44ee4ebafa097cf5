//! The combined tag pattern used while compiling the body of one tag.
//!
//! A single regular expression is composed from the tags valid at a given
//! position: child tags of the enclosing tag (which may omit the `#`
//! sigil), placeholders, comments, the closing markers in effect, every
//! registered tag that is not context sensitive, and a catch-all for
//! anything else that looks like a tag.

use regex::{Captures, Regex};
use tracing::debug;
use crate::TagRegistry;


// quoted strings, numbers, @variables and dotted placeholders
const ARGUMENT: &str = r#"(?:@?\w+(?:\.\w+)*|'[^']*'|"[^"]*"|[-+]?\d*\.?\d+)"#;

const NORMAL: &str = "m";
const EXTENSION: &str = "x";


/// What a tag occurrence turned out to be.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TagMatch<'t> {
    Key {
        key: &'t str,
        alignment: Option<&'t str>,
        format: Option<&'t str>,
    },
    Comment,
    Close(&'t str),
    Open {
        name: &'t str,
        arguments: &'t str,
    },
    Unknown(&'t str),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Found<'t> {
    pub start: usize,
    pub end: usize,
    pub is_extension: bool,
    pub tag: TagMatch<'t>,
}


#[derive(Debug)]
pub(crate) struct TagMatcher {
    regex: Regex,
    children: Vec<String>,
    openings: Vec<String>,
    extension: bool,
}

impl TagMatcher {
    pub(crate) fn build(
        registry: &TagRegistry, children: &[String], closing: &[String], extension: bool
    ) -> Result<Self, regex::Error> {
        let children = children.iter()
            .filter(|name| registry.contains(name))
            .cloned()
            .collect::<Vec<_>>();
        let openings = registry.iter()
            .filter(|tag| !tag.is_context_sensitive() && !children.iter().any(|c| c == tag.name()))
            .map(|tag| tag.name().to_owned())
            .collect::<Vec<_>>();

        let normal = format!(r"\{{\{{(?:{})\}}\}}", alternatives(NORMAL, &children, closing, &openings));
        let pattern = if extension {
            let triple = alternatives(EXTENSION, &children, closing, &openings);
            format!(r"(?P<extension>\{{\{{\{{(?:{})\}}\}}\}})|{}", triple, normal)
        } else {
            normal
        };
        debug!(
            children = children.len(),
            closing = closing.len(),
            openings = openings.len(),
            extension,
            "building tag matcher"
        );
        Ok(TagMatcher {
            regex: Regex::new(&pattern)?,
            children,
            openings,
            extension,
        })
    }

    /// Whether an opening tag with this name may appear here.
    pub(crate) fn allows(&self, name: &str) -> bool {
        self.children.iter().chain(&self.openings).any(|tag| tag == name)
    }

    pub(crate) fn find_at<'t>(&self, text: &'t str, start: usize) -> Option<Found<'t>> {
        let captures = self.regex.captures_at(text, start)?;
        let whole = captures.get(0)?;
        let is_extension = self.extension && captures.name("extension").is_some();
        let prefix = if is_extension { EXTENSION } else { NORMAL };
        Some(Found {
            start: whole.start(),
            end: whole.end(),
            is_extension,
            tag: classify(&captures, prefix)?,
        })
    }
}

fn alternatives(prefix: &str, children: &[String], closing: &[String], openings: &[String]) -> String {
    let mut alternatives = Vec::new();
    if !children.is_empty() {
        alternatives.push(format!(
            r"#?(?P<{p}child>{names})(?P<{p}childargs>(?:\s+{arg})*)\s*",
            p = prefix,
            names = names(children),
            arg = ARGUMENT
        ));
    }
    alternatives.push(format!(
        r"(?P<{p}key>@?\w+(?:\.\w+)*)(?:,(?P<{p}align>[^:}}]*))?(?::(?P<{p}format>(?s:.*?)))?",
        p = prefix
    ));
    alternatives.push(format!(r"(?P<{p}comment>#!(?s:.*?))", p = prefix));
    if !closing.is_empty() {
        alternatives.push(format!(r"/(?P<{p}close>{names})\s*", p = prefix, names = names(closing)));
    }
    if !openings.is_empty() {
        alternatives.push(format!(
            r"#(?P<{p}open>{names})(?P<{p}args>(?:\s+{arg})*)\s*",
            p = prefix,
            names = names(openings),
            arg = ARGUMENT
        ));
    }
    alternatives.push(format!(r"[#/](?P<{p}unknown>[^\s}}]*)(?s:.*?)", p = prefix));
    alternatives.join("|")
}

fn names(names: &[String]) -> String {
    names.iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|")
}

fn classify<'t>(captures: &Captures<'t>, prefix: &str) -> Option<TagMatch<'t>> {
    let group = |name: &str| captures.name(&format!("{}{}", prefix, name));
    let text = |name: &str| group(name).map(|m| m.as_str());

    if let Some(name) = text("child") {
        return Some(TagMatch::Open { name, arguments: text("childargs").unwrap_or("") });
    }
    if let Some(key) = text("key") {
        return Some(TagMatch::Key { key, alignment: text("align"), format: text("format") });
    }
    if group("comment").is_some() {
        return Some(TagMatch::Comment);
    }
    if let Some(name) = text("close") {
        return Some(TagMatch::Close(name));
    }
    if let Some(name) = text("open") {
        return Some(TagMatch::Open { name, arguments: text("args").unwrap_or("") });
    }
    text("unknown").map(TagMatch::Unknown)
}


/// Split the argument text of a tag on whitespace, keeping quoted strings
/// whole.
pub(crate) fn split_arguments(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while let Some(first) = rest.chars().next() {
        let end = if first == '\'' || first == '"' {
            rest[1..].find(first).map_or(rest.len(), |p| p + 2)
        } else {
            rest.find(char::is_whitespace).unwrap_or(rest.len())
        };
        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    tokens
}


#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(children: &[&str], closing: &[&str], extension: bool) -> TagMatcher {
        let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        TagMatcher::build(&TagRegistry::built_in(), &owned(children), &owned(closing), extension).unwrap()
    }

    fn first<'t>(matcher: &TagMatcher, text: &'t str) -> TagMatch<'t> {
        matcher.find_at(text, 0).unwrap().tag
    }

    #[test]
    fn placeholders_with_alignment_and_format() {
        let m = matcher(&[], &[], false);
        assert_eq!(
            first(&m, "total: {{amount,8:F2}}!"),
            TagMatch::Key { key: "amount", alignment: Some("8"), format: Some("F2") }
        );
        assert_eq!(
            first(&m, "{{@index}}"),
            TagMatch::Key { key: "@index", alignment: None, format: None }
        );
        assert_eq!(
            first(&m, "{{a.b.c:#,##0}}"),
            TagMatch::Key { key: "a.b.c", alignment: None, format: Some("#,##0") }
        );
    }

    #[test]
    fn reports_span_of_match() {
        let m = matcher(&[], &[], false);
        let found = m.find_at("ab{{x}}cd{{y}}", 3).unwrap();
        assert_eq!((found.start, found.end), (9, 14));
        assert!(!found.is_extension);
    }

    #[test]
    fn opening_tags_capture_arguments() {
        let m = matcher(&[], &[], false);
        assert_eq!(
            first(&m, "{{#each items}}"),
            TagMatch::Open { name: "each", arguments: " items" }
        );
        assert_eq!(
            first(&m, "{{#if 'a b' }}"),
            TagMatch::Open { name: "if", arguments: " 'a b'" }
        );
    }

    #[test]
    fn comments_may_span_lines() {
        let m = matcher(&[], &[], false);
        let found = m.find_at("{{#! one\ntwo }}after", 0).unwrap();
        assert_eq!(found.tag, TagMatch::Comment);
        assert_eq!(found.end, 15);
    }

    #[test]
    fn child_tags_may_omit_the_sigil() {
        let m = matcher(&["elif", "else"], &["if"], false);
        assert_eq!(first(&m, "{{else}}"), TagMatch::Open { name: "else", arguments: "" });
        assert_eq!(first(&m, "{{#elif x}}"), TagMatch::Open { name: "elif", arguments: " x" });
        assert_eq!(first(&m, "{{/if}}"), TagMatch::Close("if"));
        assert_eq!(
            first(&m, "{{elsewhere}}"),
            TagMatch::Key { key: "elsewhere", alignment: None, format: None }
        );
    }

    #[test]
    fn context_sensitive_tags_are_unknown_elsewhere() {
        let m = matcher(&[], &[], false);
        assert_eq!(first(&m, "{{#else}}"), TagMatch::Unknown("else"));
        assert!(!m.allows("else"));
        assert!(m.allows("if"));
        assert_eq!(
            first(&m, "{{else}}"),
            TagMatch::Key { key: "else", alignment: None, format: None }
        );
    }

    #[test]
    fn unknown_tags_and_stray_closes_are_caught() {
        let m = matcher(&[], &[], false);
        assert_eq!(first(&m, "{{#bogus a}}"), TagMatch::Unknown("bogus"));
        assert_eq!(first(&m, "{{/if}}"), TagMatch::Unknown("if"));
        assert_eq!(first(&m, "{{#if 'open}}"), TagMatch::Unknown("if"));
    }

    #[test]
    fn triple_braces_only_with_extensions() {
        let with = matcher(&[], &[], true);
        let found = with.find_at("{{{html}}}", 0).unwrap();
        assert!(found.is_extension);
        assert_eq!((found.start, found.end), (0, 10));

        let without = matcher(&[], &[], false);
        let found = without.find_at("{{{html}}}", 0).unwrap();
        assert!(!found.is_extension);
        assert_eq!((found.start, found.end), (1, 9));
    }

    #[test]
    fn splits_arguments_respecting_quotes() {
        assert_eq!(split_arguments(" a 'b c'  \"d\" 1.5"), vec!["a", "'b c'", "\"d\"", "1.5"]);
        assert!(split_arguments("  ").is_empty());
    }
}
