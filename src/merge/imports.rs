use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Asset families an import entry can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    CivilizationIcon,
    LeaderIcon,
    UnitIcon,
    ConstructibleIcon,
    Localization,
    Other,
}

/// Merge identity of an import entry: a newer entry of the same class
/// supersedes the older one regardless of its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportClass {
    pub kind: ImportKind,
    pub subject: Option<String>,
}

impl fmt::Display for ImportClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{:?}({subject})", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Id,
    SourcePath,
}

struct ImportRule {
    kind: ImportKind,
    source: Source,
    pattern: Regex,
}

impl ImportRule {
    fn new(kind: ImportKind, source: Source, pattern: &str) -> Self {
        Self {
            kind,
            source,
            pattern: Regex::new(pattern).expect("import rule pattern must compile"),
        }
    }
}

// First match wins; id rules come before path rules.
static RULES: LazyLock<Vec<ImportRule>> = LazyLock::new(|| {
    vec![
        ImportRule::new(
            ImportKind::CivilizationIcon,
            Source::Id,
            r"(?i)^civ(?:ilization)?[_-]?icon",
        ),
        ImportRule::new(ImportKind::LeaderIcon, Source::Id, r"(?i)^leader[_-]?icon"),
        ImportRule::new(
            ImportKind::UnitIcon,
            Source::Id,
            r"(?i)^unit[_-]?icon(?:[_-]+(?P<subject>.+))?$",
        ),
        ImportRule::new(
            ImportKind::ConstructibleIcon,
            Source::Id,
            r"(?i)^(?:constructible|building|improvement|wonder)[_-]?icon(?:[_-]+(?P<subject>.+))?$",
        ),
        ImportRule::new(
            ImportKind::CivilizationIcon,
            Source::SourcePath,
            r"(?i)(?:^|/)icons?/civ(?:ilization)?s?/",
        ),
        ImportRule::new(
            ImportKind::LeaderIcon,
            Source::SourcePath,
            r"(?i)(?:^|/)icons?/leaders?/",
        ),
        ImportRule::new(
            ImportKind::UnitIcon,
            Source::SourcePath,
            r"(?i)(?:^|/)icons?/units?/(?P<subject>[^/]+?)(?:\.[^./]*)?$",
        ),
        ImportRule::new(
            ImportKind::ConstructibleIcon,
            Source::SourcePath,
            r"(?i)(?:^|/)icons?/(?:constructibles?|buildings?|improvements?|wonders?)/(?P<subject>[^/]+?)(?:\.[^./]*)?$",
        ),
        ImportRule::new(
            ImportKind::Localization,
            Source::SourcePath,
            r"(?i)(?:^|/)(?:text|localization|loc)/",
        ),
    ]
});

pub fn classify(entry: &Value) -> ImportClass {
    let id = entry.get("id").and_then(Value::as_str).unwrap_or_default();
    let source_path = entry
        .get("source_path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .replace('\\', "/");

    for rule in RULES.iter() {
        let haystack = match rule.source {
            Source::Id => id,
            Source::SourcePath => source_path.as_str(),
        };
        if haystack.is_empty() {
            continue;
        }
        if let Some(captures) = rule.pattern.captures(haystack) {
            let subject = captures
                .name("subject")
                .map(|m| normalize_subject(m.as_str()))
                .filter(|s| !s.is_empty());
            return ImportClass {
                kind: rule.kind,
                subject,
            };
        }
    }

    let fallback = [id, source_path.as_str()]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| entry.to_string());
    ImportClass {
        kind: ImportKind::Other,
        subject: Some(fallback),
    }
}

fn normalize_subject(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

/// Drops every main entry whose class staging mentions, then appends all
/// staging entries. Returns the merged list and how many entries were
/// superseded.
pub fn merge_imports(main: &[Value], staging: &[Value]) -> (Vec<Value>, usize) {
    let staged: HashSet<ImportClass> = staging.iter().map(classify).collect();
    let mut merged: Vec<Value> = main
        .iter()
        .filter(|entry| !staged.contains(&classify(entry)))
        .cloned()
        .collect();
    let superseded = main.len() - merged.len();
    merged.extend(staging.iter().cloned());
    (merged, superseded)
}
