//! Name sanitizer.
//!
//! Turns raw document identifiers into deterministic, keyword-safe,
//! collision-free names. Allocation happens inside a [`NameScope`]; a
//! collision is resolved by the order names are requested in, never by
//! hash iteration order.

use std::collections::HashSet;
use std::sync::LazyLock;

use clientgen_ir::DiagnosticCode;
use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::config::{KeywordSet, NamingConfig};
use crate::diagnostics::Diagnostics;

/// Rust strict, reserved and weak keywords.
static RUST_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
        "final", "gen", "macro", "override", "priv", "try", "typeof", "unsized", "virtual",
        "yield", "union",
    ]
    .into_iter()
    .collect()
});

static PYTHON_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

static TYPESCRIPT_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
        "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
        "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
        "true", "try", "typeof", "var", "void", "while", "with", "yield", "let", "static",
        "implements", "interface", "package", "private", "protected", "public", "await", "async",
    ]
    .into_iter()
    .collect()
});

/// Target case convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// `lower_snake`, for callables, fields and parameters.
    Snake,
    /// `UpperCamel`, for models and enum members.
    UpperCamel,
}

/// Identifiers a sanitized name must not equal.
#[derive(Debug, Clone)]
pub struct ReservedWords {
    sets: Vec<KeywordSet>,
    extra: HashSet<String>,
}

impl ReservedWords {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            sets: config.keywords.clone(),
            extra: config.extra_reserved.iter().cloned().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extra.contains(name)
            || self.sets.iter().any(|set| match set {
                KeywordSet::Rust => RUST_KEYWORDS.contains(name),
                KeywordSet::Python => PYTHON_KEYWORDS.contains(name),
                KeywordSet::Typescript => TYPESCRIPT_KEYWORDS.contains(name),
            })
    }
}

impl Default for ReservedWords {
    fn default() -> Self {
        Self::new(&NamingConfig::default())
    }
}

/// Sanitize one identifier without collision handling.
///
/// 1. characters outside `[A-Za-z0-9_]` become word breaks
/// 2. the words are re-cased
/// 3. a leading digit gets a `_` prefix, an empty result a placeholder
/// 4. a reserved word gets a trailing `_`
pub fn sanitize(raw: &str, case: Case, reserved: &ReservedWords) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    let mut name = match case {
        Case::Snake => spaced.to_snake_case(),
        Case::UpperCamel => spaced.to_upper_camel_case(),
    };

    if name.is_empty() {
        name = match case {
            Case::Snake => "unnamed".to_string(),
            Case::UpperCamel => "Unnamed".to_string(),
        };
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }

    if reserved.contains(&name) {
        name.push('_');
    }

    name
}

/// One collision namespace.
#[derive(Debug, Clone)]
pub struct NameScope {
    case: Case,
    taken: HashSet<String>,
}

impl NameScope {
    pub fn new(case: Case) -> Self {
        Self {
            case,
            taken: HashSet::new(),
        }
    }

    /// Allocate a unique name for `raw`.
    ///
    /// The first request for a sanitized form gets it unchanged; later ones
    /// get the lowest free numeric suffix starting at 2. Returns the name
    /// and whether a suffix was needed.
    pub fn allocate(&mut self, raw: &str, reserved: &ReservedWords) -> (String, bool) {
        let base = sanitize(raw, self.case, reserved);
        if self.taken.insert(base.clone()) {
            return (base, false);
        }

        let mut n = 2usize;
        loop {
            let candidate = match self.case {
                Case::Snake => format!("{base}_{n}"),
                Case::UpperCamel => format!("{base}{n}"),
            };
            if self.taken.insert(candidate.clone()) {
                return (candidate, true);
            }
            n += 1;
        }
    }
}

/// Name allocation with collision reporting.
#[derive(Debug, Clone, Default)]
pub struct Namer {
    reserved: ReservedWords,
}

impl Namer {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            reserved: ReservedWords::new(config),
        }
    }

    /// Allocate `raw` in `scope`, recording a `NameCollision` warning at
    /// `location` when a suffix was needed.
    pub fn allocate(
        &self,
        scope: &mut NameScope,
        raw: &str,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let (name, collided) = scope.allocate(raw, &self.reserved);
        if collided {
            diagnostics.warning(
                DiagnosticCode::NameCollision,
                location,
                format!("`{raw}` collides with an existing name; renamed to `{name}`"),
            );
        }
        name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn snake(raw: &str) -> String {
        sanitize(raw, Case::Snake, &ReservedWords::default())
    }

    fn camel(raw: &str) -> String {
        sanitize(raw, Case::UpperCamel, &ReservedWords::default())
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(snake("getUserById"), "get_user_by_id");
        assert_eq!(snake("list-pets"), "list_pets");
        assert_eq!(snake("X-Request-ID"), "x_request_id");
        assert_eq!(camel("pet_owner"), "PetOwner");
        assert_eq!(camel("user"), "User");
        assert_eq!(camel("User"), "User");
    }

    #[test]
    fn test_strips_non_identifier_characters() {
        assert_eq!(snake("user.name"), "user_name");
        assert_eq!(camel("Foo$Bar"), "FooBar");
        assert_eq!(snake("@odata.type"), "odata_type");
    }

    #[test]
    fn test_leading_digit_and_empty() {
        assert_eq!(snake("2fa"), "_2fa");
        assert_eq!(camel("404"), "_404");
        assert_eq!(snake("!!!"), "unnamed");
        assert_eq!(camel(""), "Unnamed");
    }

    #[test]
    fn test_reserved_words_get_trailing_underscore() {
        assert_eq!(snake("type"), "type_");
        assert_eq!(snake("class"), "class_");
        assert_eq!(snake("default"), "default_");
        assert_eq!(camel("none"), "None_");
        assert_eq!(camel("self"), "Self_");
    }

    #[test]
    fn test_keyword_sets_are_configurable() {
        let config = NamingConfig {
            keywords: vec![KeywordSet::Python],
            extra_reserved: vec!["client".into()],
        };
        let reserved = ReservedWords::new(&config);
        assert_eq!(sanitize("type", Case::Snake, &reserved), "type");
        assert_eq!(sanitize("lambda", Case::Snake, &reserved), "lambda_");
        assert_eq!(sanitize("Client", Case::Snake, &reserved), "client_");
    }

    #[test]
    fn test_collisions_get_numeric_suffixes_in_request_order() {
        let reserved = ReservedWords::default();
        let mut models = NameScope::new(Case::UpperCamel);
        assert_eq!(models.allocate("user", &reserved), ("User".to_string(), false));
        assert_eq!(models.allocate("User", &reserved), ("User2".to_string(), true));
        assert_eq!(models.allocate("USER ", &reserved).0, "User3");

        let mut callables = NameScope::new(Case::Snake);
        assert_eq!(callables.allocate("getUser", &reserved).0, "get_user");
        assert_eq!(callables.allocate("get_user", &reserved).0, "get_user_2");
    }

    #[test]
    fn test_suffix_skips_taken_candidates() {
        let reserved = ReservedWords::default();
        let mut scope = NameScope::new(Case::UpperCamel);
        scope.allocate("Pet2", &reserved);
        scope.allocate("Pet", &reserved);
        assert_eq!(scope.allocate("pet", &reserved).0, "Pet3");
    }

    #[test]
    fn test_namer_reports_collisions() {
        let namer = Namer::default();
        let mut scope = NameScope::new(Case::UpperCamel);
        let mut diagnostics = Diagnostics::new();
        namer.allocate(&mut scope, "user", "#/components/schemas/user", &mut diagnostics);
        assert!(diagnostics.is_empty());
        let name = namer.allocate(
            &mut scope,
            "User",
            "#/components/schemas/User",
            &mut diagnostics,
        );
        assert_eq!(name, "User2");
        let items = diagnostics.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, DiagnosticCode::NameCollision);
        assert_eq!(items[0].location, "#/components/schemas/User");
    }
}
