//! Mapping of Phel names onto PHP identifiers.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

static REPLACEMENTS: Lazy<FxHashMap<char, &'static str>> = Lazy::new(|| {
    [
        ('-', "_"),
        ('.', "_DOT_"),
        (':', "_COLON_"),
        ('+', "_PLUS_"),
        ('>', "_GT_"),
        ('<', "_LT_"),
        ('=', "_EQ_"),
        ('~', "_TILDE_"),
        ('!', "_BANG_"),
        ('@', "_CIRCA_"),
        ('#', "_SHARP_"),
        ('\'', "_SINGLEQUOTE_"),
        ('"', "_DOUBLEQUOTE_"),
        ('%', "_PERCENT_"),
        ('^', "_CARET_"),
        ('&', "_AMPERSAND_"),
        ('*', "_STAR_"),
        ('|', "_BAR_"),
        ('{', "_LBRACE_"),
        ('}', "_RBRACE_"),
        ('[', "_LBRACK_"),
        (']', "_RBRACK_"),
        ('/', "_SLASH_"),
        ('\\', "_BSLASH_"),
        ('?', "_QMARK_"),
        ('$', "_DOLLAR_"),
    ]
    .into_iter()
    .collect()
});

/// `empty?` => `empty_QMARK_`. `this` is reserved in PHP and becomes
/// `__phel_this`.
pub fn munge(name: &str) -> String {
    if name == "this" {
        return "__phel_this".to_string();
    }
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match REPLACEMENTS.get(&ch) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(ch),
        }
    }
    out
}

/// Munges each backslash-separated segment of a namespace.
pub fn munge_ns(ns: &str) -> String {
    ns.split('\\').map(|segment| segment.replace('-', "_")).collect::<Vec<_>>().join("\\")
}
