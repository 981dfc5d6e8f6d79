//! Helpers for rendering pandas source text: Python literals, identifier
//! sanitization, and dataframe-name deduplication.

use std::sync::OnceLock;

use regex::Regex;

/// Renders a string as a single-quoted Python literal.
pub fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Renders a file path as a raw Python string literal, the way generated
/// read_csv calls reference files.
pub fn py_raw_str(value: &str) -> String {
    // Raw strings cannot escape quotes; fall back to a normal literal when
    // the path itself contains one.
    if value.contains('\'') {
        py_str(value)
    } else {
        format!("r'{}'", value)
    }
}

pub fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Renders `['a', 'b', ...]`.
pub fn py_str_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| py_str(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Renders `{'old': 'new', ...}` preserving the pair order.
pub fn py_str_dict(pairs: &[(String, String)]) -> String {
    let items: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}: {}", py_str(k), py_str(v)))
        .collect();
    format!("{{{}}}", items.join(", "))
}

fn invalid_identifier_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static regex"))
}

/// Turns an arbitrary string into a valid Python identifier usable as a
/// dataframe variable name.
pub fn make_valid_df_name(base: &str) -> String {
    let cleaned = invalid_identifier_chars().replace_all(base, "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        return "df".to_string();
    }
    if cleaned.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("df_{}", cleaned)
    } else {
        cleaned.to_string()
    }
}

/// First name not already taken: `base`, then `base_1`, `base_2`, ...
pub fn first_unused_df_name(existing: &[String], base: &str) -> String {
    if !existing.iter().any(|n| n == base) {
        return base.to_string();
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if !existing.iter().any(|n| n == &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Valid, deduplicated dataframe names for a batch of imported files. The
/// file extension is dropped before sanitizing, and names earlier in the
/// batch claim their spot before later ones are chosen.
pub fn valid_df_names_for_files(existing: &[String], file_basenames: &[String]) -> Vec<String> {
    let mut taken: Vec<String> = existing.to_vec();
    let mut names = Vec::with_capacity(file_basenames.len());
    for base in file_basenames {
        let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);
        let name = first_unused_df_name(&taken, &make_valid_df_name(stem));
        taken.push(name.clone());
        names.push(name);
    }
    names
}
