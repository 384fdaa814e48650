//! FQDN glob matching and the query-shape regexes used by lookup
//! classification.

use regex::Regex;

/// Tests a candidate name against a Fortinet wildcard-FQDN pattern. Each `*`
/// matches a run of non-dot characters, so `*.example.com` admits
/// `www.example.com` and `.example.com` but not `example.com` or
/// `a.b.example.com`.
pub fn fqdn_pattern_matches(pattern: &str, name: &str) -> bool {
    let mut translated = String::from("^");
    for c in pattern.chars() {
        if c == '*' {
            translated.push_str("[^.]*");
        } else {
            translated.push_str(&regex::escape(&c.to_string()));
        }
    }
    translated.push('$');
    match Regex::new(&translated) {
        Ok(re) => re.is_match(name),
        Err(_) => false,
    }
}

/// Loose hostname shape used to classify bare lookup-list entries. Leading
/// and trailing dots are tolerated because wildcard patterns produce them.
pub fn is_hostname(name: &str) -> bool {
    Regex::new(r"^\.?([0-9A-Za-z_*-]+\.)*[0-9A-Za-z_*-]+\.?$")
        .unwrap()
        .is_match(name)
}

/// Dotted-quad shape with an optional prefix, before octet validation.
pub fn is_ipv4_literal(value: &str) -> bool {
    Regex::new(r"^\d+\.\d+\.\d+\.\d+(/\d+)?$")
        .unwrap()
        .is_match(value)
}
