//! Containment lookup over flattened rows. Each lookup-list line is
//! classified, matched row by row with negation and service-destination
//! narrowing, and emitted twice: once unfiltered, once with everything that
//! follows a scope-matching catch-all deny suppressed.

use crate::row::PolicyRow;
use crate::store::TypeMode;
use flatgate_net::{
    format_ipv6, fqdn_pattern_matches, ipv4_in_cidr, ipv4_in_range, ipv4_in_wildcard,
    ipv6_in_cidr, ipv6_in_range, is_hostname, is_ipv4_literal, parse_ipv4_cidr, parse_ipv6,
    Token, ALL_V4, ALL_V6,
};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, Default)]
pub struct LookupOptions {
    /// Whether an FQDN/geography stored value counts as matching an IP query
    /// (and vice versa) instead of being ignored.
    pub fqdn_geo_match_all: bool,
}

/// One classified lookup address. `display` is the form echoed into the
/// synthetic first column of every result row.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryAddr {
    V4 {
        display: String,
        addr: u32,
        prefix: u8,
    },
    V6 {
        display: String,
        addr: [u16; 8],
        prefix: u8,
    },
    Fqdn {
        display: String,
        pattern: String,
    },
    Geo {
        display: String,
        code: String,
    },
}

impl QueryAddr {
    /// Classifies one lookup-list address, or `None` for anything the
    /// lookup should skip.
    pub fn classify(text: &str) -> Option<QueryAddr> {
        if is_ipv4_literal(text) {
            let display = if text.contains('/') {
                text.to_string()
            } else {
                format!("{}/32", text)
            };
            let (addr, prefix) = parse_ipv4_cidr(&display)?;
            return Some(QueryAddr::V4 {
                display,
                addr,
                prefix,
            });
        }
        // The explicit prefixes contain a colon, so they must be peeled off
        // before the IPv6 shape check.
        if text.starts_with("fqdn:") {
            return Some(QueryAddr::Fqdn {
                display: text.to_string(),
                pattern: text["fqdn:".len()..].to_string(),
            });
        }
        if text.starts_with("geo:") {
            return Some(QueryAddr::Geo {
                display: text.to_string(),
                code: text["geo:".len()..].to_string(),
            });
        }
        if text.contains(':') {
            let mut parts = text.splitn(2, '/');
            let hextets = parse_ipv6(parts.next()?)?;
            return match parts.next() {
                Some(prefix_part) => {
                    let prefix = prefix_part.parse::<u8>().ok().filter(|p| *p <= 128)?;
                    Some(QueryAddr::V6 {
                        display: format!("{}/{}", format_ipv6(&hextets), prefix),
                        addr: hextets,
                        prefix,
                    })
                }
                None => Some(QueryAddr::V6 {
                    display: format_ipv6(&hextets),
                    addr: hextets,
                    prefix: 128,
                }),
            };
        }
        if is_hostname(text) {
            return Some(QueryAddr::Fqdn {
                display: format!("fqdn:{}", text),
                pattern: text.to_string(),
            });
        }
        None
    }

    pub fn display(&self) -> &str {
        match self {
            QueryAddr::V4 { display, .. }
            | QueryAddr::V6 { display, .. }
            | QueryAddr::Fqdn { display, .. }
            | QueryAddr::Geo { display, .. } => display,
        }
    }
}

// The per-stored-value decision. Cross-family comparisons between the
// IP families and FQDN/geography resolve to the match-all flag; tokens that
// are no address at all never match. The negate flag inverts the outcome.
fn value_matches(stored: &str, query: &QueryAddr, negate: bool, match_all: bool) -> bool {
    let token = Token::classify(stored);
    let hit = match query {
        QueryAddr::V4 { addr, prefix, .. } => {
            if *addr == 0 && *prefix == 0 && token.is_v4_shaped() {
                // The family catch-all reaches every stored value of the
                // family.
                true
            } else {
                match &token {
                    Token::CidrV4 {
                        addr: seg_addr,
                        prefix: seg_prefix,
                    } => ipv4_in_cidr(*addr, *prefix, *seg_addr, *seg_prefix),
                    Token::RangeV4 { start, end } => ipv4_in_range(*addr, *prefix, *start, *end),
                    Token::WildcardV4 {
                        addr: wild_addr,
                        mask,
                    } => ipv4_in_wildcard(*addr, *prefix, *wild_addr, *mask),
                    Token::Fqdn(_) | Token::Geo(_) => match_all,
                    token if token.is_v6_shaped() => match_all,
                    _ => false,
                }
            }
        }
        QueryAddr::V6 { addr, prefix, .. } => {
            if *prefix == 0 && addr.iter().all(|h| *h == 0) && token.is_v6_shaped() {
                true
            } else {
                match &token {
                    Token::CidrV6 {
                        addr: seg_addr,
                        prefix: seg_prefix,
                    } => ipv6_in_cidr(addr, *prefix, seg_addr, *seg_prefix),
                    Token::RangeV6 { start, end } => ipv6_in_range(addr, *prefix, start, end),
                    Token::Fqdn(_) | Token::Geo(_) => match_all,
                    token if token.is_v4_shaped() => match_all,
                    _ => false,
                }
            }
        }
        QueryAddr::Fqdn { pattern, .. } => match &token {
            Token::Fqdn(stored_pattern) => fqdn_pattern_matches(stored_pattern, pattern),
            Token::Undefined | Token::Other(_) => false,
            _ => match_all,
        },
        QueryAddr::Geo { code, .. } => match &token {
            Token::Geo(stored_code) => stored_code == code,
            Token::Undefined | Token::Other(_) => false,
            _ => match_all,
        },
    };
    hit != negate
}

fn row_matches(
    row: &PolicyRow,
    src: &Option<QueryAddr>,
    dst: &Option<QueryAddr>,
    options: &LookupOptions,
) -> bool {
    let match_all = options.fqdn_geo_match_all;
    if let Some(query) = src {
        if !value_matches(&row.saddr, query, row.saneg == "true", match_all) {
            return false;
        }
    }
    if let Some(query) = dst {
        if !value_matches(&row.daddr, query, row.daneg == "true", match_all) {
            return false;
        }
        // A service-destination qualifier narrows the destination further.
        if row.sdaddr != "0/0" && row.sdaddr != "-" && !row.sdaddr.is_empty() {
            if !value_matches(&row.sdaddr, query, row.svneg == "true", match_all) {
                return false;
            }
        }
    }
    true
}

// A domain/interface-scoped catch-all IP deny: every later match in the
// same scope is preempted in the user's packet-flow model.
fn is_catch_all_deny(row: &PolicyRow, dst_only: bool) -> bool {
    if row.action != "deny" || row.status != "enable" || row.prot != "ip" {
        return false;
    }
    if dst_only {
        match row.poltype {
            TypeMode::V4ToV4 => row.daddr == ALL_V4,
            TypeMode::V4ToV6 | TypeMode::V6ToV6 => row.daddr == ALL_V6,
            _ => false,
        }
    } else {
        match row.poltype {
            TypeMode::V4ToV4 => row.saddr == ALL_V4 && row.daddr == ALL_V4,
            TypeMode::V6ToV6 => row.saddr == ALL_V6 && row.daddr == ALL_V6,
            TypeMode::V4ToV6 => row.saddr == ALL_V4 && row.daddr == ALL_V6,
            _ => false,
        }
    }
}

/// Runs every lookup-list line against the flattened rows. Returns the
/// all-matches CSV and the without-ineffectual CSV.
pub fn run_lookup(rows: &[PolicyRow], list: &str, options: &LookupOptions) -> (String, String) {
    let mut all = Vec::new();
    let mut effective = Vec::new();

    for raw_line in list.split(|c| c == '\n' || c == '\r') {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let mut fields = line.splitn(3, ',');
        let src_text = fields.next().unwrap_or("").trim();
        let dst_text = fields.next().unwrap_or("").trim();
        if src_text.is_empty() && dst_text.is_empty() {
            continue;
        }
        let src = match src_text {
            "" => None,
            text => match QueryAddr::classify(text) {
                Some(query) => Some(query),
                None => continue,
            },
        };
        let dst = match dst_text {
            "" => None,
            text => match QueryAddr::classify(text) {
                Some(query) => Some(query),
                None => continue,
            },
        };
        let column = match (&src, &dst) {
            (Some(s), Some(d)) => format!("from_{}_to_{}", s.display(), d.display()),
            (Some(s), None) => format!("from_{}", s.display()),
            (None, Some(d)) => format!("to_{}", d.display()),
            (None, None) => continue,
        };
        let dst_only = src.is_none();

        // Each query line models its own packet flow, so the suppression
        // scopes reset here.
        let mut suppressed: HashSet<(String, TypeMode, String, String)> = HashSet::new();
        for row in rows {
            if !row_matches(row, &src, &dst, options) {
                continue;
            }
            let text = format!("{},{}", column, row);
            all.push(text.clone());
            let key = (
                row.dom.clone(),
                row.poltype,
                row.sintf.clone(),
                row.dintf.clone(),
            );
            if !suppressed.contains(&key) {
                effective.push(text);
                if is_catch_all_deny(row, dst_only) {
                    suppressed.insert(key);
                }
            }
        }
    }
    (all.join("\r\n"), effective.join("\r\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::flatten::flatten_rows;
    use crate::store::Store;

    fn v4(text: &str) -> QueryAddr {
        QueryAddr::classify(text).unwrap()
    }

    #[test]
    fn classifies_query_addresses() {
        assert_eq!(v4("192.168.0.1").display(), "192.168.0.1/32");
        assert_eq!(v4("10.0.0.0/8").display(), "10.0.0.0/8");
        assert_eq!(
            QueryAddr::classify("2001:db8::1").unwrap().display(),
            "2001:0db8:0000:0000:0000:0000:0000:0001"
        );
        assert_eq!(
            QueryAddr::classify("2001:db8::/32").unwrap().display(),
            "2001:0db8:0000:0000:0000:0000:0000:0000/32"
        );
        assert_eq!(
            QueryAddr::classify("www.example.com").unwrap().display(),
            "fqdn:www.example.com"
        );
        assert_eq!(
            QueryAddr::classify("fqdn:*.example.com").unwrap().display(),
            "fqdn:*.example.com"
        );
        assert_eq!(QueryAddr::classify("geo:SE").unwrap().display(), "geo:SE");
        assert_eq!(QueryAddr::classify("192.168.0.999"), None);
        assert_eq!(QueryAddr::classify("10.0.0.0/40"), None);
        assert_eq!(QueryAddr::classify("1::2::3"), None);
        assert_eq!(QueryAddr::classify("not a host"), None);
    }

    #[test]
    fn stored_value_decisions() {
        let q = v4("10.0.0.5");
        assert!(value_matches("10.0.0.0/8", &q, false, false));
        assert!(value_matches("10.0.0.1-10.0.0.9", &q, false, false));
        assert!(!value_matches("192.168.0.0/16", &q, false, false));
        // Negation inverts the outcome.
        assert!(!value_matches("10.0.0.0/8", &q, true, false));
        assert!(value_matches("192.168.0.0/16", &q, true, false));
        // Placeholders and names never match.
        assert!(!value_matches("-", &q, false, false));
        assert!(!value_matches("undefined", &q, false, false));
        assert!(!value_matches("OBJ1", &q, false, false));
        // Cross-family decisions follow the flag.
        assert!(!value_matches("fqdn:example.com", &q, false, false));
        assert!(value_matches("fqdn:example.com", &q, false, true));
        assert!(!value_matches(ALL_V6, &q, false, false));
        assert!(value_matches(ALL_V6, &q, false, true));
    }

    #[test]
    fn family_catch_all_queries_match_every_family_value() {
        let all4 = v4("0.0.0.0/0");
        assert!(value_matches("192.168.0.0/16", &all4, false, false));
        assert!(value_matches("10.0.0.1-10.0.0.9", &all4, false, false));
        assert!(value_matches("192.168.0.0/255.255.0.255", &all4, false, false));
        assert!(!value_matches("fqdn:example.com", &all4, false, false));
        let all6 = QueryAddr::classify("::/0").unwrap();
        assert!(value_matches(
            "2001:0db8:0000:0000:0000:0000:0000:0000/32",
            &all6,
            false,
            false
        ));
        assert!(!value_matches("10.0.0.0/8", &all6, false, false));
    }

    #[test]
    fn fqdn_and_geo_queries() {
        let q = QueryAddr::classify("www.example.com").unwrap();
        assert!(value_matches("fqdn:*.example.com", &q, false, false));
        assert!(!value_matches("fqdn:example.com", &q, false, false));
        assert!(!value_matches("10.0.0.0/8", &q, false, false));
        assert!(value_matches("10.0.0.0/8", &q, false, true));
        let geo = QueryAddr::classify("geo:SE").unwrap();
        assert!(value_matches("geo:SE", &geo, false, false));
        assert!(!value_matches("geo:NO", &geo, false, false));
        assert!(!value_matches("geo:NO", &geo, false, true));
    }

    fn lookup_store() -> Store {
        let config = "\
config firewall address\n\
edit all\nset subnet 0.0.0.0 0.0.0.0\nnext\n\
edit SRV1\nset subnet 10.0.0.5 255.255.255.255\nnext\n\
edit LAN\nset subnet 192.168.1.0 255.255.255.0\nnext\n\
end\n\
config firewall service custom\n\
edit ALL\nset protocol IP\nnext\n\
edit HTTP\nset tcp-portrange 80\nnext\n\
end\n\
config firewall policy\n\
edit 1\nset srcintf any\nset dstintf any\nset srcaddr all\nset dstaddr all\nset service ALL\nset schedule always\nnext\n\
edit 2\nset srcintf any\nset dstintf any\nset srcaddr all\nset dstaddr SRV1\nset action accept\nset service HTTP\nset schedule always\nnext\n\
edit 3\nset srcintf dmz\nset dstintf wan1\nset srcaddr LAN\nset dstaddr SRV1\nset action accept\nset service HTTP\nset schedule always\nnext\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        store
    }

    #[test]
    fn catch_all_deny_suppresses_its_scope_only() {
        let store = lookup_store();
        let rows = flatten_rows(&store, true, true);
        let options = LookupOptions::default();
        let (all, effective) = run_lookup(&rows, "192.168.1.10,10.0.0.5\r\n", &options);
        let all_lines: Vec<&str> = all.split("\r\n").collect();
        // The deny, the shadowed accept on (any, any), and the accept on
        // (dmz, wan1).
        assert_eq!(all_lines.len(), 3);
        assert!(all_lines[0].contains(",deny,ip,"));
        assert!(all_lines[0].starts_with("from_192.168.1.10/32_to_10.0.0.5/32,"));
        let effective_lines: Vec<&str> = effective.split("\r\n").collect();
        assert_eq!(effective_lines.len(), 2);
        assert!(effective_lines[0].contains(",deny,ip,"));
        // Policy 2 is gone; policy 3 survives because its interface pair
        // differs.
        assert!(effective_lines[1].contains(",dmz,wan1,"));
    }

    #[test]
    fn source_only_lookup_keeps_both_views_aligned() {
        let store = lookup_store();
        let rows = flatten_rows(&store, true, true);
        let options = LookupOptions::default();
        let (all, effective) = run_lookup(&rows, "192.168.1.10,\r\n", &options);
        let all_lines: Vec<&str> = all.split("\r\n").collect();
        assert_eq!(all_lines.len(), 3);
        assert!(all_lines[0].starts_with("from_192.168.1.10/32,"));
        // The catch-all deny needs both columns to be the family all, which
        // holds for policy 1, so policy 2 is suppressed here too.
        assert_eq!(effective.split("\r\n").count(), 2);
    }

    #[test]
    fn dst_only_trigger_needs_only_the_destination() {
        let config = "\
config firewall address\n\
edit all\nset subnet 0.0.0.0 0.0.0.0\nnext\n\
edit LAN\nset subnet 192.168.1.0 255.255.255.0\nnext\n\
end\n\
config firewall service custom\n\
edit ALL\nset protocol IP\nnext\n\
end\n\
config firewall policy\n\
edit 1\nset srcintf any\nset dstintf any\nset srcaddr LAN\nset dstaddr all\nset service ALL\nset schedule always\nnext\n\
edit 2\nset srcintf any\nset dstintf any\nset srcaddr LAN\nset dstaddr all\nset action accept\nset service ALL\nset schedule always\nnext\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let rows = flatten_rows(&store, true, true);
        let options = LookupOptions::default();
        // Destination-only: the deny triggers on dstaddr alone.
        let (all, effective) = run_lookup(&rows, ",10.0.0.5\r\n", &options);
        assert_eq!(all.split("\r\n").count(), 2);
        assert_eq!(effective.split("\r\n").count(), 1);
        // From-to: srcaddr is LAN, not the catch-all, so nothing is
        // suppressed.
        let (all, effective) = run_lookup(&rows, "192.168.1.10,10.0.0.5\r\n", &options);
        assert_eq!(all.split("\r\n").count(), 2);
        assert_eq!(effective.split("\r\n").count(), 2);
    }

    #[test]
    fn negated_rows_invert_matches() {
        let config = "\
config firewall address\n\
edit LAN\nset subnet 192.168.1.0 255.255.255.0\nnext\n\
edit all\nset subnet 0.0.0.0 0.0.0.0\nnext\n\
end\n\
config firewall service custom\n\
edit ALL\nset protocol IP\nnext\n\
end\n\
config firewall policy\n\
edit 1\nset srcintf any\nset dstintf any\nset srcaddr LAN\nset srcaddr-negate enable\nset dstaddr all\nset action accept\nset service ALL\nset schedule always\nnext\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let rows = flatten_rows(&store, true, true);
        let options = LookupOptions::default();
        let (all, _) = run_lookup(&rows, "192.168.1.10,\r\n", &options);
        assert!(all.is_empty());
        let (all, _) = run_lookup(&rows, "10.9.9.9,\r\n", &options);
        assert_eq!(all.split("\r\n").count(), 1);
    }

    #[test]
    fn service_destination_narrows_destination_matches() {
        let config = "\
config firewall address\n\
edit all\nset subnet 0.0.0.0 0.0.0.0\nnext\n\
end\n\
config firewall service custom\n\
edit PINNED\nset tcp-portrange 443\nset iprange 10.9.9.9\nnext\n\
end\n\
config firewall policy\n\
edit 1\nset srcintf any\nset dstintf any\nset srcaddr all\nset dstaddr all\nset action accept\nset service PINNED\nset schedule always\nnext\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let rows = flatten_rows(&store, true, true);
        assert_eq!(rows[0].sdaddr, "10.9.9.9/32");
        let options = LookupOptions::default();
        let (all, _) = run_lookup(&rows, ",10.0.0.5\r\n", &options);
        assert!(all.is_empty());
        let (all, _) = run_lookup(&rows, ",10.9.9.9\r\n", &options);
        assert_eq!(all.split("\r\n").count(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let store = lookup_store();
        let rows = flatten_rows(&store, true, true);
        let options = LookupOptions::default();
        let list = "# comment\r\n! note\r\n\r\n192.168.0.999,\r\n,,just a comment field\r\n";
        let (all, effective) = run_lookup(&rows, list, &options);
        assert!(all.is_empty());
        assert!(effective.is_empty());
    }
}
