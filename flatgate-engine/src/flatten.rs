//! The two flattening rewrites: named address columns become leaf tokens,
//! and the named service column becomes per-leaf protocol/port/type-code
//! tokens. Each toggle multiplies rows independently; address expansion runs
//! first.

use crate::row::PolicyRow;
use crate::store::{Domain, ObjectTable, Store, TypeMode};

/// Rewrites every normalized row in the store under the given toggles. With
/// both toggles off this is the normalized view itself.
pub fn flatten_rows(store: &Store, addresses: bool, services: bool) -> Vec<PolicyRow> {
    let mut rows = Vec::new();
    for domain in store.domains() {
        for &mode in TypeMode::ALL.iter() {
            for row in domain.policy_list(mode) {
                let expanded = if addresses {
                    expand_addresses(row, domain)
                } else {
                    vec![row.clone()]
                };
                for row in expanded {
                    if services {
                        rows.extend(expand_service(&row, domain));
                    } else {
                        rows.push(row);
                    }
                }
            }
        }
    }
    rows
}

// A name resolves through the leaf table, then the group table; names known
// to neither pass through as themselves.
fn address_values(name: &str, leaves: &ObjectTable, groups: Option<&ObjectTable>) -> Vec<String> {
    if let Some(entry) = leaves.get(name) {
        return entry.values.clone();
    }
    if let Some(groups) = groups {
        if let Some(entry) = groups.get(name) {
            return entry.values.clone();
        }
    }
    vec![name.to_string()]
}

fn source_values(row: &PolicyRow, domain: &Domain) -> Vec<String> {
    match row.poltype {
        TypeMode::V4ToV4 | TypeMode::V4ToV6 | TypeMode::V4ToV4Multicast => {
            address_values(&row.saddr, &domain.addr4, Some(&domain.grp4))
        }
        TypeMode::V6ToV6 | TypeMode::V6ToV4 | TypeMode::V6ToV6Multicast => {
            address_values(&row.saddr, &domain.addr6, Some(&domain.grp6))
        }
    }
}

fn dest_values(row: &PolicyRow, domain: &Domain) -> Vec<String> {
    match row.poltype {
        TypeMode::V4ToV4 | TypeMode::V6ToV4 => {
            address_values(&row.daddr, &domain.addr4, Some(&domain.grp4))
        }
        TypeMode::V6ToV6 | TypeMode::V4ToV6 => {
            address_values(&row.daddr, &domain.addr6, Some(&domain.grp6))
        }
        TypeMode::V4ToV4Multicast => address_values(&row.daddr, &domain.mcast4, None),
        TypeMode::V6ToV6Multicast => address_values(&row.daddr, &domain.mcast6, None),
    }
}

fn expand_addresses(row: &PolicyRow, domain: &Domain) -> Vec<PolicyRow> {
    let sources = source_values(row, domain);
    let dests = dest_values(row, domain);
    let mut rows = Vec::with_capacity(sources.len() * dests.len());
    for source in &sources {
        for dest in &dests {
            let mut expanded = row.clone();
            expanded.saddr = source.clone();
            expanded.daddr = dest.clone();
            rows.push(expanded);
        }
    }
    rows
}

fn expand_service(row: &PolicyRow, domain: &Domain) -> Vec<PolicyRow> {
    let entry = match domain.service(&row.prot) {
        Some(entry) => entry,
        // Unknown services were passed through at expansion; keep them.
        None => return vec![row.clone()],
    };
    let mut rows = Vec::with_capacity(entry.values.len());
    for value in &entry.values {
        let mut parts = value.splitn(2, ';');
        let lead = parts.next().unwrap_or_default();
        let sda = parts.next().unwrap_or("-");
        let segments: Vec<&str> = lead.split('/').collect();
        let mut expanded = row.clone();
        match segments[0] {
            "6" | "17" | "132" if segments.len() == 5 => {
                expanded.prot = segments[0].to_string();
                expanded.sport = format!("{}/{}", segments[1], segments[2]);
                expanded.dport = format!("{}/{}", segments[3], segments[4]);
                expanded.sdaddr = sda.to_string();
                expanded.itpcd = "-/-".to_string();
            }
            "1" | "58" if segments.len() == 3 => {
                expanded.prot = segments[0].to_string();
                expanded.sport = "-/-".to_string();
                expanded.dport = "-/-".to_string();
                expanded.sdaddr = "-".to_string();
                expanded.itpcd = format!("{}/{}", segments[1], segments[2]);
            }
            _ if segments.len() == 1
                && (lead == "ip" || lead.chars().all(|c| c.is_ascii_digit())) =>
            {
                expanded.prot = lead.to_string();
                expanded.sport = "-/-".to_string();
                expanded.dport = "-/-".to_string();
                expanded.sdaddr = "-".to_string();
                expanded.itpcd = "-/-".to_string();
            }
            _ => {
                // Unsupported protocol tokens pass through whole.
                expanded.prot = lead.to_string();
                expanded.sport = lead.to_string();
                expanded.dport = lead.to_string();
                expanded.sdaddr = sda.to_string();
                expanded.itpcd = lead.to_string();
            }
        }
        rows.push(expanded);
    }
    rows
}
