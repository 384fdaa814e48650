//! Address and service listings: one CSV line per stored value,
//! `<vdom>,<tableTag>,<name>,<value>,<comment>`, tables in a fixed order per
//! domain.

use crate::store::{ObjectTable, Store};

fn push_table_lines(lines: &mut Vec<String>, vdom: &str, tag: &str, table: &ObjectTable) {
    for (name, entry) in table.iter() {
        for value in &entry.values {
            lines.push(format!(
                "{},{},{},{},{}",
                vdom, tag, name, value, entry.comment
            ));
        }
    }
}

/// The IPv4/IPv6 address, multicast-address, and address-group listing.
pub fn address_listing(store: &Store) -> String {
    let mut lines = Vec::new();
    for domain in store.domains() {
        push_table_lines(&mut lines, &domain.name, "address4", &domain.addr4);
        push_table_lines(&mut lines, &domain.name, "multicastaddress4", &domain.mcast4);
        push_table_lines(&mut lines, &domain.name, "addrgrp4", &domain.grp4);
        push_table_lines(&mut lines, &domain.name, "address6", &domain.addr6);
        push_table_lines(&mut lines, &domain.name, "multicastaddress6", &domain.mcast6);
        push_table_lines(&mut lines, &domain.name, "addrgrp6", &domain.grp6);
    }
    lines.join("\r\n")
}

/// The service-custom and service-group listing.
pub fn service_listing(store: &Store) -> String {
    let mut lines = Vec::new();
    for domain in store.domains() {
        push_table_lines(&mut lines, &domain.name, "service_custom", &domain.svc_custom);
        push_table_lines(&mut lines, &domain.name, "service_group", &domain.svc_group);
    }
    lines.join("\r\n")
}
