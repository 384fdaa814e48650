//! Policy expansion: turns one accumulated policy record into normalized
//! rows, one per element of the Cartesian product of its interface, address,
//! and service lists. Multicast policies carry their protocol inline, so
//! their product runs over the four interface/address lists only.

use crate::row::PolicyRow;
use crate::store::{Domain, ProtocolClass, TypeMode};

/// One policy as accumulated from its `edit` block, before expansion.
#[derive(Debug, Default)]
pub struct PolicyRecord {
    pub id: String,
    pub name: String,
    pub srcintf: Vec<String>,
    pub dstintf: Vec<String>,
    pub srcaddr: Vec<String>,
    pub dstaddr: Vec<String>,
    pub service: Vec<String>,
    pub action: String,
    pub status: String,
    pub schedule: String,
    pub comments: String,
    pub srcaddr_negate: String,
    pub dstaddr_negate: String,
    pub service_negate: String,
    pub protocol: String,
    pub start_port: String,
    pub end_port: String,
}

// Every list iterates at least one element so the row-count law holds even
// for records the config left unset.
fn one_or(values: &[String]) -> Vec<String> {
    if values.is_empty() {
        vec![String::new()]
    } else {
        values.to_vec()
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn negate_column(value: &str) -> String {
    if value == "enable" {
        "true".to_string()
    } else {
        "false".to_string()
    }
}

struct ServiceColumns {
    prot: String,
    sport: String,
    dport: String,
    sdaddr: String,
    itpcd: String,
}

// Column fill for one named service of a non-multicast policy. The service
// name itself lands in the columns its protocol classes call for; service
// flattening later replaces it with per-leaf tokens.
fn service_columns(name: &str, domain: &Domain) -> ServiceColumns {
    match domain.service(name) {
        Some(entry) => {
            let itpcd = if entry
                .class
                .intersects(ProtocolClass::ICMP.merge(ProtocolClass::UNSUPPORTED))
            {
                name.to_string()
            } else {
                "-/-".to_string()
            };
            let (sport, dport, sdaddr) = if entry
                .class
                .intersects(ProtocolClass::PORTED.merge(ProtocolClass::UNSUPPORTED))
            {
                (name.to_string(), name.to_string(), name.to_string())
            } else {
                ("-/-".to_string(), "-/-".to_string(), "-".to_string())
            };
            ServiceColumns {
                prot: name.to_string(),
                sport,
                dport,
                sdaddr,
                itpcd,
            }
        }
        // Unknown services pass through verbatim.
        None => ServiceColumns {
            prot: name.to_string(),
            sport: name.to_string(),
            dport: name.to_string(),
            sdaddr: name.to_string(),
            itpcd: name.to_string(),
        },
    }
}

// Column fill from the literal protocol number of a multicast policy.
fn multicast_columns(rec: &PolicyRecord) -> ServiceColumns {
    let protocol = rec.protocol.as_str();
    let placeholder = |prot: &str| ServiceColumns {
        prot: prot.to_string(),
        sport: "-/-".to_string(),
        dport: "-/-".to_string(),
        sdaddr: "-".to_string(),
        itpcd: "-/-".to_string(),
    };
    match protocol {
        "" | "0" => placeholder("ip"),
        "1" | "58" => ServiceColumns {
            itpcd: "any/any".to_string(),
            ..placeholder(protocol)
        },
        "6" | "17" | "132" => {
            let dport = if rec.start_port.is_empty() {
                "eq/any".to_string()
            } else if rec.end_port.is_empty() {
                format!("eq/{}", rec.start_port)
            } else {
                format!("range/{}-{}", rec.start_port, rec.end_port)
            };
            ServiceColumns {
                prot: protocol.to_string(),
                sport: "eq/any".to_string(),
                dport,
                sdaddr: "0/0".to_string(),
                itpcd: "-/-".to_string(),
            }
        }
        p if p.chars().all(|c| c.is_ascii_digit()) => placeholder(p),
        unknown => ServiceColumns {
            prot: unknown.to_string(),
            sport: unknown.to_string(),
            dport: unknown.to_string(),
            sdaddr: "-".to_string(),
            itpcd: unknown.to_string(),
        },
    }
}

/// Expands one policy into its normalized rows. `line` is the 1-based order
/// of the policy within its type-mode list.
pub fn expand_policy(
    rec: &PolicyRecord,
    mode: TypeMode,
    line: usize,
    domain: &Domain,
) -> Vec<PolicyRow> {
    if mode.is_multicast() {
        expand_multicast(rec, mode, line, domain)
    } else {
        expand_unicast(rec, mode, line, domain)
    }
}

fn expand_unicast(
    rec: &PolicyRecord,
    mode: TypeMode,
    line: usize,
    domain: &Domain,
) -> Vec<PolicyRow> {
    let negates_supported = mode == TypeMode::V4ToV4 || mode == TypeMode::V6ToV6;
    let polname = if negates_supported {
        or_default(&rec.name, "-")
    } else {
        "-".to_string()
    };
    let (saneg, daneg, svneg) = if negates_supported {
        (
            negate_column(&rec.srcaddr_negate),
            negate_column(&rec.dstaddr_negate),
            negate_column(&rec.service_negate),
        )
    } else {
        ("-".to_string(), "-".to_string(), "-".to_string())
    };
    let action = or_default(&rec.action, "deny");
    let status = or_default(&rec.status, "enable");

    let mut rows = Vec::new();
    for sintf in one_or(&rec.srcintf) {
        for dintf in one_or(&rec.dstintf) {
            for saddr in one_or(&rec.srcaddr) {
                for daddr in one_or(&rec.dstaddr) {
                    for service in one_or(&rec.service) {
                        let columns = service_columns(&service, domain);
                        rows.push(PolicyRow {
                            dom: domain.name.clone(),
                            sintf: sintf.clone(),
                            dintf: dintf.clone(),
                            poltype: mode,
                            polid: rec.id.clone(),
                            polname: polname.clone(),
                            polline: line,
                            action: action.clone(),
                            prot: columns.prot,
                            saddr: saddr.clone(),
                            sport: columns.sport,
                            daddr: daddr.clone(),
                            dport: columns.dport,
                            sdaddr: columns.sdaddr,
                            itpcd: columns.itpcd,
                            saneg: saneg.clone(),
                            daneg: daneg.clone(),
                            svneg: svneg.clone(),
                            status: status.clone(),
                            log: "-".to_string(),
                            schedule: rec.schedule.clone(),
                            comment: rec.comments.clone(),
                        });
                    }
                }
            }
        }
    }
    rows
}

fn expand_multicast(
    rec: &PolicyRecord,
    mode: TypeMode,
    line: usize,
    domain: &Domain,
) -> Vec<PolicyRow> {
    let action = or_default(&rec.action, "accept");
    let status = or_default(&rec.status, "enable");
    let columns = multicast_columns(rec);

    let mut rows = Vec::new();
    for sintf in one_or(&rec.srcintf) {
        for dintf in one_or(&rec.dstintf) {
            for saddr in one_or(&rec.srcaddr) {
                for daddr in one_or(&rec.dstaddr) {
                    rows.push(PolicyRow {
                        dom: domain.name.clone(),
                        sintf: sintf.clone(),
                        dintf: dintf.clone(),
                        poltype: mode,
                        polid: rec.id.clone(),
                        polname: "-".to_string(),
                        polline: line,
                        action: action.clone(),
                        prot: columns.prot.clone(),
                        saddr: saddr.clone(),
                        sport: columns.sport.clone(),
                        daddr: daddr.clone(),
                        dport: columns.dport.clone(),
                        sdaddr: columns.sdaddr.clone(),
                        itpcd: columns.itpcd.clone(),
                        saneg: "-".to_string(),
                        daneg: "-".to_string(),
                        svneg: "-".to_string(),
                        status: status.clone(),
                        log: "-".to_string(),
                        schedule: "-".to_string(),
                        comment: rec.comments.clone(),
                    });
                }
            }
        }
    }
    rows
}
