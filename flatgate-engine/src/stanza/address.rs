use crate::stanza::{joined, value, StanzaHandler};
use crate::store::{Domain, TokenSet};
use flatgate_net::{
    expand_ipv6, mask_to_prefix, parse_ipv4, parse_ipv6, ipv6_to_u128, UNDEFINED,
};

/// `config firewall address` — IPv4 address objects.
#[derive(Default)]
struct Address4 {
    name: String,
    addr_type: String,
    subnet_addr: String,
    subnet_mask: String,
    start_ip: String,
    end_ip: String,
    wildcard_addr: String,
    wildcard_mask: String,
    fqdn: String,
    wildcard_fqdn: String,
    country: String,
    comment: String,
}

#[derive(Default)]
pub struct Address4Handler {
    current: Option<Address4>,
}

impl StanzaHandler for Address4Handler {
    fn begin(&mut self, name: &str) {
        let mut rec = Address4::default();
        rec.name = name.to_string();
        self.current = Some(rec);
    }

    fn set(&mut self, tokens: &[String]) {
        let rec = match self.current.as_mut() {
            Some(rec) => rec,
            None => return,
        };
        let key = match tokens.get(1) {
            Some(key) => key.as_str(),
            None => return,
        };
        match key {
            "type" => rec.addr_type = value(tokens),
            "subnet" => {
                rec.subnet_addr = value(tokens);
                rec.subnet_mask = tokens.get(3).cloned().unwrap_or_default();
            }
            "start-ip" => rec.start_ip = value(tokens),
            "end-ip" => rec.end_ip = value(tokens),
            "wildcard" => {
                rec.wildcard_addr = value(tokens);
                rec.wildcard_mask = tokens.get(3).cloned().unwrap_or_default();
            }
            "fqdn" => rec.fqdn = value(tokens),
            "wildcard-fqdn" => rec.wildcard_fqdn = value(tokens),
            "country" => rec.country = value(tokens),
            "comment" => rec.comment = joined(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let mut set = TokenSet::default();
            set.comment = rec.comment.clone();
            set.push_unique(normalize_address4(&rec));
            domain.addr4.insert(&rec.name, set);
        }
    }
}

fn or_zero(addr: &str) -> &str {
    if addr.is_empty() {
        "0.0.0.0"
    } else {
        addr
    }
}

fn normalize_address4(rec: &Address4) -> String {
    let addr_type = if rec.addr_type.is_empty() {
        "ipmask"
    } else {
        rec.addr_type.as_str()
    };
    match addr_type {
        "ipmask" => {
            // `set subnet` accepts both `A M` and `A/p`.
            if rec.subnet_addr.contains('/') {
                let mut parts = rec.subnet_addr.splitn(2, '/');
                let addr = parts.next().unwrap_or_default();
                let prefix = parts.next().unwrap_or_default();
                match (parse_ipv4(addr), prefix.parse::<u8>()) {
                    (Some(_), Ok(prefix)) if prefix <= 32 => format!("{}/{}", addr, prefix),
                    _ => UNDEFINED.to_string(),
                }
            } else {
                let addr = or_zero(&rec.subnet_addr);
                let mask = or_zero(&rec.subnet_mask);
                match (parse_ipv4(addr), parse_ipv4(mask)) {
                    (Some(_), Some(mask)) => format!("{}/{}", addr, mask_to_prefix(mask)),
                    _ => UNDEFINED.to_string(),
                }
            }
        }
        "iprange" => {
            let start = or_zero(&rec.start_ip);
            let end = or_zero(&rec.end_ip);
            match (parse_ipv4(start), parse_ipv4(end)) {
                (Some(s), Some(e)) if s <= e => format!("{}-{}", start, end),
                (Some(_), Some(_)) => format!("{}-{}", end, start),
                _ => UNDEFINED.to_string(),
            }
        }
        "wildcard" => {
            let addr = or_zero(&rec.wildcard_addr);
            let mask = or_zero(&rec.wildcard_mask);
            match (parse_ipv4(addr), parse_ipv4(mask)) {
                (Some(_), Some(_)) => format!("{}/{}", addr, mask),
                _ => UNDEFINED.to_string(),
            }
        }
        "fqdn" => format!("fqdn:{}", rec.fqdn),
        "wildcard-fqdn" => {
            let pattern = if rec.wildcard_fqdn.is_empty() {
                &rec.fqdn
            } else {
                &rec.wildcard_fqdn
            };
            format!("fqdn:{}", pattern)
        }
        "geography" => format!("geo:{}", rec.country),
        _ => UNDEFINED.to_string(),
    }
}

/// `config firewall address6` — IPv6 address objects.
#[derive(Default)]
struct Address6 {
    name: String,
    addr_type: String,
    ip6: String,
    start_ip: String,
    end_ip: String,
    fqdn: String,
    comment: String,
}

#[derive(Default)]
pub struct Address6Handler {
    current: Option<Address6>,
}

impl StanzaHandler for Address6Handler {
    fn begin(&mut self, name: &str) {
        let mut rec = Address6::default();
        rec.name = name.to_string();
        self.current = Some(rec);
    }

    fn set(&mut self, tokens: &[String]) {
        let rec = match self.current.as_mut() {
            Some(rec) => rec,
            None => return,
        };
        let key = match tokens.get(1) {
            Some(key) => key.as_str(),
            None => return,
        };
        match key {
            "type" => rec.addr_type = value(tokens),
            "ip6" => rec.ip6 = value(tokens),
            "start-ip" => rec.start_ip = value(tokens),
            "end-ip" => rec.end_ip = value(tokens),
            "fqdn" => rec.fqdn = value(tokens),
            "comment" => rec.comment = joined(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let mut set = TokenSet::default();
            set.comment = rec.comment.clone();
            set.push_unique(normalize_address6(&rec));
            domain.addr6.insert(&rec.name, set);
        }
    }
}

/// Expands `addr/p`, defaulting a missing prefix to a host. Used by the
/// prefix-typed v6 stanzas.
pub(crate) fn normalize_ipv6_prefix(value: &str) -> String {
    let mut parts = value.splitn(2, '/');
    let addr = parts.next().unwrap_or_default();
    let expanded = match expand_ipv6(addr) {
        Some(expanded) => expanded,
        None => return UNDEFINED.to_string(),
    };
    match parts.next() {
        Some(prefix_part) => match prefix_part.parse::<u8>() {
            Ok(prefix) if prefix <= 128 => format!("{}/{}", expanded, prefix),
            _ => UNDEFINED.to_string(),
        },
        None => format!("{}/128", expanded),
    }
}

fn or_unspecified(addr: &str) -> &str {
    if addr.is_empty() {
        "::"
    } else {
        addr
    }
}

fn normalize_address6(rec: &Address6) -> String {
    let addr_type = if rec.addr_type.is_empty() {
        "ipprefix"
    } else {
        rec.addr_type.as_str()
    };
    match addr_type {
        "ipprefix" => {
            let ip6 = if rec.ip6.is_empty() { "::/0" } else { rec.ip6.as_str() };
            normalize_ipv6_prefix(ip6)
        }
        "iprange" => {
            let start = or_unspecified(&rec.start_ip);
            let end = or_unspecified(&rec.end_ip);
            match (parse_ipv6(start), parse_ipv6(end)) {
                (Some(s), Some(e)) => {
                    let (s, e) = if ipv6_to_u128(&s) <= ipv6_to_u128(&e) {
                        (s, e)
                    } else {
                        (e, s)
                    };
                    format!(
                        "{}-{}",
                        flatgate_net::format_ipv6(&s),
                        flatgate_net::format_ipv6(&e)
                    )
                }
                _ => UNDEFINED.to_string(),
            }
        }
        "fqdn" => format!("fqdn:{}", rec.fqdn),
        _ => UNDEFINED.to_string(),
    }
}
