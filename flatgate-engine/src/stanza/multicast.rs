use crate::stanza::address::normalize_ipv6_prefix;
use crate::stanza::{joined, value, StanzaHandler};
use crate::store::{Domain, TokenSet};
use flatgate_net::{mask_to_prefix, parse_ipv4, UNDEFINED};

/// `config firewall multicast-address` — IPv4 multicast ranges and
/// broadcast subnets.
#[derive(Default)]
struct Multicast4 {
    name: String,
    addr_type: String,
    subnet_addr: String,
    subnet_mask: String,
    start_ip: String,
    end_ip: String,
    comment: String,
}

#[derive(Default)]
pub struct Multicast4Handler {
    current: Option<Multicast4>,
}

impl StanzaHandler for Multicast4Handler {
    fn begin(&mut self, name: &str) {
        let mut rec = Multicast4::default();
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
            "comment" => rec.comment = joined(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let mut set = TokenSet::default();
            set.comment = rec.comment.clone();
            set.push_unique(normalize_multicast4(&rec));
            domain.mcast4.insert(&rec.name, set);
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

fn normalize_multicast4(rec: &Multicast4) -> String {
    let addr_type = if rec.addr_type.is_empty() {
        "multicastrange"
    } else {
        rec.addr_type.as_str()
    };
    match addr_type {
        "broadcastmask" => {
            let addr = or_zero(&rec.subnet_addr);
            let mask = or_zero(&rec.subnet_mask);
            match (parse_ipv4(addr), parse_ipv4(mask)) {
                (Some(_), Some(mask)) => format!("{}/{}", addr, mask_to_prefix(mask)),
                _ => UNDEFINED.to_string(),
            }
        }
        "multicastrange" => {
            let start = or_zero(&rec.start_ip);
            let end = or_zero(&rec.end_ip);
            match (parse_ipv4(start), parse_ipv4(end)) {
                (Some(s), Some(e)) if s <= e => format!("{}-{}", start, end),
                (Some(_), Some(_)) => format!("{}-{}", end, start),
                _ => UNDEFINED.to_string(),
            }
        }
        _ => UNDEFINED.to_string(),
    }
}

/// `config firewall multicast-address6` — a single IPv6 prefix per object.
#[derive(Default)]
struct Multicast6 {
    name: String,
    ip6: String,
    comment: String,
}

#[derive(Default)]
pub struct Multicast6Handler {
    current: Option<Multicast6>,
}

impl StanzaHandler for Multicast6Handler {
    fn begin(&mut self, name: &str) {
        let mut rec = Multicast6::default();
        rec.name = name.to_string();
        self.current = Some(rec);
    }

    fn set(&mut self, tokens: &[String]) {
        let rec = match self.current.as_mut() {
            Some(rec) => rec,
            None => return,
        };
        match tokens.get(1).map(String::as_str) {
            Some("ip6") => rec.ip6 = value(tokens),
            Some("comment") => rec.comment = joined(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let ip6 = if rec.ip6.is_empty() { "::/0" } else { rec.ip6.as_str() };
            let mut set = TokenSet::default();
            set.comment = rec.comment.clone();
            set.push_unique(normalize_ipv6_prefix(ip6));
            domain.mcast6.insert(&rec.name, set);
        }
    }
}
