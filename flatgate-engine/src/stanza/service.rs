use crate::stanza::group::flatten_members;
use crate::stanza::{joined, list, value, StanzaHandler};
use crate::store::{Domain, ProtocolClass, TokenSet};
use flatgate_net::UNDEFINED;

/// `config firewall service custom`.
#[derive(Default)]
struct ServiceCustom {
    name: String,
    protocol: Option<String>,
    protocol_number: String,
    icmptype: String,
    icmpcode: String,
    tcp_portrange: Vec<String>,
    udp_portrange: Vec<String>,
    sctp_portrange: Vec<String>,
    iprange: String,
    fqdn: String,
    comment: String,
}

#[derive(Default)]
pub struct ServiceCustomHandler {
    current: Option<ServiceCustom>,
}

impl StanzaHandler for ServiceCustomHandler {
    fn begin(&mut self, name: &str) {
        let mut rec = ServiceCustom::default();
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
            "protocol" => rec.protocol = Some(value(tokens)),
            "protocol-number" => rec.protocol_number = value(tokens),
            "icmptype" => rec.icmptype = value(tokens),
            "icmpcode" => rec.icmpcode = value(tokens),
            "tcp-portrange" => rec.tcp_portrange = list(tokens),
            "udp-portrange" => rec.udp_portrange = list(tokens),
            "sctp-portrange" => rec.sctp_portrange = list(tokens),
            "iprange" => rec.iprange = value(tokens),
            "fqdn" => rec.fqdn = value(tokens),
            "comment" => rec.comment = joined(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let mut set = TokenSet::default();
            set.comment = rec.comment.clone();
            for value in normalize_service_custom(&rec) {
                set.push_unique(value);
            }
            set.class = ProtocolClass::of_values(&set.values);
            domain.svc_custom.insert(&rec.name, set);
        }
    }
}

fn or_any(field: &str) -> &str {
    if field.is_empty() {
        "any"
    } else {
        field
    }
}

// One side of a `<dst>[:<src>]` port element: `eq/N` or `range/S-E`.
// Unparseable operands degrade in place rather than failing the service.
fn port_operand(operand: &str) -> String {
    if operand.contains('-') {
        let mut parts = operand.splitn(2, '-');
        let start = parts.next().unwrap_or_default();
        let end = parts.next().unwrap_or_default();
        if is_port(start) && is_port(end) {
            format!("range/{}-{}", start, end)
        } else {
            "range/undefined-undefined".to_string()
        }
    } else if is_port(operand) {
        format!("eq/{}", operand)
    } else {
        "eq/undefined".to_string()
    }
}

fn is_port(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

// The service-destination qualifier attached to every ported value.
fn sda_token(rec: &ServiceCustom) -> String {
    if !rec.iprange.is_empty() && rec.iprange != "0.0.0.0" {
        if rec.iprange.contains('-') {
            rec.iprange.clone()
        } else {
            format!("{}/32", rec.iprange)
        }
    } else if !rec.fqdn.is_empty() {
        format!("fqdn:{}", rec.fqdn)
    } else {
        "0/0".to_string()
    }
}

fn normalize_service_custom(rec: &ServiceCustom) -> Vec<String> {
    let protocol = match &rec.protocol {
        Some(protocol) => protocol.as_str(),
        None => "TCP/UDP/SCTP",
    };
    match protocol {
        "IP" => {
            let number = &rec.protocol_number;
            if number.is_empty() || number == "0" {
                vec!["ip;-".to_string()]
            } else {
                vec![format!("{};-", number)]
            }
        }
        "ICMP" => vec![format!(
            "1/{}/{};-",
            or_any(&rec.icmptype),
            or_any(&rec.icmpcode)
        )],
        "ICMP6" => vec![format!(
            "58/{}/{};-",
            or_any(&rec.icmptype),
            or_any(&rec.icmpcode)
        )],
        "TCP/UDP/SCTP" => {
            let sda = sda_token(rec);
            let mut values = Vec::new();
            let lists: [(&str, &[String]); 3] = [
                ("6", &rec.tcp_portrange),
                ("17", &rec.udp_portrange),
                ("132", &rec.sctp_portrange),
            ];
            for (proto, elements) in &lists {
                let mut seen: Vec<&str> = Vec::new();
                for element in elements.iter() {
                    if seen.contains(&element.as_str()) {
                        continue;
                    }
                    seen.push(element.as_str());
                    let mut sides = element.splitn(2, ':');
                    let dst = sides.next().unwrap_or_default();
                    let src = sides.next();
                    let src_op = match src {
                        Some(src) => port_operand(src),
                        None => "eq/any".to_string(),
                    };
                    values.push(format!("{}/{}/{};{}", proto, src_op, port_operand(dst), sda));
                }
            }
            values
        }
        "" => vec![format!("{};-", UNDEFINED)],
        other => vec![format!("{};{}", other, other)],
    }
}

/// `config firewall service group`. Members resolve against customs first,
/// then against earlier groups; the group's protocol-class set is the union
/// of its members'.
#[derive(Default)]
struct ServiceGroup {
    name: String,
    members: Vec<String>,
    comment: String,
}

#[derive(Default)]
pub struct ServiceGroupHandler {
    current: Option<ServiceGroup>,
}

impl StanzaHandler for ServiceGroupHandler {
    fn begin(&mut self, name: &str) {
        let mut rec = ServiceGroup::default();
        rec.name = name.to_string();
        self.current = Some(rec);
    }

    fn set(&mut self, tokens: &[String]) {
        let rec = match self.current.as_mut() {
            Some(rec) => rec,
            None => return,
        };
        match tokens.get(1).map(String::as_str) {
            Some("member") => rec.members = list(tokens),
            Some("comment") => rec.comment = joined(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let mut set = flatten_members(&rec.members, &domain.svc_custom, &domain.svc_group);
            set.comment = rec.comment;
            domain.svc_group.insert(&rec.name, set);
        }
    }
}
