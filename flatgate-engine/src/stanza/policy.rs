use crate::expand::{expand_policy, PolicyRecord};
use crate::stanza::{joined, list, value, StanzaHandler};
use crate::store::{Domain, TypeMode};

/// Handler for all six policy stanzas; the type-mode it was registered with
/// decides the target list and the expansion rules.
pub struct PolicyHandler {
    mode: TypeMode,
    current: Option<PolicyRecord>,
}

impl PolicyHandler {
    pub fn new(mode: TypeMode) -> PolicyHandler {
        PolicyHandler {
            mode,
            current: None,
        }
    }
}

impl StanzaHandler for PolicyHandler {
    fn begin(&mut self, name: &str) {
        let mut rec = PolicyRecord::default();
        rec.id = name.to_string();
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
            "name" => rec.name = value(tokens),
            "srcintf" => rec.srcintf = list(tokens),
            "dstintf" => rec.dstintf = list(tokens),
            "srcaddr" => rec.srcaddr = list(tokens),
            "dstaddr" => rec.dstaddr = list(tokens),
            "service" => rec.service = list(tokens),
            "action" => rec.action = value(tokens),
            "status" => rec.status = value(tokens),
            "schedule" => rec.schedule = value(tokens),
            "comments" => rec.comments = joined(tokens),
            "srcaddr-negate" => rec.srcaddr_negate = value(tokens),
            "dstaddr-negate" => rec.dstaddr_negate = value(tokens),
            "service-negate" => rec.service_negate = value(tokens),
            "protocol" => rec.protocol = value(tokens),
            "start-port" => rec.start_port = value(tokens),
            "end-port" => rec.end_port = value(tokens),
            _ => {}
        }
    }

    fn end(&mut self, domain: &mut Domain) {
        if let Some(rec) = self.current.take() {
            let line = domain.next_policy_line(self.mode);
            let rows = expand_policy(&rec, self.mode, line, domain);
            domain.policy_list_mut(self.mode).extend(rows);
        }
    }
}
