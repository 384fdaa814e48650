use crate::stanza::{joined, list, StanzaHandler};
use crate::store::{Domain, ObjectTable, TokenSet};

/// Resolves group members against already-installed tables: each member
/// contributes the values it names in the address table, then in the group
/// table. Members defined later in the file (or not at all) contribute
/// nothing, and duplicates keep their first position.
pub(crate) fn flatten_members(
    members: &[String],
    leaves: &ObjectTable,
    groups: &ObjectTable,
) -> TokenSet {
    let mut set = TokenSet::default();
    for member in members {
        if let Some(entry) = leaves.get(member) {
            for value in &entry.values {
                set.push_unique(value.clone());
            }
            set.class = set.class.merge(entry.class);
        }
        if let Some(entry) = groups.get(member) {
            for value in &entry.values {
                set.push_unique(value.clone());
            }
            set.class = set.class.merge(entry.class);
        }
    }
    set
}

#[derive(Default)]
struct AddrGrp {
    name: String,
    members: Vec<String>,
    comment: String,
}

#[derive(Default)]
pub struct AddrGrp4Handler {
    current: Option<AddrGrp>,
}

impl StanzaHandler for AddrGrp4Handler {
    fn begin(&mut self, name: &str) {
        let mut rec = AddrGrp::default();
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
            let mut set = flatten_members(&rec.members, &domain.addr4, &domain.grp4);
            set.comment = rec.comment;
            domain.grp4.insert(&rec.name, set);
        }
    }
}

#[derive(Default)]
pub struct AddrGrp6Handler {
    current: Option<AddrGrp>,
}

impl StanzaHandler for AddrGrp6Handler {
    fn begin(&mut self, name: &str) {
        let mut rec = AddrGrp::default();
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
            let mut set = flatten_members(&rec.members, &domain.addr6, &domain.grp6);
            set.comment = rec.comment;
            domain.grp6.insert(&rec.name, set);
        }
    }
}
