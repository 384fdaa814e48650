use crate::row::PolicyRow;
use std::collections::HashMap;

/// Source/destination address family of a policy list, and whether the list
/// is multicast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeMode {
    V4ToV4,
    V6ToV6,
    V4ToV6,
    V6ToV4,
    V4ToV4Multicast,
    V6ToV6Multicast,
}

impl TypeMode {
    /// Every type-mode, in the order stage outputs iterate them.
    pub const ALL: [TypeMode; 6] = [
        TypeMode::V4ToV4,
        TypeMode::V6ToV6,
        TypeMode::V4ToV6,
        TypeMode::V6ToV4,
        TypeMode::V4ToV4Multicast,
        TypeMode::V6ToV6Multicast,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeMode::V4ToV4 => "4to4",
            TypeMode::V6ToV6 => "6to6",
            TypeMode::V4ToV6 => "4to6",
            TypeMode::V6ToV4 => "6to4",
            TypeMode::V4ToV4Multicast => "4to4m",
            TypeMode::V6ToV6Multicast => "6to6m",
        }
    }

    pub fn is_multicast(self) -> bool {
        match self {
            TypeMode::V4ToV4Multicast | TypeMode::V6ToV6Multicast => true,
            _ => false,
        }
    }

    fn index(self) -> usize {
        match self {
            TypeMode::V4ToV4 => 0,
            TypeMode::V6ToV6 => 1,
            TypeMode::V4ToV6 => 2,
            TypeMode::V6ToV4 => 3,
            TypeMode::V4ToV4Multicast => 4,
            TypeMode::V6ToV6Multicast => 5,
        }
    }
}

/// Bit set over the protocol classes a service's values fall into. The
/// policy expander consults it to decide which columns carry the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtocolClass(u8);

impl ProtocolClass {
    pub const IP: ProtocolClass = ProtocolClass(0b0001);
    pub const ICMP: ProtocolClass = ProtocolClass(0b0010);
    pub const PORTED: ProtocolClass = ProtocolClass(0b0100);
    pub const UNSUPPORTED: ProtocolClass = ProtocolClass(0b1000);

    pub fn merge(self, other: ProtocolClass) -> ProtocolClass {
        ProtocolClass(self.0 | other.0)
    }

    pub fn intersects(self, other: ProtocolClass) -> bool {
        self.0 & other.0 != 0
    }

    /// Class of one canonical service value, read off its leading protocol
    /// token.
    pub fn of_value(value: &str) -> ProtocolClass {
        let lead = value
            .split(|c| c == '/' || c == ';')
            .next()
            .unwrap_or("");
        match lead {
            "1" | "58" => ProtocolClass::ICMP,
            "6" | "17" | "132" => ProtocolClass::PORTED,
            "ip" => ProtocolClass::IP,
            lead if !lead.is_empty() && lead.chars().all(|c| c.is_ascii_digit()) => {
                ProtocolClass::IP
            }
            _ => ProtocolClass::UNSUPPORTED,
        }
    }

    pub fn of_values(values: &[String]) -> ProtocolClass {
        values
            .iter()
            .fold(ProtocolClass::default(), |acc, v| acc.merge(ProtocolClass::of_value(v)))
    }
}

/// One named object: its canonical token values in first-insertion order,
/// the config comment, and (for services) the protocol-class set.
#[derive(Clone, Debug, Default)]
pub struct TokenSet {
    pub values: Vec<String>,
    pub comment: String,
    pub class: ProtocolClass,
}

impl TokenSet {
    /// Appends a value unless an equal one is already present.
    pub fn push_unique(&mut self, value: String) {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }
}

/// Name-to-object map that iterates in insertion order. Redefining a name
/// replaces the object but keeps its original position.
#[derive(Debug, Default)]
pub struct ObjectTable {
    order: Vec<String>,
    entries: HashMap<String, TokenSet>,
}

impl ObjectTable {
    pub fn insert(&mut self, name: &str, set: TokenSet) {
        if self.entries.insert(name.to_string(), set).is_none() {
            self.order.push(name.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&TokenSet> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenSet)> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), &self.entries[name]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// All named collections of one VDOM, plus its normalized policy lists. The
/// global (non-VDOM) scope is the domain with the empty name.
#[derive(Debug, Default)]
pub struct Domain {
    pub name: String,
    pub addr4: ObjectTable,
    pub addr6: ObjectTable,
    pub mcast4: ObjectTable,
    pub mcast6: ObjectTable,
    pub grp4: ObjectTable,
    pub grp6: ObjectTable,
    pub svc_custom: ObjectTable,
    pub svc_group: ObjectTable,
    policies: [Vec<PolicyRow>; 6],
}

impl Domain {
    pub fn policy_list(&self, mode: TypeMode) -> &[PolicyRow] {
        &self.policies[mode.index()]
    }

    pub fn policy_list_mut(&mut self, mode: TypeMode) -> &mut Vec<PolicyRow> {
        &mut self.policies[mode.index()]
    }

    /// Order number for the next policy of this type-mode, 1-based.
    pub fn next_policy_line(&self, mode: TypeMode) -> usize {
        self.policies[mode.index()]
            .last()
            .map(|row| row.polline + 1)
            .unwrap_or(1)
    }

    /// Looks a service name up the way the expander does: customs first,
    /// then groups.
    pub fn service(&self, name: &str) -> Option<&TokenSet> {
        self.svc_custom.get(name).or_else(|| self.svc_group.get(name))
    }
}

/// Every domain seen by the current parse pass, in first-appearance order.
#[derive(Debug, Default)]
pub struct Store {
    order: Vec<String>,
    domains: HashMap<String, Domain>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// The domain record for `name`, created on first reference.
    pub fn domain_mut(&mut self, name: &str) -> &mut Domain {
        if !self.domains.contains_key(name) {
            self.order.push(name.to_string());
            let mut domain = Domain::default();
            domain.name = name.to_string();
            self.domains.insert(name.to_string(), domain);
        }
        self.domains.get_mut(name).unwrap()
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.order.iter().map(move |name| &self.domains[name])
    }
}
