//! # What are they for?
//!
//! Stanza handlers are the unit of interpretation in the config reader. Each
//! recognized `config firewall …` stanza owns one handler: `begin` opens a
//! fresh in-progress record for an `edit`, `set` assigns the fields the
//! handler recognizes, and `end` normalizes the record into canonical tokens
//! and installs it in the current domain. Handlers are single-threaded state
//! machines; one instance per stanza type serves a whole parse pass.

mod address;
pub use self::address::*;

mod multicast;
pub use self::multicast::*;

mod group;
pub use self::group::*;

mod service;
pub use self::service::*;

mod policy;
pub use self::policy::*;

use crate::store::Domain;
use std::collections::HashMap;

pub trait StanzaHandler {
    /// Opens an in-progress record named by the `edit` line.
    fn begin(&mut self, name: &str);

    /// Routes one `set` line; `tokens` is the full dequoted token vector
    /// including the leading `set` and the key.
    fn set(&mut self, tokens: &[String]);

    /// Normalizes and installs the in-progress record, if one is open.
    fn end(&mut self, domain: &mut Domain);
}

/// The stanza-path dispatch table the reader selects handlers from.
pub fn handler_table() -> HashMap<&'static str, Box<dyn StanzaHandler>> {
    let mut table: HashMap<&'static str, Box<dyn StanzaHandler>> = HashMap::new();
    table.insert("firewall address", Box::new(Address4Handler::default()));
    table.insert("firewall address6", Box::new(Address6Handler::default()));
    table.insert("firewall addrgrp", Box::new(AddrGrp4Handler::default()));
    table.insert("firewall addrgrp6", Box::new(AddrGrp6Handler::default()));
    table.insert(
        "firewall multicast-address",
        Box::new(Multicast4Handler::default()),
    );
    table.insert(
        "firewall multicast-address6",
        Box::new(Multicast6Handler::default()),
    );
    table.insert(
        "firewall service custom",
        Box::new(ServiceCustomHandler::default()),
    );
    table.insert(
        "firewall service group",
        Box::new(ServiceGroupHandler::default()),
    );
    table.insert(
        "firewall policy",
        Box::new(PolicyHandler::new(crate::store::TypeMode::V4ToV4)),
    );
    table.insert(
        "firewall policy6",
        Box::new(PolicyHandler::new(crate::store::TypeMode::V6ToV6)),
    );
    table.insert(
        "firewall policy64",
        Box::new(PolicyHandler::new(crate::store::TypeMode::V6ToV4)),
    );
    table.insert(
        "firewall policy46",
        Box::new(PolicyHandler::new(crate::store::TypeMode::V4ToV6)),
    );
    table.insert(
        "firewall multicast-policy",
        Box::new(PolicyHandler::new(crate::store::TypeMode::V4ToV4Multicast)),
    );
    table.insert(
        "firewall multicast-policy6",
        Box::new(PolicyHandler::new(crate::store::TypeMode::V6ToV6Multicast)),
    );
    table
}

// Shared `set`-line accessors.

/// The first value token of a `set` line, or empty.
pub(crate) fn value(tokens: &[String]) -> String {
    tokens.get(2).cloned().unwrap_or_default()
}

/// All value tokens joined; used for free-text fields like comments.
pub(crate) fn joined(tokens: &[String]) -> String {
    if tokens.len() <= 2 {
        String::new()
    } else {
        tokens[2..].join(" ")
    }
}

/// All value tokens, for member and port-range lists.
pub(crate) fn list(tokens: &[String]) -> Vec<String> {
    tokens.get(2..).map(|t| t.to_vec()).unwrap_or_default()
}
