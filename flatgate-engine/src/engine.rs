//! The synchronous core the channel façade drives. One `Engine` owns the
//! store and the flattened row cache; each stage method runs to completion
//! and returns its user-visible text.

use crate::config::parse_config;
use crate::flatten::flatten_rows;
use crate::listing::{address_listing, service_listing};
use crate::lookup::{run_lookup, LookupOptions};
use crate::row::PolicyRow;
use crate::store::{Store, TypeMode};

#[derive(Default)]
pub struct Engine {
    store: Store,
    flattened: Vec<PolicyRow>,
}

impl Engine {
    pub fn new() -> Engine {
        Engine::default()
    }

    /// Parses a config dump into a fresh store and returns the address and
    /// service listings. Replaces whatever an earlier parse produced.
    pub fn make_list(&mut self, config: &str) -> (String, String) {
        self.store = Store::new();
        self.flattened.clear();
        parse_config(config, &mut self.store);
        (address_listing(&self.store), service_listing(&self.store))
    }

    /// The normalized policy view: every row of every domain, unflattened.
    pub fn normalize(&self) -> String {
        let mut lines = Vec::new();
        for domain in self.store.domains() {
            for &mode in TypeMode::ALL.iter() {
                for row in domain.policy_list(mode) {
                    lines.push(row.to_string());
                }
            }
        }
        lines.join("\r\n")
    }

    /// Rewrites the normalized rows under the flatten toggles, caches the
    /// result for lookup, and returns its CSV text.
    pub fn flatten(&mut self, addresses: bool, services: bool) -> String {
        self.flattened = flatten_rows(&self.store, addresses, services);
        let lines: Vec<String> = self.flattened.iter().map(|row| row.to_string()).collect();
        lines.join("\r\n")
    }

    /// Runs a lookup list against the cached flattened rows. Without a
    /// preceding `flatten` the cache is empty and both outputs are too.
    pub fn lookup(&self, list: &str, fqdn_geo_match_all: bool) -> (String, String) {
        let options = LookupOptions { fqdn_geo_match_all };
        run_lookup(&self.flattened, list, &options)
    }
}
