//! Line-oriented reader for the FortiGate `config/edit/set/unset/next/end`
//! grammar. The reader keeps a stack of `config` frames and routes the lines
//! of recognized firewall stanzas to their handlers; everything else is
//! skipped without comment, per the non-failing contract of the whole
//! pipeline.

use crate::stanza::{handler_table, StanzaHandler};
use crate::store::Store;
use std::collections::HashMap;

/// Splits a config line into tokens. Whitespace separates tokens; one outer
/// pair of matching double or single quotes is stripped, and a backslash
/// inside quotes escapes the next character. Quoted tokens may carry
/// embedded spaces, which is how member lists keep multi-word object names
/// intact.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    in_token = true;
                } else if c.is_whitespace() {
                    if in_token {
                        tokens.push(std::mem::replace(&mut current, String::new()));
                        in_token = false;
                    }
                } else {
                    current.push(c);
                    in_token = true;
                }
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Parses a whole configuration dump into the store. Earlier content for the
/// same store accumulates; callers wanting a fresh parse start from a fresh
/// `Store`.
pub fn parse_config(text: &str, store: &mut Store) {
    let mut handlers = handler_table();
    // Frames are the joined tokens after `config`.
    let mut stack: Vec<String> = Vec::new();
    let mut vdom = String::new();

    // Splitting on both separators accepts CR, LF, and CRLF line endings.
    for raw_line in text.split(|c| c == '\n' || c == '\r') {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }
        match tokens[0].as_str() {
            "config" => {
                stack.push(tokens[1..].join(" "));
            }
            "end" => {
                if let Some(frame) = stack.pop() {
                    if frame == "vdom" {
                        vdom.clear();
                    } else if let Some(handler) = handlers.get_mut(frame.as_str()) {
                        handler.end(store.domain_mut(&vdom));
                    }
                }
            }
            "edit" => {
                let name = tokens.get(1).cloned().unwrap_or_default();
                match stack.last().map(String::as_str) {
                    Some("vdom") => {
                        vdom = name;
                        store.domain_mut(&vdom);
                    }
                    Some(frame) => {
                        if let Some(handler) = current_handler(&mut handlers, frame) {
                            handler.begin(&name);
                        }
                    }
                    None => {}
                }
            }
            "set" => {
                if let Some(frame) = stack.last() {
                    let frame = frame.clone();
                    if let Some(handler) = current_handler(&mut handlers, &frame) {
                        handler.set(&tokens);
                    }
                }
            }
            "next" => {
                if let Some(frame) = stack.last() {
                    let frame = frame.clone();
                    if let Some(handler) = current_handler(&mut handlers, &frame) {
                        handler.end(store.domain_mut(&vdom));
                    }
                }
            }
            // `unset` restores a default the handlers already start from.
            "unset" => {}
            _ => {}
        }
    }
}

fn current_handler<'a>(
    handlers: &'a mut HashMap<&'static str, Box<dyn StanzaHandler>>,
    frame: &str,
) -> Option<&'a mut Box<dyn StanzaHandler>> {
    handlers.get_mut(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_plain_and_quoted_values() {
        assert_eq!(tokenize("set subnet 192.168.0.0 255.255.255.0"), vec![
            "set",
            "subnet",
            "192.168.0.0",
            "255.255.255.0"
        ]);
        assert_eq!(tokenize("edit \"my object\""), vec!["edit", "my object"]);
        assert_eq!(tokenize("set member \"OBJ ONE\" \"OBJ2\""), vec![
            "set", "member", "OBJ ONE", "OBJ2"
        ]);
        assert_eq!(tokenize("set comment 'it''s'"), vec!["set", "comment", "its"]);
        assert_eq!(tokenize("set comment \"a \\\"b\\\"\""), vec!["set", "comment", "a \"b\""]);
        assert_eq!(tokenize("set comment \"\""), vec!["set", "comment", ""]);
        assert_eq!(tokenize("   "), Vec::<String>::new());
    }

    #[test]
    fn parses_addresses_into_the_global_domain() {
        let config = "\
config firewall address\n\
    edit \"LAN\"\n\
        set subnet 192.168.1.0 255.255.255.0\n\
    next\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let domain = store.domains().next().unwrap();
        assert_eq!(domain.name, "");
        assert_eq!(domain.addr4.get("LAN").unwrap().values, vec!["192.168.1.0/24"]);
    }

    #[test]
    fn routes_stanzas_per_vdom() {
        let config = "\
config vdom\n\
edit branch\n\
config firewall address\n\
    edit HOST\n\
        set subnet 10.1.1.1 255.255.255.255\n\
    next\n\
end\n\
next\n\
end\n\
config firewall address\n\
    edit GLOBAL\n\
        set subnet 10.2.0.0 255.255.0.0\n\
    next\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let names: Vec<String> = store.domains().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["branch", ""]);
        let branch = store.domains().next().unwrap();
        assert_eq!(branch.addr4.get("HOST").unwrap().values, vec!["10.1.1.1/32"]);
        assert!(branch.addr4.get("GLOBAL").is_none());
        let global = store.domains().nth(1).unwrap();
        assert_eq!(global.addr4.get("GLOBAL").unwrap().values, vec!["10.2.0.0/16"]);
    }

    #[test]
    fn skips_unrecognized_stanzas_and_comments() {
        let config = "\
# exported config\n\
config system interface\n\
    edit port1\n\
        set vdom root\n\
    next\n\
end\n\
config firewall address\n\
    edit A\n\
        set type iprange\n\
        set start-ip 10.0.0.1\n\
        set end-ip 10.0.0.9\n\
    next\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let domain = store.domains().next().unwrap();
        assert_eq!(domain.addr4.len(), 1);
        assert_eq!(domain.addr4.get("A").unwrap().values, vec!["10.0.0.1-10.0.0.9"]);
    }

    #[test]
    fn nested_unrecognized_blocks_do_not_reach_the_handler() {
        let config = "\
config firewall address\n\
    edit A\n\
        set subnet 10.0.0.0 255.0.0.0\n\
        config unknown-sub\n\
            edit 1\n\
                set subnet 99.0.0.0 255.0.0.0\n\
            next\n\
        end\n\
    next\n\
end\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let domain = store.domains().next().unwrap();
        assert_eq!(domain.addr4.get("A").unwrap().values, vec!["10.0.0.0/8"]);
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let config = "config firewall address\r\nedit A\r\nset subnet 10.0.0.0 255.255.255.0\r\nnext\r\nend\r\n";
        let mut store = Store::new();
        parse_config(config, &mut store);
        let domain = store.domains().next().unwrap();
        assert_eq!(domain.addr4.get("A").unwrap().values, vec!["10.0.0.0/24"]);
    }
}
