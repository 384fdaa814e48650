//! IPv4 arithmetic over 32-bit integers and dotted-quad strings. Everything
//! here is pure; parse failures surface as `None` and the callers degrade the
//! value to their own inert forms.

/// Parses a dotted-quad address into its 32-bit integer form.
pub fn parse_ipv4(addr: &str) -> Option<u32> {
    let parts: Vec<&str> = addr.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut value: u32 = 0;
    for part in parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let octet = part.parse::<u8>().ok()?;
        value = (value << 8) | u32::from(octet);
    }
    Some(value)
}

pub fn format_ipv4(addr: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (addr >> 24) & 0xFF,
        (addr >> 16) & 0xFF,
        (addr >> 8) & 0xFF,
        addr & 0xFF
    )
}

/// Netmask for a prefix length. Lengths above 32 saturate to a host mask.
pub fn prefix_to_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else if prefix >= 32 {
        u32::max_value()
    } else {
        u32::max_value() << (32 - prefix)
    }
}

// Octet values of the canonical netmask table, 256 - 2^(8-n).
fn mask_octet_bits(octet: u32) -> u8 {
    match octet {
        255 => 8,
        254 => 7,
        252 => 6,
        248 => 5,
        240 => 4,
        224 => 3,
        192 => 2,
        128 => 1,
        _ => 0,
    }
}

/// Prefix length recovered from a netmask. Each octet contributes its table
/// value, so a non-contiguous mask still yields a total bit count.
pub fn mask_to_prefix(mask: u32) -> u8 {
    (0..4)
        .map(|i| mask_octet_bits((mask >> (24 - 8 * i)) & 0xFF))
        .sum()
}

pub fn network_address(addr: u32, prefix: u8) -> u32 {
    addr & prefix_to_mask(prefix)
}

pub fn broadcast_address(addr: u32, prefix: u8) -> u32 {
    addr | !prefix_to_mask(prefix)
}

/// Parses `A.B.C.D/p` with p in 0..=32.
pub fn parse_ipv4_cidr(value: &str) -> Option<(u32, u8)> {
    let mut parts = value.splitn(2, '/');
    let addr = parse_ipv4(parts.next()?)?;
    let prefix_part = parts.next()?;
    if prefix_part.is_empty() || !prefix_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let prefix = prefix_part.parse::<u8>().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((addr, prefix))
}

/// Parses `A.B.C.D-E.F.G.H`.
pub fn parse_ipv4_range(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.splitn(2, '-');
    let start = parse_ipv4(parts.next()?)?;
    let end = parse_ipv4(parts.next()?)?;
    Some((start, end))
}

/// Parses the Fortinet wildcard form `A.B.C.D/M.M.M.M`, where the mask marks
/// must-match bits rather than a prefix.
pub fn parse_ipv4_wildcard(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.splitn(2, '/');
    let addr = parse_ipv4(parts.next()?)?;
    let mask = parse_ipv4(parts.next()?)?;
    Some((addr, mask))
}

/// Decomposes an inclusive range into the minimal set of prefix-aligned CIDR
/// blocks that tile it exactly. The fragment left of the widest aligned block
/// is emitted first, then the aligned blocks, then the right fragment.
/// Callers quantify over this list in order, so the order is part of the
/// contract.
pub fn range_to_cidrs(start: u32, end: u32) -> Vec<(u32, u8)> {
    let mut blocks = Vec::new();
    if start <= end {
        decompose(u64::from(start), u64::from(end), &mut blocks);
    }
    blocks
}

fn decompose(start: u64, end: u64, blocks: &mut Vec<(u32, u8)>) {
    for prefix in 0..=32u8 {
        let size = 1u64 << (32 - prefix);
        let aligned = (start + size - 1) / size * size;
        if aligned + size - 1 > end {
            continue;
        }
        if aligned > start {
            decompose(start, aligned - 1, blocks);
        }
        let mut block = aligned;
        while block + size - 1 <= end {
            blocks.push((block as u32, prefix));
            block += size;
        }
        if block <= end {
            decompose(block, end, blocks);
        }
        return;
    }
}

fn host_normalized(addr: u32, prefix: u8) -> (u32, u8) {
    if network_address(addr, prefix) != addr {
        (addr, 32)
    } else {
        (addr, prefix)
    }
}

/// Whether the queried host or prefix lies inside the segment. A query token
/// with host bits set behaves as a /32.
pub fn ipv4_in_cidr(query_addr: u32, query_prefix: u8, seg_addr: u32, seg_prefix: u8) -> bool {
    let (addr, prefix) = host_normalized(query_addr, query_prefix);
    prefix >= seg_prefix
        && network_address(addr, seg_prefix) == network_address(seg_addr, seg_prefix)
}

/// Whether the queried host or prefix lies inside the inclusive range.
pub fn ipv4_in_range(query_addr: u32, query_prefix: u8, range_start: u32, range_end: u32) -> bool {
    let (start, end) = if network_address(query_addr, query_prefix) != query_addr {
        (query_addr, query_addr)
    } else {
        (
            network_address(query_addr, query_prefix),
            broadcast_address(query_addr, query_prefix),
        )
    };
    range_start <= start && end <= range_end
}

fn wildcard_eq(addr: u32, wild_addr: u32, wild_mask: u32) -> bool {
    addr & wild_mask == wild_addr & wild_mask
        && (addr | !wild_mask) == (wild_addr | !wild_mask)
}

/// Fortinet wildcard match: 1-bits of the mask must match, 0-bits are
/// don't-care. A host query compares networks at the mask's table-derived
/// prefix length; a segment query requires its network and broadcast
/// addresses to both satisfy the mask equalities.
pub fn ipv4_in_wildcard(query_addr: u32, query_prefix: u8, wild_addr: u32, wild_mask: u32) -> bool {
    let is_host = query_prefix >= 32 || network_address(query_addr, query_prefix) != query_addr;
    if is_host {
        let prefix = mask_to_prefix(wild_mask);
        network_address(query_addr, prefix) == network_address(wild_addr, prefix)
    } else {
        let network = network_address(query_addr, query_prefix);
        let broadcast = broadcast_address(query_addr, query_prefix);
        wildcard_eq(network, wild_addr, wild_mask) && wildcard_eq(broadcast, wild_addr, wild_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(addr: &str) -> u32 {
        parse_ipv4(addr).unwrap()
    }

    #[test]
    fn parses_and_formats_dotted_quads() {
        assert_eq!(parse_ipv4("192.168.0.1"), Some(0xC0A8_0001));
        assert_eq!(format_ipv4(0xC0A8_0001), "192.168.0.1");
        assert_eq!(parse_ipv4("0.0.0.0"), Some(0));
        assert_eq!(parse_ipv4("255.255.255.255"), Some(u32::max_value()));
    }

    #[test]
    fn rejects_malformed_dotted_quads() {
        assert_eq!(parse_ipv4("192.168.0"), None);
        assert_eq!(parse_ipv4("192.168.0.1.5"), None);
        assert_eq!(parse_ipv4("192.168.0.256"), None);
        assert_eq!(parse_ipv4("192.168.0.+1"), None);
        assert_eq!(parse_ipv4("192.168..1"), None);
        assert_eq!(parse_ipv4(""), None);
    }

    #[test]
    fn prefix_and_mask_are_inverse_on_the_table() {
        for prefix in 0..=32u8 {
            assert_eq!(mask_to_prefix(prefix_to_mask(prefix)), prefix);
        }
        assert_eq!(prefix_to_mask(24), 0xFFFF_FF00);
        assert_eq!(prefix_to_mask(0), 0);
    }

    #[test]
    fn non_contiguous_mask_sums_per_octet() {
        assert_eq!(mask_to_prefix(ip("255.255.0.255")), 24);
        assert_eq!(mask_to_prefix(ip("0.255.0.0")), 8);
        // Octets outside the netmask table contribute nothing.
        assert_eq!(mask_to_prefix(ip("255.37.0.0")), 8);
    }

    #[test]
    fn parses_cidr_range_and_wildcard_forms() {
        assert_eq!(parse_ipv4_cidr("10.0.0.0/8"), Some((0x0A00_0000, 8)));
        assert_eq!(parse_ipv4_cidr("10.0.0.0/33"), None);
        assert_eq!(parse_ipv4_cidr("10.0.0.0"), None);
        assert_eq!(
            parse_ipv4_range("10.0.0.1-10.0.0.9"),
            Some((0x0A00_0001, 0x0A00_0009))
        );
        assert_eq!(
            parse_ipv4_wildcard("192.168.0.0/255.255.0.255"),
            Some((ip("192.168.0.0"), ip("255.255.0.255")))
        );
    }

    #[test]
    fn decomposes_range_into_ordered_cidrs() {
        let blocks: Vec<String> = range_to_cidrs(ip("192.168.0.1"), ip("192.168.0.100"))
            .into_iter()
            .map(|(addr, prefix)| format!("{}/{}", format_ipv4(addr), prefix))
            .collect();
        assert_eq!(
            blocks,
            vec![
                "192.168.0.1/32",
                "192.168.0.2/31",
                "192.168.0.4/30",
                "192.168.0.8/29",
                "192.168.0.16/28",
                "192.168.0.32/27",
                "192.168.0.64/27",
                "192.168.0.96/30",
                "192.168.0.100/32",
            ]
        );
    }

    #[test]
    fn single_host_range_is_one_slash_32() {
        assert_eq!(range_to_cidrs(ip("10.0.0.5"), ip("10.0.0.5")), vec![(ip("10.0.0.5"), 32)]);
    }

    #[test]
    fn decomposition_tiles_the_range_exactly() {
        let cases = [
            (ip("10.0.0.3"), ip("10.0.1.17")),
            (ip("0.0.0.0"), ip("0.0.0.255")),
            (ip("172.16.0.255"), ip("172.16.1.0")),
        ];
        for &(start, end) in &cases {
            let blocks = range_to_cidrs(start, end);
            let mut covered = Vec::new();
            for (addr, prefix) in blocks {
                assert_eq!(network_address(addr, prefix), addr);
                covered.push((addr, broadcast_address(addr, prefix)));
            }
            // Contiguous, non-overlapping, and bounded by the input range.
            assert_eq!(covered.first().unwrap().0, start);
            assert_eq!(covered.last().unwrap().1, end);
            for pair in covered.windows(2) {
                assert_eq!(pair[0].1 + 1, pair[1].0);
            }
        }
    }

    #[test]
    fn whole_space_decomposes_to_slash_zero() {
        assert_eq!(
            range_to_cidrs(0, u32::max_value()),
            vec![(0, 0)]
        );
    }

    #[test]
    fn cidr_containment() {
        // /32 of the network address of a /24 is inside it.
        assert!(ipv4_in_cidr(ip("192.168.1.0"), 32, ip("192.168.1.0"), 24));
        // Same prefix, same network.
        assert!(ipv4_in_cidr(ip("192.168.1.0"), 24, ip("192.168.1.0"), 24));
        // Longer prefix inside.
        assert!(ipv4_in_cidr(ip("192.168.1.128"), 25, ip("192.168.1.0"), 24));
        // Shorter prefix escapes.
        assert!(!ipv4_in_cidr(ip("192.168.0.0"), 16, ip("192.168.1.0"), 24));
        // Host bits set behaves as /32.
        assert!(ipv4_in_cidr(ip("192.168.1.7"), 24, ip("192.168.1.0"), 24));
        assert!(!ipv4_in_cidr(ip("192.168.2.7"), 24, ip("192.168.1.0"), 24));
    }

    #[test]
    fn range_containment() {
        let (start, end) = (ip("10.0.0.10"), ip("10.0.0.20"));
        assert!(ipv4_in_range(ip("10.0.0.10"), 32, start, end));
        assert!(ipv4_in_range(ip("10.0.0.20"), 32, start, end));
        assert!(!ipv4_in_range(ip("10.0.0.21"), 32, start, end));
        // Size-one range.
        assert!(ipv4_in_range(ip("10.0.0.10"), 32, start, start));
        assert!(!ipv4_in_range(ip("10.0.0.11"), 32, start, start));
        // A prefix is contained only when both bounds are.
        assert!(ipv4_in_range(ip("10.0.0.16"), 30, start, end));
        assert!(!ipv4_in_range(ip("10.0.0.16"), 28, start, end));
        // Host bits set collapses to the address itself.
        assert!(ipv4_in_range(ip("10.0.0.13"), 24, start, end));
    }

    #[test]
    fn wildcard_host_matches_through_table_prefix() {
        let (wild, mask) = (ip("192.168.0.0"), ip("255.255.0.255"));
        assert!(ipv4_in_wildcard(ip("192.168.0.1"), 32, wild, mask));
        assert!(!ipv4_in_wildcard(ip("192.168.1.1"), 32, wild, mask));
    }

    #[test]
    fn wildcard_segment_requires_network_and_broadcast() {
        let (wild, mask) = (ip("192.168.0.0"), ip("255.255.0.255"));
        assert!(!ipv4_in_wildcard(ip("192.168.0.0"), 31, wild, mask));
    }

    #[test]
    fn wildcard_boundary_masks() {
        // All-ones mask admits exactly the wildcard address.
        assert!(ipv4_in_wildcard(ip("10.1.2.3"), 32, ip("10.1.2.3"), ip("255.255.255.255")));
        assert!(!ipv4_in_wildcard(ip("10.1.2.4"), 32, ip("10.1.2.3"), ip("255.255.255.255")));
        // All-zeros mask admits everything.
        assert!(ipv4_in_wildcard(ip("10.1.2.3"), 32, ip("172.16.0.0"), 0));
        assert!(ipv4_in_wildcard(ip("10.0.0.0"), 8, ip("172.16.0.0"), 0));
    }

    #[test]
    fn contiguous_wildcard_mask_equals_cidr() {
        let (wild, mask) = (ip("10.20.0.0"), ip("255.255.0.0"));
        for &(addr, prefix) in &[
            (ip("10.20.0.1"), 32),
            (ip("10.20.255.255"), 32),
            (ip("10.21.0.1"), 32),
            (ip("10.20.128.0"), 17),
            (ip("10.0.0.0"), 8),
        ] {
            assert_eq!(
                ipv4_in_wildcard(addr, prefix, wild, mask),
                ipv4_in_cidr(addr, prefix, wild, 16),
            );
        }
    }
}
