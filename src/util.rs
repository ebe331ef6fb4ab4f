use std::net::Ipv4Addr;

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// The /24 prefix of an IPv4 address, e.g. `10.0.1` for `10.0.1.17`.
pub fn ipv4_subnet(id: &str) -> Option<String> {
    let address = id.trim().parse::<Ipv4Addr>().ok()?;
    let [a, b, c, _] = address.octets();
    Some(format!("{a}.{b}.{c}"))
}
