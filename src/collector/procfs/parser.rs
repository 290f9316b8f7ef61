//! Parsers for `/proc/net/dev` and `/sys/class/net/<iface>` files.
//!
//! These are pure functions that parse file content into structured data,
//! so they are easy to test with string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ============ Network Device Stats Parser ============

/// Parsed data from one `/proc/net/dev` row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    /// Bytes received
    pub rx_bytes: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
///
/// Rows are returned in file order. A file with headers but no rows is not
/// an error; a row with a non-numeric counter is.
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, counters)) = line.split_once(':') else {
            return Err(ParseError::new(format!("missing ':' in row {:?}", line.trim())));
        };

        let interface = name.trim().to_string();
        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            return Err(ParseError::new(format!(
                "interface {} has {} counters, expected 16",
                interface,
                values.len()
            )));
        }

        let counters = values
            .iter()
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    ParseError::new(format!("interface {}: invalid counter {:?}", interface, v))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        devices.push(NetDevStats {
            interface,
            rx_bytes: counters[0],
        });
    }

    Ok(devices)
}

// ============ Link State Parser ============

/// RFC 2863 operational state from `/sys/class/net/<iface>/operstate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperState {
    Up,
    Down,
    Dormant,
    LowerLayerDown,
    NotPresent,
    Testing,
    Unknown,
}

/// Parses `/sys/class/net/<iface>/operstate` content.
///
/// Unrecognized values map to `Unknown`.
pub fn parse_operstate(content: &str) -> OperState {
    match content.trim() {
        "up" => OperState::Up,
        "down" => OperState::Down,
        "dormant" => OperState::Dormant,
        "lowerlayerdown" => OperState::LowerLayerDown,
        "notpresent" => OperState::NotPresent,
        "testing" => OperState::Testing,
        _ => OperState::Unknown,
    }
}

/// Parses `/sys/class/net/<iface>/carrier` content (`1` = link detected).
pub fn parse_carrier(content: &str) -> bool {
    content.trim() == "1"
}

/// Decides whether a link counts as active.
///
/// Drivers that do not track operstate (tun, some virtual NICs) report
/// `unknown`; for those the carrier bit decides.
pub fn is_link_active(operstate: OperState, carrier: bool) -> bool {
    match operstate {
        OperState::Up => true,
        OperState::Unknown => carrier,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
";

    #[test]
    fn test_parse_net_dev() {
        let devices = parse_net_dev(NET_DEV).unwrap();
        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].interface, "lo");
        assert_eq!(devices[0].rx_bytes, 12345678);

        assert_eq!(devices[1].interface, "eth0");
        assert_eq!(devices[1].rx_bytes, 987654321);
    }

    #[test]
    fn test_parse_net_dev_no_space_after_colon() {
        // Large counters push the first value against the colon
        let content = "enp3s0:18446744073709551615 1 0 0 0 0 0 0 7 1 0 0 0 0 0 0\n";
        let devices = parse_net_dev(content).unwrap();
        assert_eq!(devices[0].interface, "enp3s0");
        assert_eq!(devices[0].rx_bytes, u64::MAX);
    }

    #[test]
    fn test_parse_net_dev_headers_only() {
        let content = NET_DEV.lines().take(2).collect::<Vec<_>>().join("\n");
        assert!(parse_net_dev(&content).unwrap().is_empty());
    }

    #[test]
    fn test_parse_net_dev_short_row() {
        let err = parse_net_dev("eth0: 1 2 3\n").unwrap_err();
        assert!(err.message.contains("eth0"));
    }

    #[test]
    fn test_parse_net_dev_bad_counter() {
        let err = parse_net_dev("eth0: x 1 0 0 0 0 0 0 7 1 0 0 0 0 0 0\n").unwrap_err();
        assert!(err.message.contains("invalid counter"));
    }

    #[test]
    fn test_parse_operstate() {
        assert_eq!(parse_operstate("up\n"), OperState::Up);
        assert_eq!(parse_operstate("down\n"), OperState::Down);
        assert_eq!(parse_operstate("lowerlayerdown"), OperState::LowerLayerDown);
        assert_eq!(parse_operstate("unknown\n"), OperState::Unknown);
        assert_eq!(parse_operstate("garbage"), OperState::Unknown);
    }

    #[test]
    fn test_is_link_active() {
        assert!(is_link_active(OperState::Up, false));
        assert!(is_link_active(OperState::Unknown, parse_carrier("1\n")));
        assert!(!is_link_active(OperState::Unknown, parse_carrier("0\n")));
        assert!(!is_link_active(OperState::Down, true));
        assert!(!is_link_active(OperState::Dormant, true));
    }
}
