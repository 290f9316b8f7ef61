//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc/net/dev` and `/sys/class/net`
//! states for a few typical host layouts.

use super::filesystem::{MockFs, MockInterface};

impl MockFs {
    /// A workstation with loopback, one wired link up and a Wi-Fi card down.
    pub fn typical_host() -> Self {
        let fs = Self::new();

        fs.set_net_dev(&[
            MockInterface::new("lo", 12_345_678),
            MockInterface::new("eth0", 987_654_321),
            MockInterface::new("wlan0", 5_000_000),
        ]);

        // The kernel reports "unknown" for loopback
        fs.add_link("lo", "unknown", Some("1"));
        fs.add_link("eth0", "up", Some("1"));
        fs.add_link("wlan0", "down", Some("0"));

        fs
    }

    /// A host with two active uplinks, both counters starting at zero.
    ///
    /// `tun0` reports `unknown` operstate with carrier, as VPN tunnels do.
    pub fn dual_uplink() -> Self {
        let fs = Self::new();

        fs.set_net_dev(&[
            MockInterface::new("lo", 0),
            MockInterface::new("eth0", 0),
            MockInterface::new("tun0", 0),
        ]);

        fs.add_link("lo", "unknown", Some("1"));
        fs.add_link("eth0", "up", Some("1"));
        fs.add_link("tun0", "unknown", Some("1"));

        fs
    }

    /// A host where every non-loopback link is down.
    pub fn all_links_down() -> Self {
        let fs = Self::new();

        fs.set_net_dev(&[
            MockInterface::new("lo", 4096),
            MockInterface::new("eth0", 1_000_000),
        ]);

        fs.add_link("lo", "unknown", Some("1"));
        fs.add_link("eth0", "down", Some("0"));

        fs
    }
}
