//! Local subnet detection and CIDR arithmetic

use if_addrs::IfAddr;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::str::FromStr;

use crate::collectors::errors::{CidrParseError, SubnetError};

/// Subnet assumed when the local one cannot be determined
pub const FALLBACK_SUBNET: Cidr = Cidr {
    network: Ipv4Addr::new(192, 168, 1, 0),
    prefix: 24,
};

/// Public address used only to select the default route; nothing is sent to it
const ROUTE_PROBE_TARGET: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// IPv4 network in CIDR notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    /// Builds a CIDR from a network address and prefix, masking off host bits
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, CidrParseError> {
        if prefix > 32 {
            return Err(CidrParseError::InvalidPrefix(prefix.to_string()));
        }
        let mask = prefix_to_mask(prefix);
        Ok(Self {
            network: Ipv4Addr::from(u32::from(address) & mask),
            prefix,
        })
    }

    /// Network of `address` under `netmask`: octet-wise AND, prefix = set bits in the mask
    pub fn from_address_and_mask(address: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        let a = address.octets();
        let m = netmask.octets();
        let network = Ipv4Addr::new(a[0] & m[0], a[1] & m[1], a[2] & m[2], a[3] & m[3]);
        let prefix = m.iter().map(|octet| octet.count_ones()).sum::<u32>() as u8;
        Self { network, prefix }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Address `offset` positions past the network address, wrapping at 2^32
    pub fn host(&self, offset: u32) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network).wrapping_add(offset))
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let mask = prefix_to_mask(self.prefix);
        u32::from(address) & mask == u32::from(self.network)
    }
}

fn prefix_to_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (address, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrParseError::MissingPrefix(s.to_string()))?;
        let address = address
            .parse::<Ipv4Addr>()
            .map_err(|_| CidrParseError::InvalidAddress(address.to_string()))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| CidrParseError::InvalidPrefix(prefix.to_string()))?;
        Cidr::new(address, prefix)
    }
}

/// Address and netmask of the interface carrying the default route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// Source of the default-route interface address
pub trait InterfaceLookup {
    fn default_ipv4(&self) -> Result<InterfaceAddress, SubnetError>;
}

/// Looks up the default route through the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceLookup for SystemInterfaces {
    fn default_ipv4(&self) -> Result<InterfaceAddress, SubnetError> {
        // Connecting a UDP socket only selects a route and local address
        let socket =
            UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(SubnetError::NoDefaultRoute)?;
        socket
            .connect(ROUTE_PROBE_TARGET)
            .map_err(SubnetError::NoDefaultRoute)?;
        let local = socket
            .local_addr()
            .map_err(SubnetError::NoDefaultRoute)?
            .ip();

        let local = match local {
            IpAddr::V4(v4) if !v4.is_unspecified() => v4,
            other => return Err(SubnetError::NotIpv4(other)),
        };
        debug!("Default route leaves via local address {}", local);

        let interfaces = if_addrs::get_if_addrs().map_err(SubnetError::Interfaces)?;
        interfaces
            .iter()
            .find_map(|iface| match &iface.addr {
                IfAddr::V4(v4) if v4.ip == local => {
                    debug!("Default interface is {} ({}/{})", iface.name, v4.ip, v4.netmask);
                    Some(InterfaceAddress {
                        address: v4.ip,
                        netmask: v4.netmask,
                    })
                }
                _ => None,
            })
            .ok_or(SubnetError::NoMatchingInterface(local))
    }
}

/// Detects the local subnet via the operating system, falling back to 192.168.1.0/24
pub fn detect_local_subnet() -> Cidr {
    detect_local_subnet_with(&SystemInterfaces)
}

/// Detects the local subnet through `lookup`; never fails
pub fn detect_local_subnet_with(lookup: &dyn InterfaceLookup) -> Cidr {
    match lookup.default_ipv4() {
        Ok(iface) => {
            let cidr = Cidr::from_address_and_mask(iface.address, iface.netmask);
            info!("Detected local subnet {}", cidr);
            cidr
        }
        Err(e) => {
            warn!(
                "Could not detect local subnet ({}), using fallback {}",
                e, FALLBACK_SUBNET
            );
            FALLBACK_SUBNET
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup(Result<InterfaceAddress, ()>);

    impl InterfaceLookup for FixedLookup {
        fn default_ipv4(&self) -> Result<InterfaceAddress, SubnetError> {
            self.0.map_err(|_| {
                SubnetError::NoDefaultRoute(std::io::Error::new(
                    std::io::ErrorKind::NetworkUnreachable,
                    "no route",
                ))
            })
        }
    }

    #[test]
    fn test_network_from_address_and_mask() {
        let cidr = Cidr::from_address_and_mask(
            Ipv4Addr::new(192, 168, 4, 37),
            Ipv4Addr::new(255, 255, 255, 0),
        );
        assert_eq!(cidr.to_string(), "192.168.4.0/24");

        let cidr = Cidr::from_address_and_mask(
            Ipv4Addr::new(10, 20, 130, 7),
            Ipv4Addr::new(255, 255, 240, 0),
        );
        assert_eq!(cidr.to_string(), "10.20.128.0/20");
    }

    #[test]
    fn test_detect_uses_lookup() {
        let lookup = FixedLookup(Ok(InterfaceAddress {
            address: Ipv4Addr::new(172, 16, 5, 9),
            netmask: Ipv4Addr::new(255, 255, 0, 0),
        }));
        assert_eq!(detect_local_subnet_with(&lookup).to_string(), "172.16.0.0/16");
    }

    #[test]
    fn test_detect_falls_back_on_failure() {
        let lookup = FixedLookup(Err(()));
        let cidr = detect_local_subnet_with(&lookup);
        assert_eq!(cidr, FALLBACK_SUBNET);
        assert_eq!(cidr.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_parse_cidr() {
        let cidr: Cidr = "10.0.0.0/24".parse().unwrap();
        assert_eq!(cidr.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.prefix(), 24);

        // Host bits are masked off
        let cidr: Cidr = "10.0.0.77/24".parse().unwrap();
        assert_eq!(cidr.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn test_parse_cidr_errors() {
        assert_eq!(
            "10.0.0.0".parse::<Cidr>(),
            Err(CidrParseError::MissingPrefix("10.0.0.0".to_string()))
        );
        assert!(matches!(
            "10.0.0/24".parse::<Cidr>(),
            Err(CidrParseError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<Cidr>(),
            Err(CidrParseError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_host_and_contains() {
        let cidr: Cidr = "192.168.1.0/24".parse().unwrap();
        assert_eq!(cidr.host(1), Ipv4Addr::new(192, 168, 1, 1));
        assert!(cidr.contains(Ipv4Addr::new(192, 168, 1, 254)));
        assert!(!cidr.contains(Ipv4Addr::new(192, 168, 2, 1)));

        let everything: Cidr = "0.0.0.0/0".parse().unwrap();
        assert!(everything.contains(Ipv4Addr::new(8, 8, 8, 8)));
    }
}
