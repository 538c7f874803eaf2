//! Syntactic validation of the robot address entered by the user.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::error::BridgeError;

/// A numeric host address that passed validation.
///
/// Only IPv4 dotted and IPv6 literal forms are accepted; names are never
/// resolved, so an address here says nothing about reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrokerAddress(IpAddr);

impl BrokerAddress {
    /// Host string handed to the broker client.
    pub fn host(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BrokerAddress {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

/// Parses `text` as a host address.
///
/// Surrounding whitespace is ignored. Empty text and anything that is not a
/// numeric IPv4/IPv6 address yield [`BridgeError::InvalidAddress`] carrying
/// the trimmed text.
pub fn validate(text: &str) -> Result<BrokerAddress, BridgeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::InvalidAddress(String::new()));
    }
    trimmed
        .parse::<IpAddr>()
        .map(BrokerAddress)
        .map_err(|_| BridgeError::InvalidAddress(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_invalid() {
        assert!(matches!(validate(""), Err(BridgeError::InvalidAddress(_))));
        assert!(matches!(
            validate("   "),
            Err(BridgeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_hostname_is_invalid() {
        assert!(matches!(
            validate("not-an-ip"),
            Err(BridgeError::InvalidAddress(text)) if text == "not-an-ip"
        ));
        assert!(validate("localhost").is_err());
        assert!(validate("192.168.1").is_err());
        assert!(validate("192.168.1.256").is_err());
    }

    #[test]
    fn test_dotted_ipv4_round_trips_as_text() {
        let address = validate("192.168.1.5").unwrap();
        assert_eq!(address.to_string(), "192.168.1.5");
        assert_eq!(address.host(), "192.168.1.5");
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let address = validate(" 10.0.0.5\n").unwrap();
        assert_eq!(address, validate("10.0.0.5").unwrap());
    }

    #[test]
    fn test_ipv6_literal_is_valid() {
        let address: BrokerAddress = "::1".parse().unwrap();
        assert_eq!(address.host(), "::1");
    }

    #[test]
    fn test_invalid_text_is_reported_trimmed() {
        assert!(matches!(
            validate("  robot  "),
            Err(BridgeError::InvalidAddress(text)) if text == "robot"
        ));
    }
}
