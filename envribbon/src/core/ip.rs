use std::fmt;

/// Observable state of the public IP lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IpStatus {
    #[default]
    Checking,
    Address(String),
    NoConnection,
    Unreachable,
}

impl IpStatus {
    pub fn address(&self) -> Option<&str> {
        match self {
            IpStatus::Address(ip) => Some(ip),
            _ => None,
        }
    }
}

impl fmt::Display for IpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpStatus::Checking => write!(f, "Checking..."),
            IpStatus::Address(ip) => write!(f, "{}", ip),
            IpStatus::NoConnection => write!(f, "No Connection"),
            IpStatus::Unreachable => write!(f, "Unable to check"),
        }
    }
}

/// Dotted-quad check: exactly four decimal parts, each in 0..=255.
pub fn is_valid_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() <= 3
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().is_ok_and(|n| n <= 255)
    })
}

/// Extract the address from a lookup service body.
/// Accepts `{"ip": "..."}` JSON, otherwise a bare dotted quad.
pub fn parse_ip_body(body: &str) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        return map
            .get("ip")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);
    }

    let text = body.trim();
    is_valid_ipv4(text).then(|| text.to_string())
}
