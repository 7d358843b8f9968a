//! The crate error type.

use std::fmt;
use std::io;
use std::net::IpAddr;

/// Errors reported by the library.
#[derive(Debug)]
pub enum Error {
    /// An underlying stream failed to read or write.
    Io(io::Error),
    /// A malformed binary set was encountered.
    Parse(String),
    /// A string could not be parsed as an IP address or network.
    InvalidAddress(String),
    /// A network has address bits set beyond its prefix.
    InvalidNetwork { addr: IpAddr, cidr: u8 },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::InvalidAddress(s) => write!(f, "Invalid address: {}", s),
            Error::InvalidNetwork { addr, cidr } => {
                write!(f, "Invalid network: {}/{} has address bits beyond the prefix", addr, cidr)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = Error::parse("bad magic");
        assert_eq!(e.to_string(), "Parse error: bad magic");

        let e = Error::InvalidNetwork { addr: "10.0.0.1".parse().unwrap(), cidr: 8 };
        assert!(e.to_string().contains("10.0.0.1/8"));
    }
}
