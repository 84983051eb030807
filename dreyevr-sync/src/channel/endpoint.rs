// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::io::{Error, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

const SCHEME: &str = "tcp://";

/// TCP endpoint in `tcp://<host>:<port>` form
///
/// The host `*` stands for all IPv4 interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to a socket address, preferring IPv4
    pub fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        if self.host == "*" {
            return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)));
        }
        let candidates: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        candidates
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("cannot resolve {self}")))
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SCHEME}{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::new(ErrorKind::InvalidInput, format!("{reason}: '{s}'"));

        let address = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| invalid("endpoint must start with tcp://"))?;
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| invalid("endpoint has no port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("endpoint has no host"));
        }
        let port = port.parse().map_err(|_| invalid("invalid port"))?;
        Ok(Endpoint {
            host: host.to_owned(),
            port,
        })
    }
}
