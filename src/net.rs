use crate::config::{AddressFamily, Config};
use crate::{Error, Result};
use std::net::{SocketAddr, ToSocketAddrs};

/// Resolves the configured address and port into connect/bind candidates.
///
/// Candidates keep resolver order and are filtered to the configured family.
pub fn resolve(config: &Config) -> Result<Vec<SocketAddr>> {
    let candidates: Vec<SocketAddr> = (config.address.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| Error::Resolve(format!("{}:{}: {}", config.address, config.port, e)))?
        .filter(|addr| matches_family(addr, config.family))
        .collect();

    if candidates.is_empty() {
        return Err(Error::Resolve(format!(
            "no {:?} address for {}:{}",
            config.family, config.address, config.port
        )));
    }

    Ok(candidates)
}

fn matches_family(addr: &SocketAddr, family: AddressFamily) -> bool {
    match family {
        AddressFamily::Unspecified => true,
        AddressFamily::Ipv4 => addr.is_ipv4(),
        AddressFamily::Ipv6 => addr.is_ipv6(),
    }
}
