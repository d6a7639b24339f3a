//! This service resolves the peer IP from the request.
//!
//! The resolved IP identifies the peer in the swarm and goes into the peer
//! lists handed to other clients, so getting it wrong poisons the swarm.
//!
//! Resolution rules:
//!
//! - Behind a reverse proxy (`on_reverse_proxy = true`): the right-most
//!   untrusted `X-Forwarded-For` hop wins; an explicit `ip` query parameter
//!   is the fallback.
//! - Directly exposed: the socket address wins. An explicit `ip` parameter
//!   pointing into a non-routable range is rejected (peers nobody could
//!   reach); a routable one is ignored in favor of the socket address.
use std::net::IpAddr;
use std::panic::Location;

use thiserror::Error;

/// The sources from which the peer IP can be obtained.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClientIpSources {
    /// The right-most IP from the `X-Forwarded-For` HTTP header.
    pub right_most_x_forwarded_for: Option<IpAddr>,
    /// The IP from the connection info.
    pub connection_info_ip: Option<IpAddr>,
    /// The IP the client claimed with an `ip` query parameter.
    pub query_param_ip: Option<IpAddr>,
}

/// The error that can occur when resolving the peer IP.
#[derive(Error, Debug)]
pub enum PeerIpResolutionError {
    #[error(
        "missing or invalid the right most X-Forwarded-For IP (mandatory on reverse proxy tracker configuration) in {location}"
    )]
    MissingRightMostXForwardedForIp { location: &'static Location<'static> },

    #[error("cannot get the client IP from the connection info in {location}")]
    MissingClientIp { location: &'static Location<'static> },

    #[error("the stated peer IP {ip} is not routable in {location}")]
    DisallowedStatedIp {
        ip: IpAddr,
        location: &'static Location<'static>,
    },
}

/// Resolves the peer IP from the request sources, following the rules in the
/// module documentation.
///
/// # Errors
///
/// Will return an error if the peer IP cannot be obtained according to the
/// configuration.
pub fn invoke(on_reverse_proxy: bool, client_ip_sources: &ClientIpSources) -> Result<IpAddr, PeerIpResolutionError> {
    if on_reverse_proxy {
        resolve_peer_ip_on_reverse_proxy(client_ip_sources)
    } else {
        resolve_peer_ip_without_reverse_proxy(client_ip_sources)
    }
}

fn resolve_peer_ip_on_reverse_proxy(sources: &ClientIpSources) -> Result<IpAddr, PeerIpResolutionError> {
    if let Some(ip) = sources.right_most_x_forwarded_for {
        return Ok(ip);
    }

    if let Some(ip) = sources.query_param_ip {
        return Ok(ip);
    }

    Err(PeerIpResolutionError::MissingRightMostXForwardedForIp {
        location: Location::caller(),
    })
}

fn resolve_peer_ip_without_reverse_proxy(sources: &ClientIpSources) -> Result<IpAddr, PeerIpResolutionError> {
    if let Some(stated_ip) = sources.query_param_ip {
        if !is_routable(&stated_ip) {
            return Err(PeerIpResolutionError::DisallowedStatedIp {
                ip: stated_ip,
                location: Location::caller(),
            });
        }
    }

    if let Some(ip) = sources.connection_info_ip {
        Ok(ip)
    } else {
        Err(PeerIpResolutionError::MissingClientIp {
            location: Location::caller(),
        })
    }
}

fn is_routable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => !(ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()),
        IpAddr::V6(ip) => !(ip.is_loopback() || ip.is_unspecified()),
    }
}
