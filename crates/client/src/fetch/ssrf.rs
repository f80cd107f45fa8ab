//! SSRF (Server-Side Request Forgery) protection.
//!
//! Media URLs come straight from the query string. IP-literal hosts are
//! checked before the request and on every redirect hop; domain names are
//! checked by the resolver the HTTP client connects through.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

/// Error type for SSRF validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("URL has no host")]
    MissingHost,

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

impl From<SsrfError> for danmaku_core::Error {
    fn from(err: SsrfError) -> Self {
        danmaku_core::Error::FetchFailed(err.to_string())
    }
}

fn is_blocked_v4(v4: Ipv4Addr) -> bool {
    let [a, b, ..] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_multicast()
        || v4.is_broadcast()
        || v4.is_unspecified()
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// Covers loopback, RFC 1918, link-local, multicast, unspecified, CGNAT and
/// IPv6 unique-local ranges. IPv4-mapped IPv6 addresses are checked as IPv4.
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_blocked_v4(v4);
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validate that an IP address is not private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Reject a URL whose host is a blocked IP literal.
///
/// Domain names pass here; their addresses are checked by
/// [`GuardedResolver`] at connect time.
pub fn check_literal(url: &url::Url, blocked: fn(IpAddr) -> bool) -> Result<(), SsrfError> {
    let ip = match url.host() {
        Some(url::Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(url::Host::Ipv6(v6)) => IpAddr::V6(v6),
        Some(url::Host::Domain(_)) => return Ok(()),
        None => return Err(SsrfError::MissingHost),
    };
    if blocked(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// DNS resolver for reqwest that refuses names resolving to blocked
/// addresses.
///
/// The addresses it validates are the ones the connection uses, for the
/// first request and for every redirect hop.
#[derive(Debug, Clone, Copy)]
pub struct GuardedResolver {
    blocked: fn(IpAddr) -> bool,
}

impl GuardedResolver {
    pub fn new(blocked: fn(IpAddr) -> bool) -> Self {
        Self { blocked }
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_checked(name.as_str().to_string(), self.blocked))
    }
}

async fn resolve_checked(
    host: String, blocked: fn(IpAddr) -> bool,
) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await
        .map_err(|e| SsrfError::DnsError(e.to_string()))?
        .collect();
    if addrs.is_empty() {
        return Err(SsrfError::DnsError(format!("{host} resolved to no addresses")).into());
    }
    if let Some(addr) = addrs.iter().find(|a| blocked(a.ip())) {
        return Err(SsrfError::BlockedIp(addr.ip()).into());
    }
    Ok(Box::new(addrs.into_iter()))
}

/// Redirect policy that applies [`check_literal`] to every hop.
pub fn redirect_policy(max_redirects: usize, blocked: fn(IpAddr) -> bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("too many redirects (max {max_redirects})"));
        }
        if !matches!(attempt.url().scheme(), "http" | "https") {
            let msg = format!("redirect to unsupported scheme: {}", attempt.url().scheme());
            return attempt.error(msg);
        }
        match check_literal(attempt.url(), blocked) {
            Ok(()) => attempt.follow(),
            Err(e) => attempt.error(e),
        }
    })
}
