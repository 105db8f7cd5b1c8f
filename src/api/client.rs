use std::net::{IpAddr, SocketAddr};

use axum::http::{header::USER_AGENT, HeaderMap};

/// First `X-Forwarded-For` hop that parses as an IP address, else the
/// socket peer. Hops that are not IP addresses are skipped.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .split(',')
                .find_map(|hop| hop.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
}

pub fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}
