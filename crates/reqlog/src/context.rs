//! Request head accessors used by the default field producers

use http::header::USER_AGENT;
use http::request::Parts;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Remote peer address of the connection a request arrived on
///
/// hyper does not attach the peer address to requests, so hosts insert this
/// into the request extensions when accepting the connection:
///
/// ```rust,ignore
/// let (stream, remote_addr) = listener.accept().await?;
/// // ...
/// req.extensions_mut().insert(ClientAddr(remote_addr));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Client IP of the request
///
/// Looks for [`ClientAddr`] first, then a bare `SocketAddr` extension.
/// Falls back to the unspecified address when the host provided neither.
pub fn client_ip(parts: &Parts) -> IpAddr {
    parts
        .extensions
        .get::<ClientAddr>()
        .map(|addr| addr.0.ip())
        .or_else(|| parts.extensions.get::<SocketAddr>().map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Request URI as received: path plus query
pub fn request_uri(parts: &Parts) -> &str {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path())
}

/// Non-empty `User-Agent` header, lossily decoded
pub fn user_agent(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(USER_AGENT)
        .map(|v| v.as_bytes())
        .filter(|v| !v.is_empty())
        .map(|v| String::from_utf8_lossy(v).into_owned())
}
