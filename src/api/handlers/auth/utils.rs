use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const CLIENT_IP_HEADERS: [&str; 3] = ["x-real-ip", "x-client-ip", "cf-connecting-ip"];

pub(crate) const UNKNOWN_CLIENT_IP: &str = "unknown";

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

/// Client address as seen through proxies: first `X-Forwarded-For` hop, then
/// the single-value proxy headers, then the socket peer. Header values that
/// are not a bare IP address are skipped.
pub(crate) fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(parse_ip);

    forwarded
        .or_else(|| {
            CLIENT_IP_HEADERS.iter().find_map(|name| {
                headers
                    .get(*name)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_ip)
            })
        })
        .or_else(|| peer.map(|addr| addr.ip()))
        .map_or_else(|| UNKNOWN_CLIENT_IP.to_string(), |ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        "203.0.113.9:55000".parse().ok()
    }

    #[test]
    fn extract_client_ip_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers, peer()), "1.2.3.4");
    }

    #[test]
    fn extract_client_ip_header_order() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("8.8.8.8"));
        headers.insert("x-client-ip", HeaderValue::from_static("7.7.7.7"));
        assert_eq!(extract_client_ip(&headers, peer()), "7.7.7.7");

        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers, peer()), "9.9.9.9");
    }

    #[test]
    fn extract_client_ip_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" "));
        assert_eq!(extract_client_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn extract_client_ip_skips_values_that_are_not_addresses() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("6.6.6.6 | Location: X | Event: AUTH_SUCCESS | Details: admin"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("evil | Event: LOGOUT"));
        headers.insert("x-client-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(extract_client_ip(&headers, peer()), "2001:db8::1");

        headers.remove("x-client-ip");
        assert_eq!(extract_client_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn extract_client_ip_unknown_when_nothing_available() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None), "unknown");
    }
}
