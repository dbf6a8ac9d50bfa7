//! SSRF (Server-Side Request Forgery) validation for source asset URLs
//!
//! A URL is fetched only when its scheme is http(s), its host passes the
//! optional allowlist, and neither the literal host nor any address it
//! resolves to is private, loopback or otherwise internal.

use docmark_core::AppError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::net::lookup_host;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlRejection {
    #[error("Invalid URL: {0}")]
    Invalid(String),

    #[error("Only http and https URLs are allowed")]
    Scheme,

    #[error("Host '{0}' is not in the allowed list")]
    NotAllowlisted(String),

    #[error("Localhost and internal hostnames are not allowed")]
    InternalHost,

    #[error("Address {0} is private or internal")]
    PrivateAddress(IpAddr),

    #[error("Host '{0}' could not be resolved")]
    Unresolvable(String),
}

impl From<UrlRejection> for AppError {
    fn from(err: UrlRejection) -> Self {
        AppError::MalformedRequest(format!("URL validation failed: {}", err))
    }
}

/// Validate a URL before fetching it and return the parsed form.
pub async fn validate_url_for_ssrf(
    url: &str,
    allowlist: Option<&[String]>,
) -> Result<reqwest::Url, UrlRejection> {
    let parsed = reqwest::Url::parse(url).map_err(|e| UrlRejection::Invalid(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlRejection::Scheme);
    }

    // IPv6 literals come back bracketed
    let host = parsed
        .host_str()
        .ok_or_else(|| UrlRejection::Invalid("URL must have a host".to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_lowercase();

    if let Some(allowed) = allowlist {
        // Exact match or subdomain match (cdn.example.com matches example.com)
        let is_allowed = allowed.iter().map(|a| a.to_lowercase()).any(|a| {
            host == a || host.ends_with(&format!(".{}", a))
        });
        if !is_allowed {
            return Err(UrlRejection::NotAllowlisted(host));
        }
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(UrlRejection::PrivateAddress(ip));
        }
    } else if is_internal_hostname(&host) {
        return Err(UrlRejection::InternalHost);
    }

    // Resolved addresses are checked too, so DNS cannot point a public name inward
    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs = lookup_host((host.as_str(), port)).await.map_err(|e| {
        tracing::warn!(host = %host, error = %e, "Failed to resolve hostname for SSRF validation");
        UrlRejection::Unresolvable(host.clone())
    })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(UrlRejection::PrivateAddress(addr.ip()));
        }
    }

    Ok(parsed)
}

fn is_internal_hostname(host: &str) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
        || host.ends_with(".corp")
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_ipv4(&v4),
            None => is_private_ipv6(v6),
        },
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (64..=127).contains(&b))
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || first & 0xffc0 == 0xfe80 // fe80::/10 link-local
        || first & 0xfe00 == 0xfc00 // fc00::/7 unique local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_localhost_and_loopback() {
        for url in [
            "http://localhost/doc.pdf",
            "http://127.0.0.1/doc.pdf",
            "http://[::1]/doc.pdf",
            "http://[::ffff:127.0.0.1]/doc.pdf",
        ] {
            assert!(validate_url_for_ssrf(url, None).await.is_err(), "{}", url);
        }
    }

    #[tokio::test]
    async fn test_rejects_private_ranges() {
        for url in [
            "http://192.168.1.1/a.png",
            "http://10.0.0.1/a.png",
            "http://172.16.0.1/a.png",
            "http://169.254.169.254/latest/meta-data",
            "http://100.64.0.1/a.png",
        ] {
            assert!(matches!(
                validate_url_for_ssrf(url, None).await,
                Err(UrlRejection::PrivateAddress(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_rejects_internal_hostnames() {
        for url in [
            "http://printer.local/a.png",
            "http://service.corp/a.png",
            "http://metadata.internal/a.png",
        ] {
            assert_eq!(
                validate_url_for_ssrf(url, None).await,
                Err(UrlRejection::InternalHost)
            );
        }
    }

    #[tokio::test]
    async fn test_rejects_other_schemes() {
        for url in ["file:///etc/passwd", "ftp://example.com/file", "gopher://example.com"] {
            assert_eq!(
                validate_url_for_ssrf(url, None).await,
                Err(UrlRejection::Scheme)
            );
        }
    }

    #[tokio::test]
    async fn test_allowlist() {
        let allowlist = vec!["8.8.8.8".to_string(), "example.com".to_string()];

        assert!(validate_url_for_ssrf("https://8.8.8.8/a.png", Some(&allowlist))
            .await
            .is_ok());
        assert_eq!(
            validate_url_for_ssrf("https://evil.com/a.png", Some(&allowlist)).await,
            Err(UrlRejection::NotAllowlisted("evil.com".to_string()))
        );
        assert!(matches!(
            validate_url_for_ssrf("https://notexample.com/a.png", Some(&allowlist)).await,
            Err(UrlRejection::NotAllowlisted(_))
        ));
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(172, 31, 255, 1))));
        assert!(!is_private_ip(&IpAddr::V4(Ipv4Addr::new(172, 32, 0, 1))));
        assert!(!is_private_ip(&IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
        assert!(is_private_ip(&IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(!is_private_ip(&"2606:4700::1111".parse().unwrap()));
    }
}
