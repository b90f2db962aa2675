use std::net::IpAddr;

use url::Url;

/// Validate a caller-supplied URL before any server-side fetch.
/// Rejects non-http(s) schemes, localhost, private and link-local address
/// ranges, and cloud metadata hostnames. Hostnames that *resolve* to private
/// addresses are not caught here; this guards the obvious literal cases
/// (including the 169.254.169.254 metadata service) before a request leaves
/// the process.
pub fn is_valid_external_url(raw: &str) -> bool {
    let parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }

    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return false,
    };

    if host == "localhost"
        || host == "metadata.google.internal"
        || host.ends_with(".internal")
        || host.ends_with(".local")
    {
        return false;
    }

    // Literal IP addresses: reject anything that isn't globally routable.
    let ip_literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = ip_literal.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => {
                !(v4.is_loopback()
                    || v4.is_private()
                    || v4.is_link_local()
                    || v4.is_unspecified()
                    || v4.is_broadcast())
            }
            IpAddr::V6(v6) => {
                !(v6.is_loopback()
                    || v6.is_unspecified()
                    // fc00::/7 unique-local, fe80::/10 link-local
                    || (v6.segments()[0] & 0xfe00) == 0xfc00
                    || (v6.segments()[0] & 0xffc0) == 0xfe80)
            }
        };
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_public_urls() {
        assert!(is_valid_external_url("https://example.com/image.jpg"));
        assert!(is_valid_external_url("http://news.example.org/a?b=c"));
        assert!(is_valid_external_url("https://93.184.216.34/img.png"));
    }

    #[test]
    fn rejects_metadata_service() {
        assert!(!is_valid_external_url("http://169.254.169.254/"));
        assert!(!is_valid_external_url(
            "http://metadata.google.internal/computeMetadata/v1/"
        ));
    }

    #[test]
    fn rejects_localhost_and_loopback() {
        assert!(!is_valid_external_url("http://localhost/x"));
        assert!(!is_valid_external_url("http://127.0.0.1:8080/x"));
        assert!(!is_valid_external_url("http://[::1]/x"));
    }

    #[test]
    fn rejects_private_ranges() {
        assert!(!is_valid_external_url("http://10.0.0.5/x"));
        assert!(!is_valid_external_url("http://192.168.1.1/x"));
        assert!(!is_valid_external_url("http://172.16.0.1/x"));
        assert!(!is_valid_external_url("http://172.31.255.255/x"));
    }

    #[test]
    fn allows_public_172_addresses() {
        // 172.32.0.0 is outside 172.16.0.0/12
        assert!(is_valid_external_url("http://172.32.0.1/x"));
    }

    #[test]
    fn rejects_internal_hostnames() {
        assert!(!is_valid_external_url("http://db.prod.internal/x"));
        assert!(!is_valid_external_url("http://printer.local/x"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_valid_external_url("file:///etc/passwd"));
        assert!(!is_valid_external_url("ftp://example.com/x"));
        assert!(!is_valid_external_url("gopher://example.com/x"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(!is_valid_external_url("not a url"));
        assert!(!is_valid_external_url(""));
    }
}
