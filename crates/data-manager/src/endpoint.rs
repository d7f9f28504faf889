//! Endpoint validation for outbound content-API requests
//!
//! Every request path is joined onto the configured base URL and must stay
//! under it. Violations are returned as errors and never downgraded.

use std::net::{Ipv4Addr, Ipv6Addr};

use spacetechs_shared::ApiError;
use url::{Host, Url};

/// Join `endpoint` onto `base`, rejecting anything that could leave the
/// configured origin or reach a private network not in `allowlist`
pub fn resolve(base: &Url, endpoint: &str, allowlist: &[String]) -> Result<Url, ApiError> {
    let result = check_endpoint(endpoint).and_then(|()| join(base, endpoint, allowlist));
    if let Err(err) = &result {
        log::warn!("Rejected content-API endpoint {:?}: {}", endpoint, err);
    }
    result
}

fn check_endpoint(endpoint: &str) -> Result<(), ApiError> {
    if endpoint.trim().is_empty() {
        return Err(ApiError::invalid_endpoint(endpoint, "endpoint is empty"));
    }
    if endpoint.contains("://") {
        return Err(ApiError::invalid_endpoint(endpoint, "absolute URLs not allowed"));
    }
    if endpoint.starts_with("//") {
        return Err(ApiError::invalid_endpoint(
            endpoint,
            "protocol-relative URLs not allowed",
        ));
    }
    if endpoint.contains('\\') {
        return Err(ApiError::invalid_endpoint(endpoint, "backslashes not allowed"));
    }
    if !endpoint.starts_with('/') {
        return Err(ApiError::invalid_endpoint(endpoint, "endpoint must start with '/'"));
    }

    let path = endpoint.split(['?', '#']).next().unwrap_or_default();
    let traverses = path.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == ".." || segment == "."
    });
    if traverses {
        return Err(ApiError::invalid_endpoint(endpoint, "path traversal not allowed"));
    }

    Ok(())
}

fn join(base: &Url, endpoint: &str, allowlist: &[String]) -> Result<Url, ApiError> {
    let base_path = base.path().trim_end_matches('/');
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), endpoint);

    let url = Url::parse(&joined)
        .map_err(|e| ApiError::invalid_endpoint(endpoint, format!("invalid URL format: {}", e)))?;

    if url.origin() != base.origin() || !url.path().starts_with(base_path) {
        return Err(ApiError::OriginMismatch {
            url: url.to_string(),
        });
    }

    if let Some(host) = url.host() {
        if is_private_host(&host) {
            let name = host.to_string();
            let allowed = allowlist.iter().any(|h| h.eq_ignore_ascii_case(&name));
            if !allowed {
                return Err(ApiError::PrivateNetworkDenied { host: name });
            }
        }
    }

    Ok(url)
}

/// Loopback, private, link-local and unspecified addresses plus `localhost`
pub fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_v4(ip),
        Host::Ipv6(ip) => is_private_v6(ip),
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(&v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
