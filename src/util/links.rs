use std::net::IpAddr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Invalid URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    Scheme(String),
    #[error("Refusing to open local or private address: {0}")]
    LocalAddress(String),
}

/// Check a repository web URL before handing it to the system browser.
///
/// Only `http`/`https` links to public hosts are allowed.
pub fn validate_url_for_open(raw: &str) -> Result<Url, LinkError> {
    let url = Url::parse(raw)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(LinkError::Scheme(url.scheme().to_string()));
    }

    match url.host() {
        None => return Err(LinkError::LocalAddress(raw.to_string())),
        Some(url::Host::Domain(d)) if d.eq_ignore_ascii_case("localhost") => {
            return Err(LinkError::LocalAddress(d.to_string()))
        }
        Some(url::Host::Ipv4(ip)) if is_local(IpAddr::V4(ip)) => {
            return Err(LinkError::LocalAddress(ip.to_string()))
        }
        Some(url::Host::Ipv6(ip)) if is_local(IpAddr::V6(ip)) => {
            return Err(LinkError::LocalAddress(ip.to_string()))
        }
        Some(_) => {}
    }

    Ok(url)
}

fn is_local(ip: IpAddr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}
