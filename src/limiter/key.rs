use crate::limiter::CallerContext;
use std::net::{IpAddr, Ipv6Addr};

/// Key shared by every caller whose identity cannot be resolved, so that
/// unidentifiable traffic is throttled as a single bucket instead of
/// failing the request.
pub const FALLBACK_KEY: &str = "unknown";

type CustomKeyFn = Box<dyn Fn(&CallerContext) -> Option<String> + Send + Sync>;

/// Utility to compose a key extraction strategy from request attributes.
///
/// Selected components that cannot be resolved for a request are skipped;
/// when none resolve the request is keyed under [FALLBACK_KEY]. The
/// produced extractor never fails.
///
/// You should take care to produce keys that are unique per store when
/// several limiters share one; see [KeyExtractorBuilder::prefix].
pub struct KeyExtractorBuilder {
    identity_key: bool,
    peer_ip_key: bool,
    prefix: Option<String>,
    custom_fn: Option<CustomKeyFn>,
}

impl KeyExtractorBuilder {
    pub fn new() -> Self {
        Self {
            identity_key: false,
            peer_ip_key: false,
            prefix: None,
            custom_fn: None,
        }
    }

    /// Adds the resolved caller identity (user id, API token, tenant) to
    /// the key.
    pub fn identity_key(mut self) -> Self {
        self.identity_key = true;
        self
    }

    /// Adds the caller's peer IP to the key.
    ///
    /// # IPv6
    ///
    /// IPv6 addresses are grouped into a single key per /64.
    pub fn peer_ip_key(mut self) -> Self {
        self.peer_ip_key = true;
        self
    }

    /// Adds a fixed component to the key, namespacing this limiter's
    /// entries within a shared store.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_owned());
        self
    }

    /// Dynamically adds a custom component to the key; return [None] when
    /// the component cannot be resolved for a request.
    pub fn custom_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallerContext) -> Option<String> + Send + Sync + 'static,
    {
        self.custom_fn = Some(Box::new(f));
        self
    }

    pub fn build(self) -> impl Fn(&CallerContext) -> String + Send + Sync + 'static {
        move |context| {
            let mut components = Vec::new();
            if let Some(prefix) = &self.prefix {
                components.push(prefix.clone());
            }
            if self.identity_key {
                if let Some(identity) = context.identity() {
                    components.push(identity.to_owned());
                }
            }
            if self.peer_ip_key {
                if let Some(addr) = context.peer_addr() {
                    components.push(ip_key(addr.ip()));
                }
            }
            if let Some(f) = &self.custom_fn {
                if let Some(component) = f(context) {
                    components.push(component);
                }
            }
            if components.is_empty() {
                return FALLBACK_KEY.to_owned();
            }
            components.join("-")
        }
    }
}

impl Default for KeyExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Groups IPv6 addresses together, see:
// https://adam-p.ca/blog/2022/02/ipv6-rate-limiting/
// https://support.cloudflare.com/hc/en-us/articles/115001635128-Configuring-Cloudflare-Rate-Limiting
fn ip_key(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4() {
                return v4.to_string();
            }
            let s = v6.segments();
            let subnet = Ipv6Addr::new(s[0], s[1], s[2], s[3], 0, 0, 0, 0);
            format!("{}/64", subnet)
        }
    }
}
