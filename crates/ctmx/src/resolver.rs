//! 🧭 Host resolution: turning `ctm-ag01` into something a ticket reader can click on.
//!
//! Alerts name hosts in whatever shape the agent was registered with: short names,
//! FQDNs, sometimes a datacenter alias. Downstream wants ip / fqdn / domain.
//! Resolution is best effort. A host we can't resolve still gets an alert. 🦆

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;

/// 📇 What we managed to learn about a host. Every field is optional because DNS is a mood.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub ip: Option<String>,
    pub fqdn: Option<String>,
    pub domain: Option<String>,
}

impl HostInfo {
    /// Build the fqdn/domain half from a name alone, no lookups.
    fn from_name(host: &str, default_domain: Option<&str>) -> Self {
        let fqdn = if host.contains('.') {
            host.to_string()
        } else {
            match default_domain {
                Some(domain) if !domain.is_empty() => format!("{host}.{domain}"),
                _ => host.to_string(),
            }
        };
        let domain = fqdn.split_once('.').map(|(_, d)| d.to_string());
        Self {
            ip: None,
            fqdn: Some(fqdn),
            domain,
        }
    }
}

/// 🔍 Anything that can turn a host name into a [`HostInfo`]. Never fails, only shrugs.
#[async_trait]
pub trait HostResolver: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, host: &str) -> HostInfo;
}

/// 🌐 Asks the operating system resolver. The FQDN is derived from the name and the
/// configured default domain, since reverse lookups through the OS are not a thing tokio offers.
#[derive(Debug, Clone, Default)]
pub struct SystemResolver {
    default_domain: Option<String>,
}

impl SystemResolver {
    pub fn new(default_domain: Option<String>) -> Self {
        Self { default_domain }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> HostInfo {
        let host = host.trim();
        if host.is_empty() {
            return HostInfo::default();
        }
        let mut info = HostInfo::from_name(host, self.default_domain.as_deref());
        let lookup_target = info.fqdn.clone().unwrap_or_else(|| host.to_string());

        // -- IPv4 first when we get both, it's what people paste into ssh
        match tokio::net::lookup_host((lookup_target.as_str(), 0)).await {
            Ok(addrs) => {
                let addrs: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
                info.ip = addrs
                    .iter()
                    .find(|ip| ip.is_ipv4())
                    .or_else(|| addrs.first())
                    .map(|ip| ip.to_string());
            }
            Err(err) => {
                debug!("🔍 Could not resolve '{}': {}. Moving on without an IP.", lookup_target, err);
            }
        }
        info
    }
}

/// 📒 A fixed name → ip table. No network, no surprises.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, String>,
    default_domain: Option<String>,
}

impl StaticResolver {
    pub fn new(default_domain: Option<String>) -> Self {
        Self {
            hosts: HashMap::new(),
            default_domain,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>, ip: impl Into<String>) -> Self {
        self.hosts.insert(host.into(), ip.into());
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> HostInfo {
        let host = host.trim();
        if host.is_empty() {
            return HostInfo::default();
        }
        let mut info = HostInfo::from_name(host, self.default_domain.as_deref());
        info.ip = self.hosts.get(host).cloned().or_else(|| {
            info.fqdn
                .as_ref()
                .and_then(|fqdn| self.hosts.get(fqdn).cloned())
        });
        info
    }
}
