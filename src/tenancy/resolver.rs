use axum::http::HeaderMap;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::TenancyConfig;
use crate::database::models::{normalize_subdomain, DomainType, Tenant};
use crate::database::StorageError;
use crate::services::tenant_directory::TenantDirectory;

const FORWARDED_HOST: &str = "x-forwarded-host";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Tenant directory unavailable: {0}")]
    Directory(#[from] StorageError),
}

/// Transport-level values a tenant can be identified from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSignals {
    pub requested_from: Option<String>,
    pub tenant_subdomain: Option<String>,
    pub host: Option<String>,
}

impl RequestSignals {
    pub fn from_headers(headers: &HeaderMap, settings: &TenancyConfig) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let forwarded = if settings.trust_forwarded_host {
            // Proxies may append; the client-facing host is the first entry
            header(FORWARDED_HOST).and_then(|v| v.split(',').next().map(str::to_string))
        } else {
            None
        };

        Self {
            requested_from: header(&settings.requested_from_header).and_then(|v| normalize_host(&v)),
            tenant_subdomain: header(&settings.subdomain_header).map(|v| v.to_ascii_lowercase()),
            host: forwarded
                .or_else(|| header("host"))
                .and_then(|v| normalize_host(&v)),
        }
    }
}

/// Lowercase, strip the port and any trailing dot
pub fn normalize_host(value: &str) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    let host = if let Some(rest) = value.strip_prefix('[') {
        // [v6]:port
        rest.split(']').next().unwrap_or_default().to_string()
    } else if value.matches(':').count() == 1 {
        value.split(':').next().unwrap_or_default().to_string()
    } else {
        value
    };
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    RequestedFrom,
    SubdomainHeader,
    HostCustomDomain,
    HostSubdomain,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Tenant { tenant: Tenant, via: ResolvedVia },
    NoTenant,
}

impl Resolution {
    pub fn tenant(&self) -> Option<&Tenant> {
        match self {
            Resolution::Tenant { tenant, .. } => Some(tenant),
            Resolution::NoTenant => None,
        }
    }
}

/// Determines the tenant a request belongs to.
///
/// Signals are tried in order: requested-from custom domain header, tenant
/// subdomain header, then the Host. A signal naming an unknown or inactive
/// tenant falls through to the next one; only directory failures are errors.
pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    settings: TenancyConfig,
}

impl TenantResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>, settings: TenancyConfig) -> Self {
        Self { directory, settings }
    }

    pub fn settings(&self) -> &TenancyConfig {
        &self.settings
    }

    pub async fn resolve(&self, signals: &RequestSignals) -> Result<Resolution, ResolveError> {
        if let Some(domain) = &signals.requested_from {
            match self.directory.find_by_custom_domain(domain).await? {
                Some(tenant) if tenant.is_active && tenant.domain_type == DomainType::Custom => {
                    return Ok(self.resolved(tenant, ResolvedVia::RequestedFrom));
                }
                _ => debug!(domain = %domain, "Requested-from header did not match an active custom-domain tenant"),
            }
        }

        if let Some(label) = &signals.tenant_subdomain {
            match self.directory.find_by_subdomain(label).await? {
                Some(tenant) if tenant.is_active => {
                    return Ok(self.resolved(tenant, ResolvedVia::SubdomainHeader));
                }
                _ => debug!(subdomain = %label, "Subdomain header did not match an active tenant"),
            }
        }

        // Bare IP hosts never identify a tenant
        if let Some(host) = signals.host.as_ref().filter(|h| h.parse::<IpAddr>().is_err()) {
            if host != &self.settings.base_domain {
                if let Some(tenant) = self.directory.find_by_custom_domain(host).await? {
                    if tenant.is_active {
                        return Ok(self.resolved(tenant, ResolvedVia::HostCustomDomain));
                    }
                }
            }

            if let Some(label) = self.host_label(host) {
                if let Some(tenant) = self.directory.find_by_subdomain(&label).await? {
                    if tenant.is_active {
                        return Ok(self.resolved(tenant, ResolvedVia::HostSubdomain));
                    }
                }
            }
        }

        debug!(host = ?signals.host, "No tenant for request");
        Ok(Resolution::NoTenant)
    }

    /// Subdomain label carried by `host`, if any.
    ///
    /// `<label>.<loopback>` always carries a label; otherwise a host needs at
    /// least three labels. Reserved labels and the bare platform domain never do.
    pub fn host_label(&self, host: &str) -> Option<String> {
        if host.parse::<IpAddr>().is_ok() || host == self.settings.base_domain {
            return None;
        }

        let loopback = &self.settings.dev_loopback_suffix;
        let label = match host.strip_suffix(loopback.as_str()).and_then(|rest| rest.strip_suffix('.')) {
            Some(rest) if !loopback.is_empty() && !rest.contains('.') => rest,
            _ => {
                let labels: Vec<&str> = host.split('.').collect();
                if labels.len() < 3 {
                    return None;
                }
                labels[0]
            }
        };

        if self.settings.is_reserved_label(label) {
            return None;
        }
        normalize_subdomain(label).ok()
    }

    fn resolved(&self, tenant: Tenant, via: ResolvedVia) -> Resolution {
        debug!(tenant = %tenant.subdomain, via = ?via, "Tenant resolved");
        Resolution::Tenant { tenant, via }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{custom_tenant, sample_tenant, MemoryTenantDirectory};
    use axum::http::HeaderValue;

    fn resolver(tenants: Vec<Tenant>) -> (TenantResolver, Arc<MemoryTenantDirectory>) {
        let directory = Arc::new(MemoryTenantDirectory::with_tenants(tenants));
        (TenantResolver::new(directory.clone(), TenancyConfig::default()), directory)
    }

    fn host(value: &str) -> RequestSignals {
        RequestSignals {
            host: Some(value.to_string()),
            ..RequestSignals::default()
        }
    }

    fn subdomain_of(resolution: &Resolution) -> Option<&str> {
        resolution.tenant().map(|t| t.subdomain.as_str())
    }

    #[test]
    fn signals_read_configured_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-requested-from", HeaderValue::from_static("HR.Acme.com"));
        headers.insert("x-tenant-subdomain", HeaderValue::from_static(" Acme "));
        headers.insert("host", HeaderValue::from_static("globex.platform.example:8080"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("initech.platform.example"));

        let signals = RequestSignals::from_headers(&headers, &TenancyConfig::default());
        assert_eq!(signals.requested_from.as_deref(), Some("hr.acme.com"));
        assert_eq!(signals.tenant_subdomain.as_deref(), Some("acme"));
        assert_eq!(signals.host.as_deref(), Some("globex.platform.example"));

        let trusting = TenancyConfig {
            trust_forwarded_host: true,
            ..TenancyConfig::default()
        };
        let signals = RequestSignals::from_headers(&headers, &trusting);
        assert_eq!(signals.host.as_deref(), Some("initech.platform.example"));
    }

    #[test]
    fn normalize_host_strips_ports() {
        assert_eq!(normalize_host("Acme.Platform.Example:443").as_deref(), Some("acme.platform.example"));
        assert_eq!(normalize_host("acme.platform.example.").as_deref(), Some("acme.platform.example"));
        assert_eq!(normalize_host("[::1]:3000").as_deref(), Some("::1"));
        assert_eq!(normalize_host("  "), None);
    }

    #[test]
    fn host_label_rules() {
        let (resolver, _) = resolver(vec![]);
        assert_eq!(resolver.host_label("acme.platform.example").as_deref(), Some("acme"));
        assert_eq!(resolver.host_label("acme.localhost").as_deref(), Some("acme"));
        assert_eq!(resolver.host_label("platform.example"), None);
        assert_eq!(resolver.host_label("example.com"), None);
        assert_eq!(resolver.host_label("www.platform.example"), None);
        assert_eq!(resolver.host_label("api.platform.example"), None);
        assert_eq!(resolver.host_label("admin.localhost"), None);
        assert_eq!(resolver.host_label("localhost"), None);
        assert_eq!(resolver.host_label("127.0.0.1"), None);
    }

    #[test]
    fn host_label_honors_configured_loopback_suffix() {
        let settings = TenancyConfig {
            dev_loopback_suffix: "dev.test".to_string(),
            ..TenancyConfig::default()
        };
        let resolver = TenantResolver::new(Arc::new(MemoryTenantDirectory::new()), settings);

        assert_eq!(resolver.host_label("acme.dev.test").as_deref(), Some("acme"));
        assert_eq!(resolver.host_label("admin.dev.test"), None);
        assert_eq!(resolver.host_label("dev.test"), None);
        // The default suffix is no longer special
        assert_eq!(resolver.host_label("acme.localhost"), None);
        assert_eq!(resolver.host_label("acme.platform.example").as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn requested_from_ignores_tenant_not_using_its_custom_domain() {
        let mut initech = custom_tenant("initech", "hr.initech.com");
        initech.domain_type = DomainType::Subdomain;
        let (resolver, _) = resolver(vec![initech, sample_tenant("acme"), sample_tenant("globex")]);

        let signals = RequestSignals {
            requested_from: Some("hr.initech.com".to_string()),
            tenant_subdomain: Some("acme".to_string()),
            host: Some("globex.platform.example".to_string()),
        };
        let resolution = resolver.resolve(&signals).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("acme"));
        assert!(matches!(resolution, Resolution::Tenant { via: ResolvedVia::SubdomainHeader, .. }));

        let signals = RequestSignals {
            tenant_subdomain: None,
            ..signals
        };
        let resolution = resolver.resolve(&signals).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("globex"));
        assert!(matches!(resolution, Resolution::Tenant { via: ResolvedVia::HostSubdomain, .. }));
    }

    #[tokio::test]
    async fn subdomain_header_resolves_tenant() {
        let (resolver, _) = resolver(vec![sample_tenant("acme")]);
        let signals = RequestSignals {
            tenant_subdomain: Some("acme".to_string()),
            host: Some("platform.example".to_string()),
            ..RequestSignals::default()
        };

        let resolution = resolver.resolve(&signals).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("acme"));
        assert!(matches!(resolution, Resolution::Tenant { via: ResolvedVia::SubdomainHeader, .. }));
    }

    #[tokio::test]
    async fn host_fallback_resolves_subdomain() {
        let (resolver, _) = resolver(vec![sample_tenant("acme")]);
        let resolution = resolver.resolve(&host("acme.platform.example")).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("acme"));
        assert!(matches!(resolution, Resolution::Tenant { via: ResolvedVia::HostSubdomain, .. }));
    }

    #[tokio::test]
    async fn bare_and_reserved_hosts_have_no_tenant() {
        let (resolver, _) = resolver(vec![sample_tenant("acme"), sample_tenant("www")]);
        for value in ["platform.example", "www.platform.example", "127.0.0.1"] {
            assert_eq!(resolver.resolve(&host(value)).await.unwrap(), Resolution::NoTenant, "{}", value);
        }
        assert_eq!(resolver.resolve(&RequestSignals::default()).await.unwrap(), Resolution::NoTenant);
    }

    #[tokio::test]
    async fn requested_from_takes_precedence() {
        let (resolver, _) = resolver(vec![
            sample_tenant("acme"),
            sample_tenant("globex"),
            custom_tenant("initech", "hr.initech.com"),
        ]);
        let signals = RequestSignals {
            requested_from: Some("hr.initech.com".to_string()),
            tenant_subdomain: Some("acme".to_string()),
            host: Some("globex.platform.example".to_string()),
        };

        let resolution = resolver.resolve(&signals).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("initech"));
        assert!(matches!(resolution, Resolution::Tenant { via: ResolvedVia::RequestedFrom, .. }));
    }

    #[tokio::test]
    async fn stale_headers_fall_through_to_host() {
        let mut inactive = sample_tenant("acme");
        inactive.is_active = false;
        let (resolver, _) = resolver(vec![inactive, sample_tenant("globex")]);
        let signals = RequestSignals {
            requested_from: Some("unknown.example.com".to_string()),
            tenant_subdomain: Some("acme".to_string()),
            host: Some("globex.platform.example".to_string()),
        };

        let resolution = resolver.resolve(&signals).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("globex"));
    }

    #[tokio::test]
    async fn inactive_tenant_is_never_resolved() {
        let mut inactive = sample_tenant("acme");
        inactive.is_active = false;
        let (resolver, _) = resolver(vec![inactive]);
        let resolution = resolver.resolve(&host("acme.platform.example")).await.unwrap();
        assert_eq!(resolution, Resolution::NoTenant);
    }

    #[tokio::test]
    async fn host_matching_custom_domain() {
        let (resolver, _) = resolver(vec![custom_tenant("initech", "hr.initech.com")]);
        let resolution = resolver.resolve(&host("hr.initech.com")).await.unwrap();
        assert_eq!(subdomain_of(&resolution), Some("initech"));
        assert!(matches!(resolution, Resolution::Tenant { via: ResolvedVia::HostCustomDomain, .. }));
    }

    #[tokio::test]
    async fn directory_failure_is_an_error() {
        let (resolver, directory) = resolver(vec![sample_tenant("acme")]);
        directory.fail_lookups(true);
        let result = resolver.resolve(&host("acme.platform.example")).await;
        assert!(matches!(result, Err(ResolveError::Directory(_))));

        // IP and bare-domain hosts never reach the directory
        assert_eq!(resolver.resolve(&host("10.0.0.5")).await.unwrap(), Resolution::NoTenant);
        assert_eq!(resolver.resolve(&host("platform.example")).await.unwrap(), Resolution::NoTenant);
    }
}
