use crate::probes::{self, Probe};
use crate::core::target::TargetDescriptor;

/// Static catalog of every probe, in registration order. Built once at
/// startup and read-only afterwards; registration order is report order.
pub struct ProbeRegistry {
    probes: Vec<Box<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn empty() -> Self {
        Self { probes: Vec::new() }
    }

    /// The full catalog. Order here is the contract: reports list results in
    /// exactly this sequence.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(probes::access::PublicAccess));
        registry.register(Box::new(probes::tls::CertValidation));
        registry.register(Box::new(probes::redirect::RedirectCheck));
        registry.register(Box::new(probes::headers::HeadersContent));
        registry.register(Box::new(probes::headers::HttpHead));
        registry.register(Box::new(probes::latency::LatencyCheck));
        registry.register(Box::new(probes::dns::DnsRecords));
        registry.register(Box::new(probes::headers::CorsCheck));
        registry.register(Box::new(probes::headers::HstsCheck));
        registry.register(Box::new(probes::headers::UserAgentVariation));
        registry.register(Box::new(probes::image::ImageValidity));
        registry.register(Box::new(probes::image::ImageMetadata));
        registry.register(Box::new(probes::encoding::ContentEncoding));
        registry.register(Box::new(probes::proxy::ProxyDetection));
        registry.register(Box::new(probes::dns::NetworkDiagnostics));
        registry.register(Box::new(probes::api::ApiJsonRequest));
        registry.register(Box::new(probes::api::RateLimitTest));
        registry.register(Box::new(probes::api::ApiAuthentication));
        registry
    }

    /// Registering two probes under one identity is a programming error, not
    /// a runtime condition; fail at startup.
    pub fn register(&mut self, probe: Box<dyn Probe>) {
        if self.probes.iter().any(|p| p.identity() == probe.identity()) {
            panic!("duplicate probe identity registered: {}", probe.identity());
        }
        self.probes.push(probe);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Probe> {
        self.probes.iter().map(|p| p.as_ref())
    }

    pub fn get(&self, identity: &str) -> Option<&dyn Probe> {
        self.probes
            .iter()
            .find(|p| p.identity() == identity)
            .map(|p| p.as_ref())
    }

    pub fn identities(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.identity()).collect()
    }

    pub fn applicable_identities(&self, target: &TargetDescriptor) -> Vec<&'static str> {
        self.probes
            .iter()
            .filter(|p| p.applicable(target))
            .map(|p| p.identity())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}
