//! Admission sampling with always-inspect overrides.
//!
//! Decides whether a request enters the pipeline at all. Sampling is
//! probabilistic, but requests matching an always-inspect IP rule or route
//! pattern bypass the draw entirely. With a fixed seed the decision sequence
//! is fully deterministic, which the tests rely on.

use crate::domain::context::InspectionContext;
use crate::error::ConfigError;
use ipnetwork::IpNetwork;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::IpAddr;
use std::sync::Mutex;

/// Configuration for the admission filter.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Whether sampling applies at all; disabled means inspect everything
    pub enabled: bool,
    /// Probability in [0.0, 1.0] that a request is admitted
    pub rate: f64,
    /// Fixed RNG seed for reproducible sampling; None seeds from entropy
    pub seed: Option<u64>,
    /// IP rules that bypass sampling: exact ("10.0.0.1"), wildcard octets
    /// ("10.0.*.*") or CIDR ("10.0.0.0/16")
    pub always_inspect_ips: Vec<String>,
    /// Route patterns that bypass sampling: exact ("/admin") or trailing-star
    /// prefix ("/api/admin/*")
    pub always_inspect_routes: Vec<String>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 1.0,
            seed: None,
            always_inspect_ips: Vec::new(),
            always_inspect_routes: Vec::new(),
        }
    }
}

impl SamplingConfig {
    /// Validate rate and rule syntax.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.rate) || self.rate.is_nan() {
            return Err(ConfigError::InvalidSamplingRate(self.rate));
        }
        for rule in &self.always_inspect_ips {
            IpRule::parse(rule)?;
        }
        Ok(())
    }
}

/// A parsed always-inspect IP rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IpRule {
    Exact(IpAddr),
    Cidr(IpNetwork),
    /// IPv4 octet pattern; None is a `*` wildcard position.
    Wildcard([Option<u8>; 4]),
}

impl IpRule {
    fn parse(rule: &str) -> Result<Self, ConfigError> {
        if let Ok(ip) = rule.parse::<IpAddr>() {
            return Ok(IpRule::Exact(ip));
        }
        if rule.contains('/') {
            return rule
                .parse::<IpNetwork>()
                .map(IpRule::Cidr)
                .map_err(|_| ConfigError::InvalidIpRule(rule.to_string()));
        }
        if rule.contains('*') {
            let parts: Vec<&str> = rule.split('.').collect();
            if parts.len() != 4 {
                return Err(ConfigError::InvalidIpRule(rule.to_string()));
            }
            let mut octets = [None; 4];
            for (slot, part) in octets.iter_mut().zip(&parts) {
                *slot = match *part {
                    "*" => None,
                    other => Some(
                        other
                            .parse::<u8>()
                            .map_err(|_| ConfigError::InvalidIpRule(rule.to_string()))?,
                    ),
                };
            }
            return Ok(IpRule::Wildcard(octets));
        }
        Err(ConfigError::InvalidIpRule(rule.to_string()))
    }

    fn matches(&self, ip: IpAddr) -> bool {
        match self {
            IpRule::Exact(rule_ip) => *rule_ip == ip,
            IpRule::Cidr(network) => network.contains(ip),
            IpRule::Wildcard(octets) => match ip {
                IpAddr::V4(v4) => v4
                    .octets()
                    .iter()
                    .zip(octets)
                    .all(|(octet, pattern)| pattern.map_or(true, |p| p == *octet)),
                IpAddr::V6(_) => false,
            },
        }
    }
}

/// A parsed always-inspect route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RoutePattern {
    Exact(String),
    Prefix(String),
}

impl RoutePattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => RoutePattern::Prefix(prefix.to_string()),
            None => RoutePattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, route: &str) -> bool {
        match self {
            RoutePattern::Exact(exact) => route == exact,
            RoutePattern::Prefix(prefix) => route.starts_with(prefix.as_str()),
        }
    }
}

/// Gate deciding which requests enter the pipeline.
#[derive(Debug)]
pub struct AdmissionFilter {
    config: SamplingConfig,
    ip_rules: Vec<IpRule>,
    route_patterns: Vec<RoutePattern>,
    rng: Mutex<StdRng>,
}

impl AdmissionFilter {
    /// Build the filter, parsing all rules up front.
    pub fn new(config: SamplingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ip_rules = config
            .always_inspect_ips
            .iter()
            .map(|r| IpRule::parse(r))
            .collect::<Result<Vec<_>, _>>()?;
        let route_patterns = config
            .always_inspect_routes
            .iter()
            .map(|p| RoutePattern::parse(p))
            .collect();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            ip_rules,
            route_patterns,
            rng: Mutex::new(rng),
        })
    }

    /// Decide whether this request should be inspected.
    ///
    /// Overrides are checked before the probabilistic draw, so a matching
    /// request consumes no randomness.
    pub fn should_inspect(&self, context: &InspectionContext) -> bool {
        if !self.config.enabled {
            return true;
        }
        if let Some(ip) = context.ip {
            if self.ip_rules.iter().any(|rule| rule.matches(ip)) {
                return true;
            }
        }
        if let Some(route) = &context.route {
            if self.route_patterns.iter().any(|p| p.matches(route)) {
                return true;
            }
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>() < self.config.rate
    }
}
