//! The multi-site relay module.
//!
//! Joins independently clustered sites into one logical group. The relay
//! knows every site by name; the local site's config carries the bridges
//! over which traffic to remote sites flows.
//!
//! # Fields
//!
//! | name                     | type  | default |
//! |--------------------------|-------|---------|
//! | `relay_multicasts`       | bool  | true    |
//! | `async_relay_creation`   | bool  | true    |
//! | `can_become_site_master` | bool  | true    |
//! | `max_site_masters`       | usize | 1       |

use crate::site::{BridgeConfig, SiteConfig};
use corelib::properties::RELAY;
use corelib::{Error, Protocol, Result};
use std::any::Any;
use std::str::FromStr;

/// Relay module placed above the configured protocols.
#[derive(Clone, Debug)]
pub struct RelayProtocol {
    site: String,
    sites: Vec<SiteConfig>,
    relay_multicasts: bool,
    async_relay_creation: bool,
    can_become_site_master: bool,
    max_site_masters: usize,
    initialized: bool,
}

impl RelayProtocol {
    /// Create a relay for the given local site.
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            sites: Vec::new(),
            relay_multicasts: true,
            async_relay_creation: true,
            can_become_site_master: true,
            max_site_masters: 1,
            initialized: false,
        }
    }

    /// Name of the local site.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Register a site, replacing an existing config of that name in place.
    pub fn add_site(&mut self, config: SiteConfig) {
        match self.sites.iter_mut().find(|s| s.name() == config.name()) {
            Some(existing) => *existing = config,
            None => self.sites.push(config),
        }
    }

    /// Site configs in registration order.
    pub fn sites(&self) -> &[SiteConfig] {
        &self.sites
    }

    pub fn site_config(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name() == name)
    }

    /// Bridges of the local site.
    pub fn bridges(&self) -> &[BridgeConfig] {
        self.site_config(&self.site)
            .map(SiteConfig::bridges)
            .unwrap_or_default()
    }

    pub fn relay_multicasts(&self) -> bool {
        self.relay_multicasts
    }

    pub fn async_relay_creation(&self) -> bool {
        self.async_relay_creation
    }

    pub fn can_become_site_master(&self) -> bool {
        self.can_become_site_master
    }

    pub fn max_site_masters(&self) -> usize {
        self.max_site_masters
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn parse<T: FromStr>(&self, name: &str, value: &str) -> Result<T> {
        value.trim().parse().map_err(|_| Error::InvalidProperty {
            protocol: RELAY.to_string(),
            property: name.to_string(),
            value: value.to_string(),
        })
    }
}

impl Protocol for RelayProtocol {
    fn name(&self) -> &str {
        RELAY
    }

    fn has_property(&self, name: &str) -> bool {
        matches!(
            name,
            "relay_multicasts"
                | "async_relay_creation"
                | "can_become_site_master"
                | "max_site_masters"
        )
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "relay_multicasts" => self.relay_multicasts = self.parse(name, value)?,
            "async_relay_creation" => self.async_relay_creation = self.parse(name, value)?,
            "can_become_site_master" => self.can_become_site_master = self.parse(name, value)?,
            "max_site_masters" => self.max_site_masters = self.parse(name, value)?,
            _ => {
                return Err(Error::UnknownProperty {
                    protocol: RELAY.to_string(),
                    property: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        if self.site_config(&self.site).is_none() {
            return Err(Error::Init {
                protocol: RELAY.to_string(),
                reason: format!("local site {} has no site config", self.site),
            });
        }
        if self.max_site_masters == 0 {
            return Err(Error::Init {
                protocol: RELAY.to_string(),
                reason: "max_site_masters must be at least 1".to_string(),
            });
        }
        self.initialized = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_fields() {
        let mut relay = RelayProtocol::new("LON");
        relay.set_property("max_site_masters", "3").unwrap();
        relay.set_property("relay_multicasts", "false").unwrap();

        assert_eq!(relay.max_site_masters(), 3);
        assert!(!relay.relay_multicasts());
        assert!(matches!(
            relay.set_property("max_site_masters", "many"),
            Err(Error::InvalidProperty { .. })
        ));
        assert!(matches!(
            relay.set_property("site_master_picker", "x"),
            Err(Error::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_init_requires_local_site() {
        let mut relay = RelayProtocol::new("LON");
        assert!(matches!(relay.init(), Err(Error::Init { .. })));

        relay.add_site(SiteConfig::new("LON"));
        relay.init().unwrap();
        assert!(relay.is_initialized());
    }

    #[test]
    fn test_add_site_replaces_in_place() {
        let mut relay = RelayProtocol::new("LON");
        relay.add_site(SiteConfig::new("LON"));
        relay.add_site(SiteConfig::new("NYC"));
        relay.add_site(SiteConfig::new("LON"));

        let names: Vec<_> = relay.sites().iter().map(SiteConfig::name).collect();
        assert_eq!(names, vec!["LON", "NYC"]);
    }
}
