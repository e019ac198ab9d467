//! The preference-bearing service and the proxy policy it must follow

use serde::Serialize;

use super::merge::{is_identifier, LineMatcher};
use super::value::{PrefValue, PreferenceSet};
use crate::compose::ServiceName;
use crate::error::{PortalError, Result};

pub const I2P_SERVICE: &str = "i2p-browser";
pub const I2P_PREFS_PATH: &str = "/config/firefox/i2p.default/user.js";
pub const PREF_KEYWORD: &str = "user_pref";

/// Where a preference file lives and how its lines are spelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceTarget {
    pub service: ServiceName,
    pub path: String,
    pub keyword: String,
}

impl PreferenceTarget {
    pub fn new(service: ServiceName, path: impl Into<String>, keyword: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let keyword = keyword.into();

        if !path.starts_with('/') {
            return Err(PortalError::InvalidPreference(format!(
                "preference path must be absolute: {}",
                path
            )));
        }
        if path.contains('\'') || path.chars().any(char::is_control) {
            return Err(PortalError::InvalidPreference(format!(
                "preference path contains unsupported characters: {:?}",
                path
            )));
        }
        if !is_identifier(&keyword) {
            return Err(PortalError::InvalidPreference(format!(
                "keyword {:?} is not an identifier",
                keyword
            )));
        }

        Ok(Self { service, path, keyword })
    }

    /// Firefox profile of the I2P browser container
    pub fn i2p_browser() -> Self {
        Self {
            service: ServiceName::new(I2P_SERVICE),
            path: I2P_PREFS_PATH.to_string(),
            keyword: PREF_KEYWORD.to_string(),
        }
    }

    pub fn matcher(&self) -> Result<LineMatcher> {
        LineMatcher::new(&self.keyword)
    }
}

/// Route all I2P browser traffic through the router's HTTP proxy
pub fn i2p_proxy_policy() -> Result<PreferenceSet> {
    PreferenceSet::from_entries([
        ("network.proxy.http", PrefValue::from("127.0.0.1")),
        ("network.proxy.http_port", PrefValue::from(4444_i64)),
        ("network.proxy.share_proxy_settings", PrefValue::from(false)),
        ("network.proxy.socks", PrefValue::from("")),
        ("network.proxy.socks_port", PrefValue::from(0_i64)),
        ("network.proxy.socks_version", PrefValue::from(5_i64)),
        ("network.proxy.ssl", PrefValue::from("127.0.0.1")),
        ("network.proxy.ssl_port", PrefValue::from(4444_i64)),
        ("network.proxy.type", PrefValue::from(1_i64)),
        ("network.proxy.no_proxies_on", PrefValue::from("localhost,127.0.0.1")),
        ("network.proxy.allow_hijacking_localhost", PrefValue::from(true)),
        ("network.proxy.socks_remote_dns", PrefValue::from(false)),
        ("media.peerconnection.ice.proxy_only", PrefValue::from(true)),
        ("keyword.enabled", PrefValue::from(false)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_order_and_types() {
        let policy = i2p_proxy_policy().unwrap();
        assert_eq!(policy.len(), 14);
        assert_eq!(policy.keys().next(), Some("network.proxy.http"));
        assert_eq!(policy.keys().last(), Some("keyword.enabled"));
        assert_eq!(policy.get("network.proxy.http_port"), Some(&PrefValue::Int(4444)));
        assert_eq!(policy.get("network.proxy.type"), Some(&PrefValue::Int(1)));
        assert_eq!(policy.get("keyword.enabled"), Some(&PrefValue::Bool(false)));
    }

    #[test]
    fn test_target_validation() {
        let svc = ServiceName::new("svc");
        assert!(PreferenceTarget::new(svc.clone(), "/a/user.js", "user_pref").is_ok());
        assert!(PreferenceTarget::new(svc.clone(), "relative/user.js", "user_pref").is_err());
        assert!(PreferenceTarget::new(svc.clone(), "/it's/user.js", "user_pref").is_err());
        assert!(PreferenceTarget::new(svc, "/a/user.js", "user pref").is_err());
    }

    #[test]
    fn test_i2p_target_is_valid() {
        let t = PreferenceTarget::i2p_browser();
        let rebuilt = PreferenceTarget::new(t.service.clone(), t.path.clone(), t.keyword.clone()).unwrap();
        assert_eq!(t, rebuilt);
    }
}
