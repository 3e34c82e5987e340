//! Cloud vendors and the vendor → implementation strategy map.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A supported cloud vendor. Serialized by its lowercase wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vendor {
    #[serde(rename = "tcloud")]
    TCloud,
    #[serde(rename = "aws")]
    Aws,
    #[serde(rename = "gcp")]
    Gcp,
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "huawei")]
    HuaWei,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::TCloud,
        Vendor::Aws,
        Vendor::Gcp,
        Vendor::Azure,
        Vendor::HuaWei,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Vendor::TCloud => "tcloud",
            Vendor::Aws => "aws",
            Vendor::Gcp => "gcp",
            Vendor::Azure => "azure",
            Vendor::HuaWei => "huawei",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vendor::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ApiError::invalid_parameter(format!("unsupported vendor: {s}")))
    }
}

/// One implementation per vendor, registered once at startup and looked up
/// per call instead of matching on the vendor at every call site.
///
/// ```ignore
/// let mut rules = VendorRegistry::new();
/// rules.register(Vendor::TCloud, CascadeChild::new("tcloud_security_group_rule", "security_group_id"));
/// let child = rules.get(Vendor::TCloud)?;
/// ```
#[derive(Debug, Clone)]
pub struct VendorRegistry<T> {
    entries: HashMap<Vendor, T>,
}

impl<T> VendorRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `value` for `vendor`, returning the previous entry if any.
    pub fn register(&mut self, vendor: Vendor, value: T) -> Option<T> {
        self.entries.insert(vendor, value)
    }

    pub fn with(mut self, vendor: Vendor, value: T) -> Self {
        self.register(vendor, value);
        self
    }

    /// Look up the implementation; an unregistered vendor is an invalid parameter.
    pub fn get(&self, vendor: Vendor) -> Result<&T, ApiError> {
        self.entries
            .get(&vendor)
            .ok_or_else(|| ApiError::invalid_parameter(format!("vendor: {vendor} not support")))
    }

    pub fn contains(&self, vendor: Vendor) -> bool {
        self.entries.contains_key(&vendor)
    }

    pub fn vendors(&self) -> impl Iterator<Item = Vendor> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for VendorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn vendor_wire_names() {
        assert_eq!(serde_json::to_string(&Vendor::HuaWei).unwrap(), "\"huawei\"");
        let v: Vendor = serde_json::from_str("\"tcloud\"").unwrap();
        assert_eq!(v, Vendor::TCloud);
        assert_eq!("gcp".parse::<Vendor>().unwrap(), Vendor::Gcp);
        assert_eq!(
            "other".parse::<Vendor>().unwrap_err().code,
            ErrorCode::InvalidParameter
        );
    }

    #[test]
    fn registry_lookup() {
        let registry = VendorRegistry::new()
            .with(Vendor::Aws, "aws_security_group_rule")
            .with(Vendor::Azure, "azure_security_group_rule");
        assert_eq!(*registry.get(Vendor::Aws).unwrap(), "aws_security_group_rule");
        let err = registry.get(Vendor::Gcp).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert_eq!(registry.len(), 2);
    }
}
