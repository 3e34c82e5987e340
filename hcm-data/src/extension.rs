//! Vendor-specific extension columns.
//!
//! Resource tables keep vendor-only attributes in one JSON column. Rows carry
//! the column as an [`ExtensionBlob`] tagged with its vendor, and an
//! [`ExtensionRegistry`] registered at startup decodes it into the caller's
//! tagged union:
//!
//! ```ignore
//! enum SgExtension {
//!     TCloud(TCloudSgExtension),
//!     Aws(AwsSgExtension),
//! }
//!
//! let registry = ExtensionRegistry::new()
//!     .with_type(Vendor::TCloud, SgExtension::TCloud)
//!     .with_type(Vendor::Aws, SgExtension::Aws);
//! let ext: SgExtension = registry.decode(&row.extension)?;
//! ```

use std::fmt;

use hcm_core::{Vendor, VendorRegistry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DataError;

/// A vendor tag plus the undecoded extension JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionBlob {
    pub vendor: Vendor,
    #[serde(default)]
    pub raw: Value,
}

impl ExtensionBlob {
    pub fn new(vendor: Vendor, raw: Value) -> Self {
        Self { vendor, raw }
    }

    /// Encode a typed extension.
    pub fn encode<T: Serialize>(vendor: Vendor, ext: &T) -> Result<Self, DataError> {
        let raw = serde_json::to_value(ext)
            .map_err(|e| DataError::invalid(format!("encode {vendor} extension failed, err: {e}")))?;
        Ok(Self { vendor, raw })
    }

    /// Read the column text stored next to the row's vendor. Empty text is `{}`.
    pub fn from_column(vendor: Vendor, column: &str) -> Result<Self, DataError> {
        if column.trim().is_empty() {
            return Ok(Self::new(vendor, Value::Object(Default::default())));
        }
        let raw = serde_json::from_str(column)
            .map_err(|e| DataError::invalid(format!("{vendor} extension is not json, err: {e}")))?;
        Ok(Self { vendor, raw })
    }

    /// Column text of the raw JSON.
    pub fn to_column(&self) -> String {
        self.raw.to_string()
    }
}

type Decoder<E> = Box<dyn Fn(&Value) -> Result<E, serde_json::Error> + Send + Sync>;

/// Vendor → decoder map producing one tagged union `E`.
pub struct ExtensionRegistry<E> {
    decoders: VendorRegistry<Decoder<E>>,
}

impl<E> ExtensionRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: VendorRegistry::new(),
        }
    }

    pub fn register<F>(&mut self, vendor: Vendor, decoder: F)
    where
        F: Fn(&Value) -> Result<E, serde_json::Error> + Send + Sync + 'static,
    {
        self.decoders.register(vendor, Box::new(decoder));
    }

    /// Decode `vendor`'s JSON as `X` and wrap it into the union with `wrap`.
    pub fn register_type<X, W>(&mut self, vendor: Vendor, wrap: W)
    where
        X: DeserializeOwned + 'static,
        W: Fn(X) -> E + Send + Sync + 'static,
        E: 'static,
    {
        self.register(vendor, move |raw| X::deserialize(raw).map(&wrap));
    }

    pub fn with_type<X, W>(mut self, vendor: Vendor, wrap: W) -> Self
    where
        X: DeserializeOwned + 'static,
        W: Fn(X) -> E + Send + Sync + 'static,
        E: 'static,
    {
        self.register_type(vendor, wrap);
        self
    }

    pub fn supports(&self, vendor: Vendor) -> bool {
        self.decoders.contains(vendor)
    }

    /// Decode a blob; an unregistered vendor or a malformed body is an invalid parameter.
    pub fn decode(&self, blob: &ExtensionBlob) -> Result<E, DataError> {
        let decoder = self.decoders.get(blob.vendor)?;
        decoder(&blob.raw).map_err(|e| {
            DataError::invalid(format!(
                "decode {} extension failed, err: {e}",
                blob.vendor
            ))
        })
    }
}

impl<E> Default for ExtensionRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ExtensionRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut vendors: Vec<Vendor> = self.decoders.vendors().collect();
        vendors.sort();
        f.debug_struct("ExtensionRegistry")
            .field("vendors", &vendors)
            .finish()
    }
}
