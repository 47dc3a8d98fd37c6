//! Static product reference data keyed by SKU.
//!
//! The catalog is a CSV file with the header `sku,name,link,thumbnail`. It is
//! loaded once at startup and shared read-only by every monitor worker.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub sku: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub link: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: HashMap<String, ProductInfo>,
}

impl ProductCatalog {
    #[must_use]
    pub fn get(&self, sku: &str) -> Option<&ProductInfo> {
        self.products.get(sku)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Returns the SKUs from `skus` that have no catalog entry.
    #[must_use]
    pub fn missing<'a>(&self, skus: &'a [String]) -> Vec<&'a str> {
        skus.iter()
            .filter(|sku| !self.products.contains_key(sku.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Parse a catalog from any CSV reader.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProductsFileParse`] on malformed CSV and
    /// [`ConfigError::Validation`] on an empty or duplicate SKU.
    pub fn from_reader<R: Read>(reader: R, origin: &str) -> Result<Self, ConfigError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut products = HashMap::new();
        for record in rdr.deserialize::<ProductInfo>() {
            let product = record.map_err(|e| ConfigError::ProductsFileParse {
                path: origin.to_string(),
                source: e,
            })?;

            if product.sku.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{origin}: product '{}' has an empty sku",
                    product.display_name
                )));
            }
            if products.contains_key(&product.sku) {
                return Err(ConfigError::Validation(format!(
                    "{origin}: duplicate sku '{}'",
                    product.sku
                )));
            }
            products.insert(product.sku.clone(), product);
        }

        Ok(Self { products })
    }
}

impl FromIterator<ProductInfo> for ProductCatalog {
    fn from_iter<I: IntoIterator<Item = ProductInfo>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().map(|p| (p.sku.clone(), p)).collect(),
        }
    }
}

/// Load the product catalog from a CSV file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_product_catalog(path: &Path) -> Result<ProductCatalog, ConfigError> {
    let file = std::fs::File::open(path).map_err(|e| ConfigError::ProductsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    ProductCatalog::from_reader(file, &path.display().to_string())
}
