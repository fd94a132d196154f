//! Fixtures
//!
//! Load catalogs and stored carts from YAML files, referring to products and sets
//! by readable keys instead of UUIDs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    cart::{OwnerContext, PurchaseMode},
    catalog::InMemoryCatalog,
    ids::{LineUuid, SetUuid},
    persistence::{StoredBreakdown, StoredCartLine},
    prices::{PriceParseError, parse_price},
    products::{Product, ProductSet},
    solvers::{SolverError, price_line},
};

pub mod carts;
pub mod catalog;

use carts::{CartFixture, CartLineFixture};
use catalog::CatalogFixture;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,

        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price or currency
    #[error(transparent)]
    Price(#[from] PriceParseError),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No products loaded yet
    #[error("No products loaded yet; currency unknown")]
    NoCurrency,

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Set not found
    #[error("Set {set} not found on product {product}")]
    SetNotFound {
        /// Product key
        product: String,

        /// Set key
        set: String,
    },

    /// A line without a stored price could not be priced
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// A stored cart loaded from a fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCart {
    /// Owner the cart was stored for
    pub owner: OwnerContext,

    /// Lines as they would come out of storage
    pub lines: Vec<StoredCartLine>,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Products by key
    products: FxHashMap<String, Product>,

    /// (product key, set key) -> set id
    set_keys: FxHashMap<(String, String), SetUuid>,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            products: FxHashMap::default(),
            set_keys: FxHashMap::default(),
            currency: None,
        }
    }

    /// Load products from `<base>/catalog/<name>.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are currency mismatches.
    pub fn load_catalog(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let path = self.base_path.join("catalog").join(format!("{name}.yml"));

        self.load_catalog_file(&path)
    }

    /// Load products from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are currency mismatches.
    pub fn load_catalog_file(&mut self, path: &Path) -> Result<&mut Self, FixtureError> {
        let fixture: CatalogFixture = serde_norway::from_str(&read(path)?)?;

        for (key, product_fixture) in fixture.products {
            let (product, set_keys) = product_fixture.into_product()?;

            self.check_currency(product.currency())?;

            for (set_key, set) in set_keys {
                self.set_keys.insert((key.clone(), set_key), set);
            }

            self.products.insert(key, product);
        }

        Ok(self)
    }

    /// Load a stored cart from `<base>/carts/<name>.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or it refers to
    /// products or sets that are not loaded.
    pub fn load_cart(&self, name: &str) -> Result<StoredCart, FixtureError> {
        let path = self.base_path.join("carts").join(format!("{name}.yml"));

        self.load_cart_file(&path)
    }

    /// Load a stored cart from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or it refers to
    /// products or sets that are not loaded.
    pub fn load_cart_file(&self, path: &Path) -> Result<StoredCart, FixtureError> {
        let fixture: CartFixture = serde_norway::from_str(&read(path)?)?;

        let lines = fixture
            .lines
            .into_iter()
            .map(|line| self.stored_line(line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredCart {
            owner: fixture.owner,
            lines,
        })
    }

    /// Get a product by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product(&self, key: &str) -> Result<&Product, FixtureError> {
        self.products
            .get(key)
            .ok_or_else(|| FixtureError::ProductNotFound(key.to_string()))
    }

    /// Get a set by its product and set keys
    ///
    /// # Errors
    ///
    /// Returns an error if the product or set is not found.
    pub fn set(&self, product: &str, set: &str) -> Result<&ProductSet, FixtureError> {
        let not_found = || FixtureError::SetNotFound {
            product: product.to_string(),
            set: set.to_string(),
        };

        let id = self
            .set_keys
            .get(&(product.to_string(), set.to_string()))
            .ok_or_else(not_found)?;

        self.product(product)?.set(*id).ok_or_else(not_found)
    }

    /// Every loaded product
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// An in-memory catalog holding every loaded product
    pub fn catalog(&self) -> InMemoryCatalog {
        InMemoryCatalog::new(self.products.values().cloned())
    }

    /// Get the currency
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }

    fn check_currency(&mut self, currency: &'static Currency) -> Result<(), FixtureError> {
        match self.currency {
            Some(existing) if existing != currency => Err(FixtureError::CurrencyMismatch(
                existing.iso_alpha_code.to_string(),
                currency.iso_alpha_code.to_string(),
            )),
            Some(_) => Ok(()),
            None => {
                self.currency = Some(currency);

                Ok(())
            }
        }
    }

    fn stored_line(&self, fixture: CartLineFixture) -> Result<StoredCartLine, FixtureError> {
        let product = self.product(&fixture.product)?;

        let mode = match &fixture.set {
            Some(set) => PurchaseMode::Set {
                set: self.set(&fixture.product, set)?.id,
            },
            None => PurchaseMode::Piece,
        };

        let current = price_line(product, mode, fixture.quantity)?;

        let breakdown = match &fixture.price {
            Some(price) => {
                let price = parse_price(price)?;

                StoredBreakdown {
                    currency: price.currency().iso_alpha_code.to_string(),
                    total_price: price.to_minor_units(),
                    original_price: current.original_price().to_minor_units(),
                    total_pieces: current.total_pieces(),
                }
            }
            None => StoredBreakdown::from(&current),
        };

        Ok(StoredCartLine {
            id: fixture.id.map_or_else(LineUuid::now_v7, LineUuid::from_uuid),
            product: product.id,
            mode,
            color: fixture.color,
            quantity: fixture.quantity,
            breakdown,
            added_at: fixture.added_at.unwrap_or_else(Timestamp::now),
            validated_at: fixture.validated_at,
            priced_quantities: Vec::new(),
        })
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

fn read(path: &Path) -> Result<String, FixtureError> {
    fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })
}
