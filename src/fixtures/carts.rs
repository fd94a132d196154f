//! Stored Cart Fixtures

use jiff::Timestamp;
use serde::Deserialize;
use uuid::Uuid;

use crate::cart::OwnerContext;

/// A stored cart in YAML
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Owner the cart was stored for
    #[serde(default = "anonymous")]
    pub owner: OwnerContext,

    /// Stored lines
    #[serde(default)]
    pub lines: Vec<CartLineFixture>,
}

/// Stored Line Fixture
#[derive(Debug, Deserialize)]
pub struct CartLineFixture {
    /// Fixed line identifier; generated when omitted
    #[serde(default)]
    pub id: Option<Uuid>,

    /// Product key from the catalog fixture
    pub product: String,

    /// Set key when the line was bought as sets
    #[serde(default)]
    pub set: Option<String>,

    /// Selected colour
    #[serde(default)]
    pub color: Option<String>,

    /// Pieces, or sets when `set` is given
    pub quantity: u32,

    /// Total when the line was stored (e.g., "3140 INR"); current pricing when omitted
    #[serde(default)]
    pub price: Option<String>,

    /// When the line was added
    #[serde(default)]
    pub added_at: Option<Timestamp>,

    /// When the line was last validated
    #[serde(default)]
    pub validated_at: Option<Timestamp>,
}

fn anonymous() -> OwnerContext {
    OwnerContext::Anonymous
}
