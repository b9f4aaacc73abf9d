//! Document line model and identity rules.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Persisted identity of a line.
pub type LineId = u64;

/// Transient identity assigned by the editing client, stable across an edit
/// round-trip even before the line is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh random client id for a line created without one.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// Clients send either numeric or textual ids.
impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ClientId(s),
            Raw::Signed(n) => ClientId(n.to_string()),
            Raw::Unsigned(n) => ClientId(n.to_string()),
        })
    }
}

/// Opaque tax metadata handed to the pricing collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxSet(Vec<String>);

impl TaxSet {
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Scalar content of one document line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Only used by the flat representation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_client_id: Option<ClientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default)]
    pub quantity: Decimal,
    /// Unit price, ex-tax
    #[serde(default)]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_before_update: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_before_update: Option<Decimal>,
    #[serde(default)]
    pub ex_tax_total: Decimal,
    #[serde(default)]
    pub in_tax_price: Decimal,
    #[serde(default)]
    pub in_tax_total: Decimal,
    #[serde(default, skip_serializing_if = "TaxSet::is_empty")]
    pub tax_set: TaxSet,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub general_expenses: Decimal,
    #[serde(default)]
    pub gross_margin: Decimal,
}

impl LineData {
    pub fn new(quantity: Decimal, price: Decimal) -> Self {
        Self {
            quantity,
            price,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: LineId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(ClientId::new(client_id));
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_ex_tax_total(mut self, total: Decimal) -> Self {
        self.ex_tax_total = total;
        self
    }

    pub fn with_tax_set(mut self, tax_set: TaxSet) -> Self {
        self.tax_set = tax_set;
        self
    }

    pub fn with_cost_price(mut self, cost_price: Decimal) -> Self {
        self.cost_price = cost_price;
        self
    }

    /// Two lines are the same line iff both are persisted with equal ids, or
    /// neither is persisted and both carry the same client id.
    ///
    /// A persisted line never matches an unsaved one, whatever their client ids.
    pub fn same_line(&self, other: &LineData) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => match (&self.client_id, &other.client_id) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }

    /// Record the current price and quantity as the baseline of the next edit.
    pub fn snapshot_before_update(&mut self) {
        self.price_before_update = Some(self.price);
        self.quantity_before_update = Some(self.quantity);
    }

    /// Client id of this line, generating one when missing.
    pub fn ensure_client_id(&mut self) -> &ClientId {
        self.client_id.get_or_insert_with(ClientId::generate)
    }

    pub fn has_identity(&self) -> bool {
        self.id.is_some() || self.client_id.is_some()
    }

    /// Human-readable handle for logs and error messages.
    pub fn label(&self) -> String {
        match (&self.index, self.id, &self.client_id) {
            (Some(index), _, _) => format!("#{index}"),
            (None, Some(id), _) => format!("id={id}"),
            (None, None, Some(cid)) => format!("cid={cid}"),
            (None, None, None) => "<anonymous>".to_string(),
        }
    }
}

/// Owned line with its sub-lines, used at the boundaries (payloads, storage).
/// The live tree is a [`crate::domain::LineTree`] arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineSubtree {
    #[serde(flatten)]
    pub line: LineData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LineSubtree>,
}

impl LineSubtree {
    pub fn leaf(line: LineData) -> Self {
        Self {
            line,
            children: Vec::new(),
        }
    }

    pub fn with_children(line: LineData, children: Vec<LineSubtree>) -> Self {
        Self { line, children }
    }
}
