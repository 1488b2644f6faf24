use serde::{Deserialize, Serialize};

pub const MAX_QUANTITY_PER_LINE: u8 = 99;

/// Units of one product on a cart or order line, always within `1..=99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quantity(u8);

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("quantity {0} is outside 1..=99")]
pub struct QuantityError(pub i64);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    pub const MAX: Quantity = Quantity(MAX_QUANTITY_PER_LINE);

    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if !(1..=i64::from(MAX_QUANTITY_PER_LINE)).contains(&value) {
            return Err(QuantityError(value));
        }
        u8::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Sum of both quantities, capped at [`Quantity::MAX`].
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0).min(MAX_QUANTITY_PER_LINE))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u8 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl From<Quantity> for i64 {
    fn from(q: Quantity) -> Self {
        i64::from(q.0)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
