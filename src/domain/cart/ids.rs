use std::fmt;

use crate::uuid_id;

uuid_id!(UserId);

/// Catalog identity of a product. Cart lines are keyed on it.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        ProductId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        ProductId(value.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        ProductId(value)
    }
}

impl fake::Dummy<fake::Faker> for ProductId {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &fake::Faker, rng: &mut R) -> Self {
        use fake::Fake;
        let uuid: uuid::Uuid = fake::uuid::UUIDv4.fake_with_rng(rng);
        ProductId(format!("prod-{}", uuid.simple()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Uuid {0} is not compatible. Version 7 Uuid is required.")]
pub struct UuidNotCompatible(pub uuid::Uuid);
