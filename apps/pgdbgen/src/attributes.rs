use fake::faker::internet::en::{Password, SafeEmail, Username};
use fake::faker::name::en::{FirstName, LastName};
use fake::faker::phone_number::en::PhoneNumber;
use fake::uuid::UUIDv4;
use fake::Fake;
use rand::rngs::StdRng;
use rand::Rng;
use uuid::Uuid;

use crate::common::{generate_letters_with_rng, generate_unix_time_with_rng};
use crate::error::Result;

pub const PRODUCT_NAME_PREFIX_LEN: usize = 7;
pub const PRODUCT_NAME_SUFFIX_LEN: usize = 12;
pub const MIN_QUANTITY: i32 = 1;
pub const MAX_QUANTITY: i32 = 999;
pub const MIN_UNIT_PRICE: f64 = 0.09;
pub const MAX_UNIT_PRICE: f64 = 99.99;

/// One raw set of synthetic attributes, the input of a generation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBundle {
    pub unique_id: Uuid,
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub product_name_prefix: String,
    pub product_name_suffix: String,
    pub phone_number: String,
    pub password: String,
    pub unix_time: i64,
    pub quantity: i32,
    pub unit_price: f64,
}

/// Produces attribute bundles from the calling worker's own generator.
pub trait AttributeSource: Clone + Send + 'static {
    fn next_bundle(&mut self, record_id: u64, rng: &mut StdRng) -> Result<AttributeBundle>;
}

/// Attribute source backed by the `fake` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeAttributeSource;

impl AttributeSource for FakeAttributeSource {
    fn next_bundle(&mut self, _record_id: u64, rng: &mut StdRng) -> Result<AttributeBundle> {
        Ok(generate_attribute_bundle(rng))
    }
}

/// Generate every field of a bundle, one explicit generator call per field
pub fn generate_attribute_bundle<R: Rng>(rng: &mut R) -> AttributeBundle {
    AttributeBundle {
        unique_id: UUIDv4.fake_with_rng(rng),
        user_name: Username().fake_with_rng(rng),
        email: SafeEmail().fake_with_rng(rng),
        first_name: FirstName().fake_with_rng(rng),
        last_name: LastName().fake_with_rng(rng),
        product_name_prefix: generate_letters_with_rng(PRODUCT_NAME_PREFIX_LEN, rng),
        product_name_suffix: generate_letters_with_rng(PRODUCT_NAME_SUFFIX_LEN, rng),
        phone_number: PhoneNumber().fake_with_rng(rng),
        password: Password(8..20).fake_with_rng(rng),
        unix_time: generate_unix_time_with_rng(rng),
        quantity: rng.gen_range(MIN_QUANTITY..=MAX_QUANTITY),
        unit_price: rng.gen_range(MIN_UNIT_PRICE..=MAX_UNIT_PRICE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn bundle_fields_respect_their_bounds() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut source = FakeAttributeSource;
        for record_id in 1..=500 {
            let bundle = source.next_bundle(record_id, &mut rng).unwrap();
            assert!((MIN_QUANTITY..=MAX_QUANTITY).contains(&bundle.quantity));
            assert!(bundle.unit_price >= MIN_UNIT_PRICE && bundle.unit_price <= MAX_UNIT_PRICE);
            assert_eq!(bundle.product_name_prefix.len(), PRODUCT_NAME_PREFIX_LEN);
            assert_eq!(bundle.product_name_suffix.len(), PRODUCT_NAME_SUFFIX_LEN);
            assert!(bundle.unix_time >= 0);
            assert!(!bundle.user_name.is_empty());
            assert!(bundle.email.contains('@'));
            assert!(!bundle.password.is_empty());
        }
    }

    #[test]
    fn consecutive_bundles_are_independent() {
        let mut rng = StdRng::seed_from_u64(99);
        let first = generate_attribute_bundle(&mut rng);
        let second = generate_attribute_bundle(&mut rng);
        assert_ne!(first.unique_id, second.unique_id);
        assert_ne!(first, second);
    }

    #[test]
    fn same_seed_reproduces_the_bundle() {
        let a = generate_attribute_bundle(&mut StdRng::seed_from_u64(5));
        let b = generate_attribute_bundle(&mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
