//! Turns one attribute bundle into the four records persisted per cycle.
//!
//! Identifiers are derived from content where the data model asks for it:
//! the payment serial fingerprints (epoch, quantity, total) and the product id
//! is a name-based UUID of (name, authors), so the same product always lands
//! on the same catalog row. Account ids are taken fresh from the bundle.

use md5::{Digest, Md5};
use rand::Rng;
use uuid::Uuid;

use crate::attributes::AttributeBundle;
use crate::common::{format_two_decimals, generate_backdate_offset_with_rng};

/// Offsets, in seconds, used to back-date account timestamps from the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackdateRanges {
    /// Smallest account age at purchase time.
    pub min_days: i64,
    /// Largest account age at purchase time.
    pub max_days: i64,
    /// Upper bound of the gap between last login and purchase (lower bound is 1).
    pub delay_last_login: i64,
}

impl Default for BackdateRanges {
    fn default() -> Self {
        Self {
            min_days: 259_200,
            max_days: 31_536_000,
            delay_last_login: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub serial: String,
    pub total_amount: f64,
    pub epoch: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseStat {
    pub epoch: i64,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub authors: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub user_id: Uuid,
    pub epoch: i64,
    pub name: String,
    pub password: String,
    pub email: String,
    pub last_login: i64,
}

/// The four records of one cycle, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedCycle {
    pub payment: Payment,
    pub purchase_stat: PurchaseStat,
    pub product: Product,
    pub account: Account,
}

/// Fingerprint of a payment: md5 over epoch, quantity and total, hex encoded.
pub fn payment_serial(epoch: i64, quantity: i32, total_amount: f64) -> String {
    let combined = format!(
        "{}{}{}",
        format_two_decimals(epoch as f64),
        quantity,
        format_two_decimals(total_amount)
    );
    hex::encode(Md5::digest(combined.as_bytes()))
}

/// Name-based (v5, nil namespace) UUID of a product's name and authors.
pub fn product_id(name: &str, authors: &str) -> Uuid {
    Uuid::new_v5(&Uuid::nil(), format!("{}-{}", name, authors).as_bytes())
}

pub fn product_name(bundle: &AttributeBundle) -> String {
    format!("{} {}", bundle.product_name_prefix, bundle.product_name_suffix)
}

pub fn product_authors(bundle: &AttributeBundle) -> String {
    format!("{} {}", bundle.last_name, bundle.first_name)
}

/// Derive the payment, purchase-stat, product and account of one cycle.
///
/// The total is computed once and shared by the payment and the purchase-stat.
/// Account creation and last login are both back-dated from the payment epoch.
pub fn derive_cycle<R: Rng + ?Sized>(
    bundle: &AttributeBundle,
    ranges: &BackdateRanges,
    rng: &mut R,
) -> DerivedCycle {
    let payment_epoch = bundle.unix_time;
    let payment_quantity = bundle.quantity;
    let payment_total_amount = bundle.unit_price * f64::from(payment_quantity);
    let serial = payment_serial(payment_epoch, payment_quantity, payment_total_amount);

    let account_offset =
        generate_backdate_offset_with_rng(ranges.min_days, ranges.max_days, rng);
    let last_login_offset = generate_backdate_offset_with_rng(1, ranges.delay_last_login, rng);

    let name = product_name(bundle);
    let authors = product_authors(bundle);
    let id = product_id(&name, &authors);

    DerivedCycle {
        payment: Payment {
            serial,
            total_amount: payment_total_amount,
            epoch: payment_epoch,
        },
        purchase_stat: PurchaseStat {
            epoch: payment_epoch,
            user_id: bundle.unique_id,
            product_id: id,
            quantity: payment_quantity,
            total_amount: payment_total_amount,
        },
        product: Product {
            id,
            name,
            authors,
            price: bundle.unit_price,
        },
        account: Account {
            user_id: bundle.unique_id,
            epoch: payment_epoch - account_offset,
            name: bundle.user_name.clone(),
            password: bundle.password.clone(),
            email: bundle.email.clone(),
            last_login: payment_epoch - last_login_offset,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::generate_attribute_bundle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn example_bundle() -> AttributeBundle {
        AttributeBundle {
            unique_id: Uuid::new_v4(),
            user_name: "jdoe".to_string(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            product_name_prefix: "ABCDEFG".to_string(),
            product_name_suffix: "HIJKLMNOPQRS".to_string(),
            phone_number: "555-0100".to_string(),
            password: "hunter22".to_string(),
            unix_time: 1_700_000_000,
            quantity: 5,
            unit_price: 19.99,
        }
    }

    #[test]
    fn example_bundle_derives_expected_records() {
        let bundle = example_bundle();
        let mut rng = StdRng::seed_from_u64(1);
        let cycle = derive_cycle(&bundle, &BackdateRanges::default(), &mut rng);

        assert!((cycle.payment.total_amount - 99.95).abs() < 1e-9);
        assert_eq!(cycle.product.name, "ABCDEFG HIJKLMNOPQRS");
        assert_eq!(cycle.product.authors, "Doe Jane");
        assert_eq!(cycle.product.price, 19.99);
        assert_eq!(
            cycle.product.id,
            product_id("ABCDEFG HIJKLMNOPQRS", "Doe Jane")
        );
        assert_eq!(
            cycle.payment.serial,
            payment_serial(1_700_000_000, 5, 19.99 * 5.0)
        );

        let again = derive_cycle(&bundle, &BackdateRanges::default(), &mut rng);
        assert_eq!(again.product.id, cycle.product.id);
        assert_eq!(again.payment.serial, cycle.payment.serial);
    }

    #[test]
    fn product_id_is_a_function_of_name_and_authors() {
        let a = product_id("ABCDEFG HIJKLMNOPQRS", "Doe Jane");
        assert_eq!(a, product_id("ABCDEFG HIJKLMNOPQRS", "Doe Jane"));
        assert_eq!(a.get_version_num(), 5);
        assert_ne!(a, product_id("ABCDEFG HIJKLMNOPQRS", "Doe John"));
        assert_ne!(a, product_id("ABCDEFG HIJKLMNOPQRT", "Doe Jane"));
    }

    #[test]
    fn product_id_matches_v5_of_joined_key() {
        let expected = Uuid::new_v5(&Uuid::nil(), b"ABCDEFG HIJKLMNOPQRS-Doe Jane");
        assert_eq!(product_id("ABCDEFG HIJKLMNOPQRS", "Doe Jane"), expected);
    }

    #[test]
    fn payment_serial_is_md5_of_formatted_triple() {
        let serial = payment_serial(1_700_000_000, 5, 99.95);
        let expected = hex::encode(Md5::digest(b"1700000000.00599.95"));
        assert_eq!(serial, expected);
        assert_eq!(serial.len(), 32);
        assert!(serial.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(serial, payment_serial(1_700_000_000, 6, 99.95));
        assert_ne!(serial, payment_serial(1_700_000_001, 5, 99.95));
    }

    #[test]
    fn generated_cycles_hold_ordering_and_total_invariants() {
        let ranges = BackdateRanges {
            min_days: 100,
            max_days: 5_000,
            delay_last_login: 50,
        };
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..1000 {
            let bundle = generate_attribute_bundle(&mut rng);
            let cycle = derive_cycle(&bundle, &ranges, &mut rng);
            let payment_epoch = cycle.payment.epoch;

            let account_age = payment_epoch - cycle.account.epoch;
            assert!((ranges.min_days..=ranges.max_days).contains(&account_age));
            let login_gap = payment_epoch - cycle.account.last_login;
            assert!((1..=ranges.delay_last_login).contains(&login_gap));

            let expected_total = bundle.unit_price * f64::from(bundle.quantity);
            assert!((cycle.payment.total_amount - expected_total).abs() < 1e-9);
            assert_eq!(cycle.purchase_stat.total_amount, cycle.payment.total_amount);
            assert_eq!(cycle.purchase_stat.epoch, payment_epoch);
            assert_eq!(cycle.purchase_stat.quantity, bundle.quantity);
            assert_eq!(cycle.purchase_stat.user_id, cycle.account.user_id);
            assert_eq!(cycle.purchase_stat.product_id, cycle.product.id);
            assert_eq!(cycle.account.user_id, bundle.unique_id);
        }
    }

    #[test]
    fn fixed_ranges_give_exact_offsets() {
        let ranges = BackdateRanges {
            min_days: 3_600,
            max_days: 3_600,
            delay_last_login: 1,
        };
        let bundle = example_bundle();
        let cycle = derive_cycle(&bundle, &ranges, &mut StdRng::seed_from_u64(8));
        assert_eq!(cycle.account.epoch, 1_700_000_000 - 3_600);
        assert_eq!(cycle.account.last_login, 1_700_000_000 - 1);
    }
}
