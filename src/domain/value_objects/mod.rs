//! Value Objects for the storefront

use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use unicode_normalization::UnicodeNormalization;

/// Alphabet used for public order/product tokens (`pid`, `oid`, `gid`).
pub const SHORT_ID_ALPHABET: &[u8] = b"abcdefg12345";
pub const SHORT_ID_LENGTH: usize = 10;

/// Short public identifier, e.g. `a1b2c3d4e5`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortId(String);

impl ShortId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..SHORT_ID_LENGTH)
            .map(|_| SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())] as char)
            .collect();
        Self(token)
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Builds a URL slug from free text.
///
/// Non-ASCII characters are decomposed and dropped, anything that is not a
/// word character, whitespace or hyphen is removed, and runs of whitespace and
/// hyphens collapse into a single `-`. `"Red Shoe"` becomes `"red-shoe"`.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }
    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Monetary amount with two decimal places. Deserialized values are rounded like [`Money::new`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(from = "Decimal", into = "Decimal")]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    /// Largest amount a `NUMERIC(12, 2)` column holds.
    pub const MAX: Money = Money(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        amount.rescale(2);
        Self(amount)
    }
    pub fn amount(&self) -> Decimal { self.0 }
    /// `None` on overflow.
    pub fn times(&self, qty: u32) -> Option<Money> { self.0.checked_mul(Decimal::from(qty)).map(Money::new) }
    /// `percent` of this amount, e.g. `percent(dec!(10))` is a tenth. `None` on overflow.
    pub fn percent(&self, percent: Decimal) -> Option<Money> {
        self.0.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED).map(Money::new)
    }
    pub fn checked_add(&self, rhs: Money) -> Option<Money> { self.0.checked_add(rhs.0).map(Money::new) }
    pub fn is_positive(&self) -> bool { self.0 > Decimal::ZERO }
    /// Between zero and [`Money::MAX`] inclusive.
    pub fn in_range(&self) -> bool { *self >= Money::ZERO && *self <= Money::MAX }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self { money.0 }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Money::new(amount) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money::new(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money::new(self.0 - rhs.0) }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) { *self = *self + rhs; }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) { *self = *self - rhs; }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money { iter.copied().sum() }
}

/// Error returned when a stored enum label is not recognised.
#[derive(Debug, Clone)]
pub struct UnknownVariant { pub kind: &'static str, pub value: String }
impl std::error::Error for UnknownVariant {}
impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown {} '{}'", self.kind, self.value) }
}
