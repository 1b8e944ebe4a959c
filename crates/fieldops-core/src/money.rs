//! # Money Module
//!
//! `Money` and `Percentage` primitives plus the coercion helpers used at the
//! boundary where loosely typed input (form fields, JSON numbers, strings)
//! enters the core.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    250 × 0.1 + 0.2 ...  → 25.200000000000003  ❌ drift                  │
//! │    (1.005).toFixed(2)   → "1.00"              ❌ wrong half-up          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise + Basis Points                             │
//! │    Amounts are i64 paise, percentages are u32 basis points.            │
//! │    Sums are exact. The only rounding step is a percentage of an        │
//! │    amount, rounded half-up once: (paise × bps + 5000) / 10000          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fieldops_core::money::{Money, Percentage};
//!
//! let gross = Money::from_cents(25_000); // ₹250.00
//! let discount = gross.percent_of(Percentage::from_bps(1_000)); // 10%
//! assert_eq!(discount.cents(), 2_500);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const FULL_BPS: u32 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: a technician cut can be negative when the technician
///   owes more discount liability than they earned
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serializes as the integer paise count**
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► OrderLine.unit_price ──► product_total              │
/// │                                                  │                      │
/// │  installation + misc + fitting ─────────────────►├──► gross_subtotal   │
/// │                                                  │                      │
/// │                        discount_amount ◄─────────┘                      │
/// │                              │                                          │
/// │            ┌─────────────────┴─────────────────┐                        │
/// │            ▼                                   ▼                        │
/// │  technician share ──► technician_cut    owner share ──► company_cut    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // ₹10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal string such as `"250"`, `"1.005"` or `"-3.5"`.
    ///
    /// Digits past the second decimal place round half-up on the cent
    /// boundary, exactly as written (no binary floating point involved).
    /// Returns `None` for anything that is not a plain decimal number.
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::money::Money;
    ///
    /// assert_eq!(Money::parse("1.005"), Some(Money::from_cents(101)));
    /// assert_eq!(Money::parse("  42 "), Some(Money::from_cents(4200)));
    /// assert_eq!(Money::parse("abc"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Money> {
        parse_hundredths(input).map(Money)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value in rupees as a float. Display and export only.
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// Cost and discount fields use this: a negative cost is treated as no cost.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(10_000);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 20_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Addition that clamps at the i64 bounds instead of overflowing.
    ///
    /// The calculators use this so that absurd input can never panic.
    #[inline]
    pub const fn saturating_add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Quantity multiplication that clamps at the i64 bounds.
    #[inline]
    pub const fn saturating_mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `pct` of this amount, rounded half-up to the paisa.
    ///
    /// Negative amounts round symmetrically (half away from zero).
    ///
    /// ## Implementation
    /// Integer math: `(paise × bps + 5000) / 10000`, in i128 so large
    /// amounts cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use fieldops_core::money::{Money, Percentage};
    ///
    /// let discount = Money::from_cents(2_500);
    /// let forty = Percentage::from_bps(4_000);
    /// assert_eq!(discount.percent_of(forty).cents(), 1_000);
    ///
    /// // ₹0.05 × 50% = 2.5 paise → 3 paise
    /// let half = Percentage::from_bps(5_000);
    /// assert_eq!(Money::from_cents(5).percent_of(half).cents(), 3);
    /// ```
    pub fn percent_of(&self, pct: Percentage) -> Money {
        let magnitude = (self.0.unsigned_abs() as i128 * pct.bps() as i128 + 5_000) / 10_000;
        let signed = if self.0 < 0 { -magnitude } else { magnitude };
        Money(signed as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as rupees, e.g. `₹10.99` / `-₹5.50`.
///
/// ## Note
/// For logs and debugging. The browser client formats for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points, always within `[0, 100%]`.
///
/// 1 basis point = 0.01%, so 4000 bps = 40%. Construction clamps, which
/// makes an out-of-range percentage unrepresentable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(try_from = "u32", into = "u32")]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points, clamped to 10000.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > FULL_BPS {
            Percentage(FULL_BPS)
        } else {
            Percentage(bps)
        }
    }

    /// Creates a percentage from a plain number such as `12.5`.
    /// Same as [`clamp_percentage`].
    pub fn from_percent(pct: f64) -> Self {
        clamp_percentage(pct)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the value as a plain percentage (display only).
    #[inline]
    pub fn as_percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// 0%.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// 100%.
    #[inline]
    pub const fn full() -> Self {
        Percentage(FULL_BPS)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `100% - self`.
    #[inline]
    pub const fn complement(&self) -> Self {
        Percentage(FULL_BPS - self.0)
    }
}

impl TryFrom<u32> for Percentage {
    type Error = String;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        if bps > FULL_BPS {
            return Err(format!("percentage {bps} bps exceeds {FULL_BPS} bps"));
        }
        Ok(Percentage(bps))
    }
}

impl From<Percentage> for u32 {
    fn from(pct: Percentage) -> Self {
        pct.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Coercion Helpers
// =============================================================================

/// Coerces a loosely typed value into a non-negative amount.
///
/// ## Rules
/// ```text
/// 250          → ₹250.00
/// "99.995"     → ₹100.00   (half-up on the paisa, from the decimal text)
/// null / "" / "abc" / -5 / NaN  → ₹0.00
/// ```
///
/// Never fails: cost and discount fields fall back to zero.
pub fn to_amount(raw: &Value) -> Money {
    let parsed = match raw {
        Value::Number(n) => match n.as_i64() {
            Some(whole) => whole.checked_mul(100).map(Money),
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .and_then(|f| Money::parse(&f.to_string())),
        },
        Value::String(s) => Money::parse(s),
        _ => None,
    };

    parsed.map(|m| m.non_negative()).unwrap_or_default()
}

/// Clamps a plain percentage number to `[0, 100]`.
///
/// NaN reads as 0, +∞ as 100. Precision beyond 0.01% rounds half-up.
///
/// ## Example
/// ```rust
/// use fieldops_core::money::clamp_percentage;
///
/// assert_eq!(clamp_percentage(12.5).bps(), 1_250);
/// assert_eq!(clamp_percentage(-3.0).bps(), 0);
/// assert_eq!(clamp_percentage(250.0).bps(), 10_000);
/// ```
pub fn clamp_percentage(pct: f64) -> Percentage {
    if pct.is_nan() || pct <= 0.0 {
        return Percentage::zero();
    }
    if pct >= 100.0 {
        return Percentage::full();
    }

    let bps = parse_hundredths(&pct.to_string()).unwrap_or(0);
    Percentage::from_bps(bps.clamp(0, FULL_BPS as i64) as u32)
}

/// Rounds to two decimal places, half-up on the cent boundary.
///
/// Works from the shortest decimal text of `x`, so `round2(1.005) == 1.01`
/// where a naive `(x * 100).round() / 100` gives `1.0`. Non-finite input is
/// returned unchanged.
pub fn round2(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    parse_hundredths(&x.to_string())
        .map(|h| h as f64 / 100.0)
        .unwrap_or(x)
}

/// Fractional digits kept by [`exact_decimal`].
const EXACT_SCALE_DIGITS: usize = 18;

/// `100` in the units of [`exact_decimal`].
pub(crate) const EXACT_HUNDRED: i128 = 100 * 10i128.pow(EXACT_SCALE_DIGITS as u32);

/// The exact value of `x`'s shortest decimal text, in units of 10⁻¹⁸.
///
/// `33.335` reads as written rather than as its binary neighbour, so sums of
/// user-entered percentages compare exactly. `None` for non-finite input and
/// for text with more than 18 fractional digits.
pub(crate) fn exact_decimal(x: f64) -> Option<i128> {
    if !x.is_finite() {
        return None;
    }

    let text = x.to_string();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if frac.len() > EXACT_SCALE_DIGITS || whole.len() > 20 {
        return None;
    }

    let whole: i128 = whole.parse().ok()?;
    let frac: i128 = if frac.is_empty() {
        0
    } else {
        frac.parse::<i128>().ok()? * 10i128.pow((EXACT_SCALE_DIGITS - frac.len()) as u32)
    };
    let magnitude = whole
        .checked_mul(10i128.pow(EXACT_SCALE_DIGITS as u32))?
        .checked_add(frac)?;

    Some(if negative { -magnitude } else { magnitude })
}

/// Parses a plain decimal string to hundredths, rounding half-up (away from
/// zero) on the third decimal digit.
fn parse_hundredths(input: &str) -> Option<i64> {
    let s = input.trim();
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole_value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };

    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let round_up = digits.next().is_some_and(|d| d >= 5);

    let magnitude = whole_value
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + i64::from(round_up))?;

    Some(if negative { -magnitude } else { magnitude })
}

// =============================================================================
// Unit Tests
// =============================================================================
