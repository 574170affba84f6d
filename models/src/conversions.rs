use bigdecimal::BigDecimal;
use rust_decimal::prelude::*;

/// Postgres numeric columns travel as BigDecimal under diesel 1.4; domain
/// arithmetic is done with rust_decimal. Conversion goes through the
/// canonical string form.
pub fn big_to_decimal(value: &BigDecimal) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}

pub fn decimal_to_big(value: &Decimal) -> Option<BigDecimal> {
    use std::str::FromStr as _;
    BigDecimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::*;

    #[test]
    fn round_trips_scale() {
        let big = decimal_to_big(&dec!(49.90)).unwrap();
        assert_eq!(big_to_decimal(&big).unwrap(), dec!(49.90));
    }
}
