// Property-based and example tests for the installment calculator

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use splitpay::config::InstallmentSettings;
use splitpay::modules::installments::services::installment_calculator::{
    coerce_count, coerce_decimal, round_half_up,
};
use splitpay::modules::installments::services::InstallmentCalculator;

/// Prices with two decimal places, 0.01 ..= 10_000.00
fn price() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #[test]
    fn prop_down_payment_is_price_times_quantity(
        current in price(),
        markup in price(),
        count in 2i64..=24,
        quantity in 1i64..=10,
    ) {
        let full = current + markup;
        let b = InstallmentCalculator::calculate(current, full, count, quantity).unwrap();

        prop_assert_eq!(b.down_payment, current * Decimal::from(quantity));
        prop_assert_eq!(b.installment_count as i64, count);
    }

    #[test]
    fn prop_remaining_and_installment_are_rounded_half_up(
        current in price(),
        markup in price(),
        count in 2i64..=24,
        quantity in 1i64..=10,
    ) {
        let full = current + markup;
        let b = InstallmentCalculator::calculate(current, full, count, quantity).unwrap();

        let remaining = round_half_up((full - current) * Decimal::from(quantity));
        prop_assert_eq!(b.remaining_amount, remaining);
        prop_assert_eq!(b.installment_amount, round_half_up(remaining / Decimal::from(count)));
        prop_assert_eq!(b.total_amount(), b.down_payment + b.remaining_amount);
    }

    #[test]
    fn prop_scheduled_total_within_rounding_of_remaining(
        current in price(),
        markup in price(),
        count in 2i64..=24,
    ) {
        let b = InstallmentCalculator::calculate(current, current + markup, count, 1).unwrap();

        // Each installment is off by at most half a cent
        let drift = (b.scheduled_total() - b.remaining_amount).abs();
        prop_assert!(drift <= dec!(0.005) * Decimal::from(count));
    }

    #[test]
    fn prop_full_amount_not_above_price_is_invalid(
        current in price(),
        discount in 0i64..=100,
        count in 2i64..=12,
    ) {
        let full = current - Decimal::new(discount, 2);
        prop_assert!(InstallmentCalculator::calculate(current, full, count, 1).is_err());
    }

    #[test]
    fn prop_count_below_two_is_invalid(
        current in price(),
        markup in price(),
        count in -5i64..=1,
    ) {
        prop_assert!(InstallmentCalculator::calculate(current, current + markup, count, 1).is_err());
    }
}

#[test]
fn test_phone_sold_at_130_over_three_months() {
    let b = InstallmentCalculator::calculate(dec!(100), dec!(130), 3, 1).unwrap();

    assert_eq!(b.down_payment, dec!(100));
    assert_eq!(b.remaining_amount, dec!(30.00));
    assert_eq!(b.installment_amount, dec!(10.00));
    assert_eq!(b.installment_count, 3);
    assert_eq!(b.total_amount(), dec!(130));
}

#[test]
fn test_quantity_scales_every_figure() {
    let b = InstallmentCalculator::calculate(dec!(100), dec!(130), 3, 2).unwrap();

    assert_eq!(b.down_payment, dec!(200));
    assert_eq!(b.remaining_amount, dec!(60.00));
    assert_eq!(b.installment_amount, dec!(20.00));
}

#[test]
fn test_equal_prices_are_invalid() {
    assert!(InstallmentCalculator::calculate(dec!(100), dec!(100), 3, 1).is_err());
}

#[test]
fn test_invalid_inputs() {
    let cases = [
        (dec!(0), dec!(130), 3, 1),
        (dec!(-1), dec!(130), 3, 1),
        (dec!(100), dec!(0), 3, 1),
        (dec!(100), dec!(130), 1, 1),
        (dec!(100), dec!(130), 0, 1),
        (dec!(100), dec!(130), 3, 0),
        (dec!(100), dec!(90), 3, 1),
    ];

    for (current, full, count, quantity) in cases {
        assert!(
            InstallmentCalculator::calculate(current, full, count, quantity).is_err(),
            "{} / {} / {} / {} should be rejected",
            current,
            full,
            count,
            quantity
        );
    }
}

#[test]
fn test_rounding_is_half_up_not_bankers() {
    // 0.25 / 2 = 0.125 -> 0.13
    let b = InstallmentCalculator::calculate(dec!(10.00), dec!(10.25), 2, 1).unwrap();
    assert_eq!(b.installment_amount, dec!(0.13));
    assert_eq!(b.scheduled_total(), dec!(0.26));
}

#[test]
fn test_raw_host_values_are_coerced() {
    let b = InstallmentCalculator::calculate_raw(" 100 ", "130", "3", "1").unwrap();
    assert_eq!(b.installment_amount, dec!(10.00));

    assert!(InstallmentCalculator::calculate_raw("100", "", "3", "1").is_err());
    assert!(InstallmentCalculator::calculate_raw("100", "130", "three", "1").is_err());
}

#[test]
fn test_numeric_prefix_of_host_values() {
    assert_eq!(coerce_decimal("12abc"), dec!(12));
    assert_eq!(coerce_decimal(" 130.500 KWD"), dec!(130.500));
    assert_eq!(coerce_decimal("1.2.3"), dec!(1.2));
    assert_eq!(coerce_decimal("7."), dec!(7));
    assert_eq!(coerce_decimal("-5"), dec!(-5));
    assert_eq!(coerce_decimal("price"), Decimal::ZERO);
    assert_eq!(coerce_decimal(""), Decimal::ZERO);
    assert_eq!(coerce_count("12abc"), 12);

    let b = InstallmentCalculator::calculate_raw("100 KWD", "130abc", "3 months", "1").unwrap();
    assert_eq!(b.remaining_amount, dec!(30));
    assert_eq!(b.installment_count, 3);
}

#[test]
fn test_merchant_limits() {
    let settings = InstallmentSettings {
        max_count: 6,
        min_installment_amount: dec!(5),
        ..InstallmentSettings::default()
    };

    let ok = InstallmentCalculator::calculate(dec!(100), dec!(130), 6, 1).unwrap();
    assert!(InstallmentCalculator::check_limits(&ok, &settings).is_ok());

    let too_many = InstallmentCalculator::calculate(dec!(100), dec!(200), 7, 1).unwrap();
    assert!(InstallmentCalculator::check_limits(&too_many, &settings).is_err());

    let too_small = InstallmentCalculator::calculate(dec!(100), dec!(110), 3, 1).unwrap();
    assert!(InstallmentCalculator::check_limits(&too_small, &settings).is_err());
}
