//! Property tests for the CNPJ checksum and formatter.

use proptest::prelude::*;
use regula_core::cnpj::{format, strip_non_digits, validate};
use regula_core::Cnpj;

/// Build a valid CNPJ from a 12-digit base by appending both check digits.
fn complete(base: &[u32]) -> String {
    fn dv(digits: &[u32], weights: &[u32]) -> u32 {
        let r = digits.iter().zip(weights).map(|(d, w)| d * w).sum::<u32>() % 11;
        if r < 2 {
            0
        } else {
            11 - r
        }
    }
    let mut digits = base.to_vec();
    digits.push(dv(&digits, &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]));
    digits.push(dv(&digits, &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]));
    digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
}

fn base_digits() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..10, 12).prop_filter("not all identical", |v| {
        v.iter().any(|d| *d != v[0])
    })
}

proptest! {
    #[test]
    fn generated_numbers_validate(base in base_digits()) {
        let cnpj = complete(&base);
        prop_assert!(validate(&cnpj));
        prop_assert!(validate(&format(&cnpj)));
    }

    #[test]
    fn changing_last_digit_invalidates(base in base_digits(), bump in 1u32..10) {
        let cnpj = complete(&base);
        let last = cnpj.chars().last().unwrap().to_digit(10).unwrap();
        let mut tampered: String = cnpj[..13].to_string();
        tampered.push(char::from_digit((last + bump) % 10, 10).unwrap());
        prop_assert!(!validate(&tampered));
    }

    #[test]
    fn format_is_idempotent(s in "[0-9./ -]{0,24}") {
        let once = format(&s);
        prop_assert_eq!(format(&once), once.clone());
    }

    #[test]
    fn format_preserves_digits(s in "[0-9]{14}") {
        prop_assert_eq!(strip_non_digits(&format(&s)), s);
    }

    #[test]
    fn newtype_agrees_with_validate(s in "[0-9]{14}") {
        prop_assert_eq!(Cnpj::new(s.clone()).is_ok(), validate(&s));
    }
}
