//! Tests for the helper functions behind the Category derive
//!
//! The derive itself expands to `crate::` paths, so its behaviour is tested
//! in the main crate's `models::cohort` module.

use crate::utils::{first_duplicate, to_screaming_snake, variant_label};

#[test]
fn test_screaming_snake() {
    assert_eq!(to_screaming_snake("Female"), "FEMALE");
    assert_eq!(to_screaming_snake("NonHispanicWhite"), "NON_HISPANIC_WHITE");
    assert_eq!(to_screaming_snake("Age85Plus"), "AGE85_PLUS");
}

#[test]
fn test_variant_label_prefers_explicit() {
    let ident: syn::Ident = syn::parse_str("Age0To4").unwrap();
    assert_eq!(variant_label(&ident, Some("0-4")), "0-4");
    assert_eq!(variant_label(&ident, None), "AGE0_TO4");
}

#[test]
fn test_duplicate_labels() {
    let labels = vec!["MALE".to_string(), "FEMALE".to_string(), "male".to_string()];
    assert_eq!(first_duplicate(&labels), Some("male"));
    assert_eq!(first_duplicate(&labels[..2]), None);
}
