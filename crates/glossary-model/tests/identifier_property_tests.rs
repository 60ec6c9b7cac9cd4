use glossary_model::{normalize_identifier, TermId};
use proptest::prelude::*;

fn display_name() -> impl Strategy<Value = String> {
    // Words, punctuation and separators in the shapes authors actually type.
    proptest::string::string_regex("[A-Za-z0-9 '&().,/_-]{0,40}").unwrap()
}

fn any_name() -> impl Strategy<Value = String> {
    // Any printable text, including scripts with no ASCII form.
    proptest::string::string_regex("\\PC{0,40}").unwrap()
}

proptest! {
    #[test]
    fn normalization_is_idempotent(name in display_name()) {
        let once = normalize_identifier(&name);
        prop_assert_eq!(normalize_identifier(&once), once);
    }

    #[test]
    fn identifiers_are_url_safe(name in display_name()) {
        let id = normalize_identifier(&name);
        prop_assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!id.starts_with('-'));
        prop_assert!(!id.ends_with('-'));
        prop_assert!(!id.contains("--"));
    }

    #[test]
    fn case_never_changes_the_identifier(name in display_name()) {
        prop_assert_eq!(
            TermId::from_name(&name.to_uppercase()),
            TermId::from_name(&name.to_lowercase())
        );
    }

    #[test]
    fn empty_identifier_iff_no_alphanumerics(name in display_name()) {
        let has_alnum = name.chars().any(|c| c.is_alphanumeric());
        prop_assert_eq!(TermId::from_name(&name).is_some(), has_alnum);
    }

    #[test]
    fn any_name_normalizes_idempotently(name in any_name()) {
        let once = normalize_identifier(&name);
        prop_assert_eq!(normalize_identifier(&once), once);
    }

    #[test]
    fn any_name_yields_a_url_safe_identifier(name in any_name()) {
        let id = normalize_identifier(&name);
        prop_assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!id.starts_with('-'));
        prop_assert!(!id.ends_with('-'));
        prop_assert!(!id.contains("--"));
    }
}
