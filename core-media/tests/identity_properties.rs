//! Property tests for identity normalization across the three stores.

use core_media::identity::{
    encode_whitespace, normalize_separators, published_identity, source_identity,
};
use core_media::MediaKind;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9_=-]{1,12}",
        "[A-Za-z0-9 ]{1,12}",
        "[A-Za-z]{1,6}\\.[A-Za-z]{1,4}",
        Just(".".to_string()),
        Just(String::new()),
    ]
}

fn relative_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(segment(), 0..4),
        prop::sample::select(vec!["/", "\\"]),
        "[A-Za-z0-9 =]{1,12}",
        prop::sample::select(vec!["png", "JPG", "jpeg", "gif", "MP4", "md", "webp"]),
    )
        .prop_map(|(dirs, sep, stem, ext)| {
            let mut parts = dirs;
            parts.push(format!("{}.{}", stem, ext));
            parts.join(sep)
        })
}

proptest! {
    #[test]
    fn normalization_is_idempotent(path in relative_path()) {
        let once = normalize_separators(&path);
        prop_assert_eq!(normalize_separators(&once), once.clone());

        let encoded = encode_whitespace(&once);
        prop_assert_eq!(encode_whitespace(&encoded), encoded.clone());
    }

    #[test]
    fn source_and_published_identities_agree(path in relative_path()) {
        let source = source_identity(&path);
        let ext = source.extension.clone().unwrap_or_default();
        let kind = MediaKind::from_extension(&ext);
        let published_ext = kind.published_extension().unwrap_or("bin");

        let published_name = source.identity.published_name(published_ext);
        prop_assert_eq!(published_identity(&published_name).identity, source.identity.clone());
        // Identity of a published name is stable under re-normalization
        prop_assert_eq!(source_identity(&published_name).identity, source.identity);
    }

    #[test]
    fn identities_never_contain_backslashes_or_whitespace(path in relative_path()) {
        let identity = source_identity(&path).identity;
        prop_assert!(!identity.as_str().contains('\\'));
        prop_assert!(!identity.as_str().chars().any(char::is_whitespace));
        prop_assert!(!identity.as_str().starts_with('/'));
        prop_assert!(!identity.as_str().split('/').any(|s| s.is_empty() || s == "."));
    }

    #[test]
    fn case_is_preserved(stem in "[A-Za-z]{1,10}") {
        let identity = source_identity(&format!("Dir/{}.PNG", stem)).identity;
        prop_assert_eq!(identity.as_str(), format!("Dir/{}", stem));
    }
}
