// Integration tests for transcript normalization

use proptest::prelude::*;
use speech_entry::normalize::{CorrectionEntry, NormalizerError, TextNormalizer};

#[test]
fn test_grocery_item_cleanup() {
    let normalizer = TextNormalizer::default();
    assert_eq!(
        normalizer.normalize(" cá   hộp ,  rau  muống ."),
        "Cá hộp, rau muống ."
    );
}

#[test]
fn test_repeated_separators_collapse() {
    let normalizer = TextNormalizer::default();
    assert_eq!(normalizer.normalize("cá , , hộp"), "Cá, hộp");
}

#[test]
fn test_units_are_case_insensitive() {
    let normalizer = TextNormalizer::default();
    assert_eq!(normalizer.normalize("2 Ki Lô Gam thịt bò"), "2 kg thịt bò");
    assert_eq!(normalizer.normalize("một KÝ LÔ gạo"), "Một kg gạo");
}

#[test]
fn test_longer_phrase_wins_over_prefix() {
    let normalizer = TextNormalizer::default();
    assert_eq!(normalizer.normalize("ki lô gam"), "Kg");
    assert_eq!(normalizer.normalize("ki lô"), "Kg");
}

#[test]
fn test_terminal_punctuation_untouched() {
    let normalizer = TextNormalizer::default();
    assert_eq!(normalizer.normalize("trứng gà"), "Trứng gà");
    assert_eq!(normalizer.normalize("trứng gà."), "Trứng gà.");
    assert_eq!(normalizer.normalize("trứng gà ?"), "Trứng gà ?");
}

#[test]
fn test_interim_mode_only_collapses_whitespace() {
    let normalizer = TextNormalizer::default();
    let raw = "  sửa   tươi , ki lô ";

    assert_eq!(normalizer.normalize_interim(raw), "sửa tươi , ki lô");
    assert_eq!(normalizer.normalize(raw), "Sữa tươi, kg");
}

#[test]
fn test_empty_and_blank_input() {
    let normalizer = TextNormalizer::default();
    assert_eq!(normalizer.normalize(""), "");
    assert_eq!(normalizer.normalize(" \t\n "), "");
    assert_eq!(normalizer.normalize_interim("   "), "");
}

#[test]
fn test_extra_corrections_follow_builtin_table() {
    let normalizer = TextNormalizer::with_extra(&[
        CorrectionEntry {
            from: "bơ lạc".to_string(),
            to: "bơ đậu phộng".to_string(),
        },
        // Invalid entries are skipped, the rest still apply
        CorrectionEntry {
            from: String::new(),
            to: "x".to_string(),
        },
        CorrectionEntry {
            from: "a".to_string(),
            to: "aa".to_string(),
        },
    ]);

    assert_eq!(normalizer.len(), TextNormalizer::default().len() + 1);
    assert_eq!(normalizer.normalize("bơ lạc , bánh mỳ"), "Bơ đậu phộng, bánh mì");
}

#[test]
fn test_custom_table_applies_in_order() {
    let normalizer = TextNormalizer::new([("một chục", "10"), ("10 trứng", "chục trứng")])
        .expect("valid table");
    assert_eq!(normalizer.normalize("một chục trứng"), "Chục trứng");
}

#[test]
fn test_table_reintroducing_earlier_pattern_is_rejected() {
    let err = TextNormalizer::new([("b", "c"), ("a", "b")]).unwrap_err();
    assert_eq!(
        err,
        NormalizerError::Reintroduces {
            earlier: "b".to_string(),
            to: "b".to_string(),
        }
    );

    // Same entries in the other order reach a fixed point in one pass
    let normalizer = TextNormalizer::new([("a", "b"), ("b", "c")]).expect("valid table");
    let once = normalizer.normalize("a");
    assert_eq!(once, "C");
    assert_eq!(normalizer.normalize(&once), once);
}

#[test]
fn test_extra_entry_reintroducing_builtin_pattern_is_skipped() {
    let normalizer = TextNormalizer::with_extra(&[CorrectionEntry {
        from: "cân".to_string(),
        to: "ki lô".to_string(),
    }]);

    assert_eq!(normalizer.len(), TextNormalizer::default().len());
    let once = normalizer.normalize("hai cân cam");
    assert_eq!(normalizer.normalize(&once), once);
}

#[test]
fn test_without_corrections() {
    let normalizer = TextNormalizer::without_corrections();
    assert!(normalizer.is_empty());
    assert_eq!(normalizer.normalize("  cá  , hộp "), "Cá , hộp");
}

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("cá".to_string()),
        Just("hộp".to_string()),
        Just("ki".to_string()),
        Just("lô".to_string()),
        Just("gam".to_string()),
        Just("Ký".to_string()),
        Just("một".to_string()),
        Just("tá".to_string()),
        Just("sửa".to_string()),
        Just("tươi".to_string()),
        Just(",".to_string()),
        Just(";".to_string()),
        Just(".".to_string()),
        Just("2".to_string()),
    ]
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(" "), Just("  "), Just(""), Just("\t")]
}

fn utterance() -> impl Strategy<Value = String> {
    prop::collection::vec((token(), separator()), 0..12).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(token, sep)| format!("{token}{sep}"))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_normalize_is_idempotent(text in utterance()) {
        let normalizer = TextNormalizer::default();
        let once = normalizer.normalize(&text);
        prop_assert_eq!(normalizer.normalize(&once), once.clone());
    }

    #[test]
    fn prop_output_has_no_whitespace_runs(text in utterance()) {
        let normalizer = TextNormalizer::default();
        let out = normalizer.normalize(&text);
        prop_assert!(!out.contains("  "));
        prop_assert_eq!(out.trim(), out.as_str());
    }

    #[test]
    fn prop_terminal_period_is_preserved(text in utterance()) {
        let normalizer = TextNormalizer::default();
        let input = format!("{text}.");
        prop_assert_eq!(normalizer.normalize(&input).ends_with('.'), true);
    }
}
