/// Built-in corrections, applied in order
///
/// Longer phrases come before their prefixes ("ki lô gam" before "ki lô").
/// Sentence-ending punctuation is deliberately absent.
pub const DEFAULT_CORRECTIONS: &[(&str, &str)] = &[
    // Punctuation spacing
    (" ,", ","),
    (",,", ","),
    (" ;", ";"),
    (" :", ":"),
    // Weight units
    ("ki lô gam", "kg"),
    ("ki-lô-gam", "kg"),
    ("kí lô gam", "kg"),
    ("ký lô gam", "kg"),
    ("ki lô", "kg"),
    ("kí lô", "kg"),
    ("ký lô", "kg"),
    // Counting words
    ("một chục", "10"),
    ("một tá", "12"),
    ("nửa tá", "6"),
    // Common mishearings
    ("cà fê", "cà phê"),
    ("sửa tươi", "sữa tươi"),
    ("sửa chua", "sữa chua"),
    ("nướt mắm", "nước mắm"),
    ("bánh mỳ", "bánh mì"),
];
