use unicode_normalization::UnicodeNormalization;

/// True when the text contains CJK ideographs, hiragana or katakana.
pub fn contains_japanese(text: &str) -> bool {
    text.chars().any(|ch| {
        matches!(ch,
            '\u{4e00}'..='\u{9fff}' | '\u{3040}'..='\u{309f}' | '\u{30a0}'..='\u{30ff}')
    })
}

/// Unicode compatibility composition (NFKC).
pub fn nfkc(text: &str) -> String {
    text.nfkc().collect()
}
