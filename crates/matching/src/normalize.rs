/// Hebrew niqqud and cantillation marks.
const NIQQUD: std::ops::RangeInclusive<char> = '\u{0591}'..='\u{05C7}';

/// Straight, curly and Hebrew quote marks. Removed outright so `בע"מ` and
/// `בעמ` compare equal.
const QUOTES: &[char] = &[
    '"', '\'', '`', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{05F3}', '\u{05F4}',
];

fn medial_form(c: char) -> char {
    match c {
        'ם' => 'מ',
        'ן' => 'נ',
        'ץ' => 'צ',
        'ף' => 'פ',
        'ך' => 'כ',
        other => other,
    }
}

/// Lowercases, folds final letters, strips niqqud and quotes, turns other
/// punctuation into spaces and collapses whitespace. Idempotent.
pub fn normalize_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let spaced: String = input
        .to_lowercase()
        .chars()
        .map(medial_form)
        .filter(|c| !NIQQUD.contains(c) && !QUOTES.contains(c))
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
