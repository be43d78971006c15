//! License plate (kenteken) helpers.
//!
//! The format check is syntactic only: it says whether a string looks like
//! a Dutch plate, not whether the plate is registered.

/// Strips dashes and all whitespace and uppercases.
///
/// ```
/// assert_eq!(carfinder::plate::normalize(" ab-123-c "), "AB123C");
/// assert_eq!(carfinder::plate::normalize("AB 123 C"), "AB123C");
/// ```
pub fn normalize(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// True when the normalized `plate` is exactly six ASCII alphanumerics.
pub fn looks_like_plate(plate: &str) -> bool {
    let compact = normalize(plate);
    compact.chars().count() == 6 && compact.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Compares a supplied plate with one read from an image.
/// An empty extraction never matches.
pub fn plates_match(supplied: &str, extracted: &str) -> bool {
    let extracted = normalize(extracted);
    !extracted.is_empty() && normalize(supplied) == extracted
}
