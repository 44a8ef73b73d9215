use super::vocabulary::{
    count_mentions, ingredient_text, PROCESSED_INDICATORS, ULTRA_PROCESSED_INDICATORS,
};

/// NOVA class from indicator-term counts.
///
/// 3+ ultra-processed markers → 4, 1+ → 3, 2+ processed markers → 2, else 1.
pub fn nova_from_counts(ultra_processed: usize, processed: usize) -> u8 {
    if ultra_processed >= 3 {
        4
    } else if ultra_processed >= 1 {
        3
    } else if processed >= 2 {
        2
    } else {
        1
    }
}

/// NOVA class of an ingredient list. An empty list is unknown and scored
/// as ultra-processed.
pub fn classify_nova(ingredients: &[String]) -> u8 {
    if ingredients.is_empty() {
        return 4;
    }
    let text = ingredient_text(ingredients);
    nova_from_counts(
        count_mentions(&text, &ULTRA_PROCESSED_INDICATORS),
        count_mentions(&text, &PROCESSED_INDICATORS),
    )
}
