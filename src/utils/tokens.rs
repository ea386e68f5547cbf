//! Token approximations
//!
//! Used where a provider has no counting endpoint and for the session's
//! running usage estimate.

use crate::types::{ChatTurn, ContentPart};

/// Characters per token assumed by both estimates.
pub const CHARS_PER_TOKEN: u64 = 4;

/// Surcharge, in characters, for each image part when a backend has no
/// counting endpoint.
pub const IMAGE_CHAR_SURCHARGE: u64 = 1000;

/// Flat token cost of one media part in the session usage estimate.
pub const MEDIA_PART_TOKENS: u64 = 258;

fn text_chars(part: &ContentPart) -> u64 {
    part.as_text().map_or(0, |t| t.chars().count() as u64)
}

/// `ceil((text chars + 1000 per image) / 4)` over all turns.
pub fn heuristic_token_count(turns: &[ChatTurn]) -> u64 {
    let chars: u64 = turns
        .iter()
        .flat_map(|turn| turn.parts.iter())
        .map(|part| {
            if part.is_image() {
                IMAGE_CHAR_SURCHARGE
            } else {
                text_chars(part)
            }
        })
        .sum();
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Session usage estimate: text length / 4 plus a flat cost per media part.
pub fn estimate_usage(turns: &[ChatTurn]) -> u64 {
    let (chars, media) = turns
        .iter()
        .flat_map(|turn| turn.parts.iter())
        .fold((0u64, 0u64), |(chars, media), part| match part {
            ContentPart::Text { .. } => (chars + text_chars(part), media),
            ContentPart::InlineData { .. } => (chars, media + 1),
        });
    chars.div_ceil(CHARS_PER_TOKEN) + media * MEDIA_PART_TOKENS
}

/// Usage estimate for a bare string (system instructions).
pub fn estimate_text_usage(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_counts_images() {
        let turns = vec![ChatTurn::user(vec![
            ContentPart::text("abcdef"),
            ContentPart::inline_data("image/png", "AAAA"),
            ContentPart::inline_data("audio/wav", "AAAA"),
        ])];
        // (6 + 1000) / 4 rounded up; audio adds nothing
        assert_eq!(heuristic_token_count(&turns), 252);
    }

    #[test]
    fn usage_estimate_charges_media() {
        let turns = vec![ChatTurn::user(vec![
            ContentPart::text("hello"),
            ContentPart::inline_data("audio/wav", "AAAA"),
        ])];
        assert_eq!(estimate_usage(&turns), 2 + MEDIA_PART_TOKENS);
        assert_eq!(estimate_text_usage(""), 0);
    }
}
