/// Spam heuristic for community voice submissions
///
/// Pure, deterministic triage. A positive result only sets the
/// `suspected_spam` flag on the submission; it never blocks intake and
/// a moderator can reverse it at any time.

/// Minimum trimmed body length before a submission looks suspicious
const MIN_BODY_CHARS: usize = 20;

/// Number of URL occurrences that trips the link rule
const MAX_URLS: usize = 2;

/// Longest allowed run of one repeated character
const MAX_CHAR_RUN: usize = 7;

/// Terms that mark a submission as likely promotional or scam content
const DENYLIST: &[&str] = &[
    "free money",
    "click here",
    "buy now",
    "limited offer",
    "casino",
    "viagra",
    "crypto giveaway",
    "earn from home",
    "hot singles",
    "loan approval",
];

/// Classify a candidate submission as suspect or clean
///
/// Flags as suspect if ANY of:
/// - the combined text contains two or more URL schemes
/// - the trimmed body is shorter than 20 characters
/// - any single character repeats 7+ times consecutively
/// - the lowercased combined text contains a denylist term
pub fn classify(text: &str, display_name: &str) -> bool {
    let combined = format!("{} {}", text, display_name);
    let lowered = combined.to_lowercase();

    if count_urls(&lowered) >= MAX_URLS {
        return true;
    }

    if text.trim().chars().count() < MIN_BODY_CHARS {
        return true;
    }

    if has_long_char_run(&combined, MAX_CHAR_RUN) {
        return true;
    }

    DENYLIST.iter().any(|term| lowered.contains(term))
}

fn count_urls(lowered: &str) -> usize {
    lowered.matches("http://").count() + lowered.matches("https://").count()
}

fn has_long_char_run(text: &str, limit: usize) -> bool {
    let mut run = 0usize;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
            if run >= limit {
                return true;
            }
        } else {
            prev = Some(c);
            run = 1;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_submission() {
        assert!(!classify(
            "I loved visiting the museum with my grandmother last spring",
            "Maria"
        ));
    }

    #[test]
    fn test_multiple_urls_flagged() {
        assert!(classify(
            "great offer great offer great offer http://a.co http://b.co",
            "x"
        ));
    }

    #[test]
    fn test_single_url_not_flagged_by_link_rule() {
        // One link in an otherwise normal story is fine
        assert!(!classify(
            "The festival photos are up at https://example.org/gallery, such a beautiful day",
            "Tomas"
        ));
    }

    #[test]
    fn test_short_body_flagged() {
        assert!(classify("nice", "Visitor"));
        assert!(classify("   lovely place    ", "Visitor"));
    }

    #[test]
    fn test_exactly_twenty_chars_not_flagged() {
        let body = "twenty characters ok";
        assert_eq!(body.chars().count(), 20);
        assert!(!classify(body, "Visitor"));
    }

    #[test]
    fn test_character_run_flagged() {
        assert!(classify("this exhibit was sooooooo wonderful to see", "Ana"));
        assert!(!classify("the llama sculpture in the hall was wonderful", "Ana"));
    }

    #[test]
    fn test_denylist_flagged() {
        assert!(classify(
            "Click Here for a limited offer on museum tickets",
            "promo"
        ));
        assert!(classify(
            "amazing CRYPTO GIVEAWAY happening at the old town square",
            "x"
        ));
    }

    #[test]
    fn test_denylist_in_display_name() {
        assert!(classify(
            "A perfectly reasonable story about the cathedral frescoes",
            "hot singles near you"
        ));
    }

    #[test]
    fn test_deterministic() {
        let text = "The panoramic view from the bell tower took my breath away";
        assert_eq!(classify(text, "Elena"), classify(text, "Elena"));
    }
}
