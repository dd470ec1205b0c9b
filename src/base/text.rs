//! Plain text processing for inbound mentions and outbound chunks.

/// Removes every `<@bot_user_id>` marker from `text` and trims the result.
pub fn strip_mention(text: &str, bot_user_id: &str) -> String {
    if bot_user_id.is_empty() {
        return text.trim().to_string();
    }

    let marker = format!("<@{bot_user_id}>");

    text.replace(&marker, "").trim().to_string()
}

/// Splits `text` into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace; the punctuation stays
/// with the sentence it ends. Segments are trimmed and empty ones are dropped.
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        if let Some(&(_, next)) = chars.peek()
            && next.is_whitespace()
        {
            let end = index + c.len_utf8();
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }

    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, segment: &'a str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        sentences.push(segment);
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_delimiters() {
        assert_eq!(split_into_sentences("Hello there. How are you? Fine!"), vec!["Hello there.", "How are you?", "Fine!"]);
    }

    #[test]
    fn test_split_single_sentence_is_trimmed_input() {
        assert_eq!(split_into_sentences("  just one sentence.  "), vec!["just one sentence."]);
        assert_eq!(split_into_sentences("no punctuation at all"), vec!["no punctuation at all"]);
    }

    #[test]
    fn test_split_is_idempotent_on_clean_input() {
        let once = split_into_sentences("Hello there.");
        let twice = split_into_sentences(once[0]);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_split_ignores_punctuation_without_whitespace() {
        assert_eq!(split_into_sentences("Version 1.2.3 shipped! Really?"), vec!["Version 1.2.3 shipped!", "Really?"]);
        assert_eq!(split_into_sentences("Wait... what?"), vec!["Wait...", "what?"]);
    }

    #[test]
    fn test_split_drops_empty_segments() {
        assert!(split_into_sentences("").is_empty());
        assert!(split_into_sentences("   \n ").is_empty());
        assert_eq!(split_into_sentences("One.\n\n\nTwo."), vec!["One.", "Two."]);
    }

    #[test]
    fn test_strip_mention_removes_all_markers() {
        assert_eq!(strip_mention("<@U123> hi <@U123>", "U123"), "hi");
        assert_eq!(strip_mention("<@U999> hi", "U123"), "<@U999> hi");
        assert_eq!(strip_mention("  <@U123>  ", "U123"), "");
    }
}
