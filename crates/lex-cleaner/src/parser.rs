//! Extraction of code from model replies.
//!
//! Models usually wrap code in a Markdown fence, sometimes with a language
//! tag and some chatter around it. [`extract_code_block`] returns the body of
//! the first fence. When there is no fence the reply is returned unchanged;
//! whether that text is runnable is for the executor to find out.

use once_cell::sync::Lazy;
use regex::Regex;

// Opening fence, optional tag line, lazily matched body, closing fence.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:[\w+.-]*[ \t]*\r?\n)?(.*?)```").expect("Invalid regex: fenced block")
});

/// Return the trimmed body of the first fenced block in `text`, or `text`
/// itself when it contains no complete fence.
pub fn extract_code_block(text: &str) -> String {
    match FENCED_BLOCK.captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => text.to_string(),
    }
}

/// Whether `text` contains a complete fenced block.
pub fn has_code_block(text: &str) -> bool {
    FENCED_BLOCK.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_tagged_block() {
        let reply = "Here is the routine:\n```clean\nfn data_cleaner(df) {\n    return df\n}\n```\nLet me know!";
        assert_eq!(
            extract_code_block(reply),
            "fn data_cleaner(df) {\n    return df\n}"
        );
    }

    #[test]
    fn test_extracts_untagged_block() {
        let reply = "```\nfn data_cleaner(df) { return df }\n```";
        assert_eq!(extract_code_block(reply), "fn data_cleaner(df) { return df }");
    }

    #[test]
    fn test_inline_fence_without_newline() {
        let reply = "```fn data_cleaner(df) { return df }```";
        assert_eq!(extract_code_block(reply), "fn data_cleaner(df) { return df }");
    }

    #[test]
    fn test_first_block_wins() {
        let reply = "```clean\nfirst\n```\nand\n```clean\nsecond\n```";
        assert_eq!(extract_code_block(reply), "first");
    }

    #[test]
    fn test_crlf_line_endings() {
        let reply = "```clean\r\nfn data_cleaner(df) { return df }\r\n```";
        assert_eq!(extract_code_block(reply), "fn data_cleaner(df) { return df }");
    }

    #[test]
    fn test_no_fence_returns_input_unchanged() {
        let reply = "  fn data_cleaner(df) {\n    return df\n}\n\n";
        assert_eq!(extract_code_block(reply), reply);
        assert!(!has_code_block(reply));
    }

    #[test]
    fn test_unterminated_fence_returns_input_unchanged() {
        let reply = "```clean\nfn data_cleaner(df) {";
        assert_eq!(extract_code_block(reply), reply);
    }

    #[test]
    fn test_idempotent_on_bare_source() {
        let reply = "```clean\nfn data_cleaner(df) {\n    return df\n}\n```";
        let once = extract_code_block(reply);
        assert_eq!(extract_code_block(&once), once);
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(extract_code_block("```clean\n```"), "");
        assert!(has_code_block("```clean\n```"));
    }
}
