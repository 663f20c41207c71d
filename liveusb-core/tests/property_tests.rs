//! Property-based tests for the boot configuration rewriter.
//!
//! These tests verify:
//! - Lines that never mention the content label pass through untouched
//! - Line count and line order are preserved
//! - No content-label reference survives a rewrite

use liveusb_core::bootcfg::{rewrite_config, rewrite_line};
use proptest::prelude::*;

/// A single config line without a newline. May or may not mention CDLABEL.
fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 =./:_\t-]{0,60}",
        "[a-z ]{0,10}(root=live:)?CDLABEL=[A-Za-z0-9_-]{1,20}( rootfstype=[a-z0-9]{1,8})?[a-z ]{0,10}",
    ]
}

/// A volume label as FAT allows it.
fn label_strategy() -> impl Strategy<Value = String> {
    "[A-Z0-9_]{1,11}"
}

proptest! {
    /// Lines without CDLABEL are copied verbatim.
    #[test]
    fn lines_without_content_label_are_unchanged(
        line in "[a-zA-Z0-9 =./:_\t-]{0,80}",
        label in label_strategy(),
    ) {
        prop_assume!(!line.contains("CDLABEL"));
        prop_assert_eq!(rewrite_line(&line, &label), line);
    }

    /// Output has exactly as many lines as input, in the same order.
    #[test]
    fn line_count_is_preserved(
        lines in prop::collection::vec(line_strategy(), 0..30),
        crlf in any::<bool>(),
        trailing in any::<bool>(),
        label in label_strategy(),
    ) {
        let sep = if crlf { "\r\n" } else { "\n" };
        let mut text = lines.join(sep);
        if trailing && !lines.is_empty() {
            text.push_str(sep);
        }

        let out = rewrite_config(&text, &label);
        prop_assert_eq!(out.lines().count(), text.lines().count());
        prop_assert_eq!(out.matches('\n').count(), text.matches('\n').count());
        for (before, after) in text.lines().zip(out.lines()) {
            if !before.contains("CDLABEL") {
                prop_assert_eq!(before, after);
            }
        }
    }

    /// Every content-label reference is replaced by the volume label.
    #[test]
    fn content_labels_are_replaced(line in line_strategy(), label in label_strategy()) {
        let out = rewrite_line(&line, &label);
        prop_assert!(!out.contains("CDLABEL="));
        if line.contains("CDLABEL=") {
            let expected = format!("LABEL={}", label);
            prop_assert!(out.contains(&expected));
            prop_assert!(!out.contains("rootfstype=") || out.contains("rootfstype=vfat"));
        }
    }
}
