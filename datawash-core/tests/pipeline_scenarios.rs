// datawash-core/tests/pipeline_scenarios.rs
//! End-to-end behaviour of the cleaning pipeline against the default config.

use anyhow::Result;
use datawash_core::config::{CleaningConfig, CleaningOptions, CleaningRule};
use datawash_core::engine::SanitizationEngine;
use datawash_core::sanitizers::policy::normalize_whitespace;
use datawash_core::{sanitize_record, CleanStatus, RawRecord, RegexEngine, TRUNCATE_MARKER};

fn default_engine() -> RegexEngine {
    RegexEngine::with_default_config().expect("default config parses")
}

fn rule(name: &str, pattern: &str, replacement: &str) -> CleaningRule {
    CleaningRule {
        name: name.to_string(),
        description: String::new(),
        pattern: Some(pattern.to_string()),
        replacement: replacement.to_string(),
        enabled: true,
    }
}

#[test_log::test]
fn scenario_html_markup_is_removed() {
    let record = RawRecord::new("a", "web", "<div>Hello <strong>World</strong>!</div>");
    let cleaned = default_engine().sanitize(&record);

    assert_eq!(cleaned.cleaned_content, "Hello World!");
    assert!(cleaned.was_applied("removeHtmlTags"));
    assert_eq!(cleaned.status, CleanStatus::Success);
}

#[test_log::test]
fn scenario_urls_are_replaced_with_placeholder() {
    let record = RawRecord::new("b", "weibo", "访问我们的网站 https://example.com 了解更多");
    let cleaned = default_engine().sanitize(&record);

    assert_eq!(cleaned.cleaned_content, "访问我们的网站 [链接] 了解更多");
    assert!(cleaned.was_applied("removeUrls"));
}

#[test_log::test]
fn scenario_short_content_is_partial() {
    let cleaned = default_engine().sanitize(&RawRecord::new("c", "sms", "Hi"));

    assert_eq!(cleaned.status, CleanStatus::Partial);
    assert!(cleaned.diagnostics().iter().any(|e| e.contains("below minimum 10")));
    assert_eq!(cleaned.cleaned_content, "Hi");
}

#[test_log::test]
fn scenario_long_content_is_truncated() {
    let content = "This sentence is deliberately long so that truncation kicks in here.";
    assert_eq!(content.chars().count(), 68);

    let engine = default_engine();
    let mut config = engine.get_config().clone();
    config.options.max_length = 20;
    let cleaned = engine.sanitize_with(&RawRecord::new("d", "blog", content), &config);

    assert_eq!(cleaned.cleaned_content.chars().count(), 20);
    assert_eq!(cleaned.cleaned_content, "This sentence is del");
    assert!(cleaned.was_applied(TRUNCATE_MARKER));
    assert_eq!(cleaned.status, CleanStatus::Success);
}

#[test_log::test]
fn scenario_batch_does_not_short_circuit_on_partial() {
    let records = vec![
        RawRecord::new("ok", "feed", "A perfectly ordinary sentence."),
        RawRecord::new("empty", "feed", "<p>   </p>"),
    ];
    let items = default_engine().sanitize_batch(&records);

    assert_eq!(items.len(), 2);
    let first = items[0].as_ref().expect("first item processed");
    let second = items[1].as_ref().expect("second item processed");
    assert_eq!(first.status, CleanStatus::Success);
    assert_eq!(second.status, CleanStatus::Partial);
    assert_eq!(second.cleaned_content, "");
    assert!(second.diagnostics()[0].contains("cleaned length 0 below minimum 10"));
}

#[test_log::test]
fn original_content_is_preserved_for_every_status() {
    let engine = default_engine();
    for content in ["<b>bold statement here</b>", "Hi", ""] {
        let cleaned = engine.sanitize(&RawRecord::new("x", "t", content));
        assert_eq!(cleaned.original_content, content);
    }
}

#[test_log::test]
fn applied_rules_follow_config_order() {
    let options = CleaningOptions { min_length: 0, ..CleaningOptions::default() };
    let forward = CleaningConfig {
        rules: vec![rule("digits", "[0-9]", ""), rule("vowels", "[aeiou]", "")],
        options: options.clone(),
    };
    let reversed = CleaningConfig {
        rules: vec![rule("vowels", "[aeiou]", ""), rule("digits", "[0-9]", "")],
        options,
    };
    let record = RawRecord::new("o", "t", "abc 123");

    let a = sanitize_record(&record, &forward);
    let b = sanitize_record(&record, &reversed);

    assert_eq!(a.applied_rules, vec!["digits", "vowels"]);
    assert_eq!(b.applied_rules, vec!["vowels", "digits"]);
    assert_eq!(a.cleaned_content, b.cleaned_content);
}

#[test_log::test]
fn recleaning_cleaned_output_is_stable() {
    let engine = default_engine();
    let first = engine.sanitize(&RawRecord::new("i", "t", "  lots\t of \n\n  spacing   here  "));
    let second = engine.sanitize(&RawRecord::new("i", "t", first.cleaned_content.clone()));

    assert_eq!(first.cleaned_content, "lots of spacing here");
    assert_eq!(second.cleaned_content, first.cleaned_content);
    assert_eq!(normalize_whitespace(&first.cleaned_content), first.cleaned_content);
}

#[test_log::test]
fn emoji_and_control_characters_are_removed() {
    let cleaned = default_engine().sanitize(&RawRecord::new("e", "chat", "Great launch 🚀🎉 today\u{200B}!"));
    assert_eq!(cleaned.cleaned_content, "Great launch today!");
    assert!(cleaned.was_applied("removeEmojis"));
    assert!(cleaned.was_applied("removeControlChars"));
}

#[test_log::test]
fn disabled_rules_never_run() -> Result<()> {
    let config = CleaningConfig::load_default()?;
    assert!(!config.rule("removeSpecialChars").expect("rule exists").enabled);

    let cleaned = sanitize_record(&RawRecord::new("s", "t", "price: $5 & tax #2"), &config);
    assert!(!cleaned.was_applied("removeSpecialChars"));
    assert_eq!(cleaned.cleaned_content, "price: $5 & tax #2");
    Ok(())
}

#[test_log::test]
fn truncation_bound_holds_for_multibyte_text() {
    let mut config = CleaningConfig::load_default().unwrap();
    config.options.min_length = 0;
    config.options.max_length = 4;

    let cleaned = sanitize_record(&RawRecord::new("m", "t", "数据清洗服务正在运行"), &config);
    assert_eq!(cleaned.cleaned_content, "数据清洗");
    assert_eq!(cleaned.applied_rules.last().map(String::as_str), Some(TRUNCATE_MARKER));
}
