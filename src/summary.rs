// src/summary.rs
use crate::session::{Choice, GenerationOptions, SummaryType};

const TITLE_LIMIT: usize = 30;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Removes the last word and any whitespace after it, keeping one separating space.
pub fn drop_last_word(text: &str) -> String {
    let trimmed = text.trim_end();
    let Some(cut) = trimmed.rfind(char::is_whitespace) else {
        return String::new();
    };
    let head = trimmed[..cut].trim_end();
    if head.is_empty() {
        String::new()
    } else {
        format!("{} ", head)
    }
}

pub fn truncate_title(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_LIMIT).collect();
    if text.chars().count() > TITLE_LIMIT {
        title.push_str("...");
    }
    title
}

pub fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

/// How many words of the input survive into the fake summary.
pub fn summary_word_budget(summary_type: SummaryType, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    match summary_type {
        SummaryType::Brief => (total / 4).clamp(1, 30),
        SummaryType::Detailed => (total / 2).clamp(1, 80),
        SummaryType::DeepDive => total.min(150),
    }
}

pub fn build_summary(input: &str, options: &GenerationOptions) -> String {
    let words: Vec<&str> = input.split_whitespace().collect();
    let budget = summary_word_budget(options.summary_type, words.len());
    let mut excerpt = words[..budget].join(" ");
    if budget < words.len() {
        excerpt.push_str("...");
    }
    format!(
        "{} summary for a {} audience ({}, {}):\n{}\n\n{} words condensed to {}.",
        options.summary_type.label(),
        options.audience.label().to_lowercase(),
        options.theme.label().to_lowercase(),
        options.language.label(),
        excerpt,
        words.len(),
        budget
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Audience, Theme};

    #[test]
    fn dropping_the_last_word() {
        assert_eq!(drop_last_word("a  b"), "a ");
        assert_eq!(drop_last_word("word"), "");
        assert_eq!(drop_last_word("hello world   "), "hello ");
        assert_eq!(drop_last_word("  lone"), "");
        assert_eq!(drop_last_word("one\ttwo"), "one ");
        assert_eq!(drop_last_word(""), "");
    }

    #[test]
    fn titles_are_cut_at_thirty_chars() {
        assert_eq!(truncate_title("short"), "short");
        let long = "a".repeat(31);
        assert_eq!(truncate_title(&long), format!("{}...", "a".repeat(30)));
        assert_eq!(truncate_title(&"é".repeat(30)), "é".repeat(30));
    }

    #[test]
    fn username_is_the_local_part() {
        assert_eq!(username_from_email("ada@example.com"), "ada");
        assert_eq!(username_from_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn budgets_follow_summary_type() {
        assert_eq!(summary_word_budget(SummaryType::Brief, 0), 0);
        assert_eq!(summary_word_budget(SummaryType::Brief, 3), 1);
        assert_eq!(summary_word_budget(SummaryType::Brief, 400), 30);
        assert_eq!(summary_word_budget(SummaryType::Detailed, 40), 20);
        assert_eq!(summary_word_budget(SummaryType::Detailed, 1000), 80);
        assert_eq!(summary_word_budget(SummaryType::DeepDive, 12), 12);
        assert_eq!(summary_word_budget(SummaryType::DeepDive, 200), 150);
    }

    #[test]
    fn summary_names_options_and_counts() {
        let options = GenerationOptions {
            theme: Theme::Podcast,
            audience: Audience::Teenager,
            ..Default::default()
        };
        let text = build_summary("one two three four five six seven eight", &options);
        assert!(text.starts_with("Brief summary for a teenager audience (podcast, English):"));
        assert!(text.contains("\none two...\n"));
        assert!(text.ends_with("8 words condensed to 2."));
    }

    #[test]
    fn deep_dive_keeps_short_input_whole() {
        let options = GenerationOptions { summary_type: SummaryType::DeepDive, ..Default::default() };
        let text = build_summary("keep all of this", &options);
        assert!(text.contains("\nkeep all of this\n"));
        assert_eq!(word_count("keep all of this"), 4);
    }
}
