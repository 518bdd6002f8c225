//! Token estimation and priority-aware truncation for pack output (§4.8).
//!
//! Token counts are never exact — every pack generator treats the budget as
//! a heuristic ceiling, not a hard character limit enforced by a real
//! tokenizer. The conservative character-per-token ratios below are chosen
//! to stay comfortably under real tokenizer counts for English prose and
//! source code respectively.

use std::collections::HashMap;

const PROSE_CHARS_PER_TOKEN: f64 = 3.5;
const CODE_CHARS_PER_TOKEN: f64 = 3.0;

pub const TRUNCATION_NOTICE: &str = "\n\n---\n[truncated — more via zoom]";

/// Estimate the number of tokens in `text`. Empty strings cost 0 tokens;
/// every other non-empty string costs at least 1.
pub fn estimate_tokens(text: &str, is_code: bool) -> usize {
    if text.is_empty() {
        return 0;
    }
    let ratio = if is_code { CODE_CHARS_PER_TOKEN } else { PROSE_CHARS_PER_TOKEN };
    ((text.chars().count() as f64) / ratio).floor().max(1.0) as usize
}

#[derive(Debug, Clone)]
struct Section {
    header: String,
    content: String,
    priority: u8,
    order: usize,
}

impl Section {
    fn full_text(&self) -> String {
        if self.content.is_empty() {
            self.header.clone()
        } else {
            format!("{}\n{}", self.header, self.content)
        }
    }
}

/// Split Markdown into sections on `#`/`##`/`###` heading boundaries,
/// assigning priority 10/5/3 respectively (unheaded leading text gets
/// priority 0 under a synthetic empty header).
fn parse_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_header = String::new();
    let mut current_priority: u8 = 0;
    let mut current_content = String::new();
    let mut order = 0usize;
    let mut started = false;

    let flush = |sections: &mut Vec<Section>,
                 header: &str,
                 priority: u8,
                 content: &str,
                 order: usize| {
        if !header.is_empty() || !content.trim().is_empty() {
            sections.push(Section {
                header: header.to_string(),
                content: content.trim_end().to_string(),
                priority,
                order,
            });
        }
    };

    for line in text.lines() {
        let trimmed = line.trim_start();
        let heading_priority = if trimmed.starts_with("### ") {
            Some(3)
        } else if trimmed.starts_with("## ") {
            Some(5)
        } else if trimmed.starts_with("# ") {
            Some(10)
        } else {
            None
        };

        if let Some(priority) = heading_priority {
            if started {
                flush(&mut sections, &current_header, current_priority, &current_content, order);
                order += 1;
            }
            current_header = line.to_string();
            current_priority = priority;
            current_content.clear();
            started = true;
        } else if started {
            current_content.push_str(line);
            current_content.push('\n');
        } else {
            // Text before any heading: keep as its own zero-priority section.
            current_content.push_str(line);
            current_content.push('\n');
        }
    }
    flush(&mut sections, &current_header, current_priority, &current_content, order);
    sections
}

/// Truncate Markdown `text` to fit within `budget_tokens`, preserving
/// higher-priority sections (`#` title, then `##`, then `###`) first and
/// falling back to boundary-aware character truncation when no headings are
/// present. Appends [`TRUNCATION_NOTICE`] whenever anything was dropped.
pub fn truncate_to_budget(text: &str, budget_tokens: usize, is_code: bool) -> String {
    if text.is_empty() || budget_tokens == 0 {
        return String::new();
    }

    let current = estimate_tokens(text, is_code);
    if current <= budget_tokens {
        return text.to_string();
    }

    let mut sections = parse_sections(text);
    if sections.is_empty() {
        return simple_truncate(text, budget_tokens, is_code);
    }

    // Highest priority first, stable among equal priorities.
    sections.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)));

    let mut kept = Vec::new();
    let mut used = 0usize;
    let total_sections = sections.len();
    for section in sections {
        let tokens = estimate_tokens(&section.full_text(), is_code);
        if used + tokens <= budget_tokens {
            used += tokens;
            kept.push(section);
        } else {
            break;
        }
    }

    // Restore document order.
    kept.sort_by_key(|s| s.order);

    let mut result = kept.iter().map(Section::full_text).collect::<Vec<_>>().join("\n\n");
    if kept.len() < total_sections {
        result.push_str(TRUNCATION_NOTICE);
    }
    result
}

fn simple_truncate(text: &str, budget_tokens: usize, is_code: bool) -> String {
    let ratio = if is_code { CODE_CHARS_PER_TOKEN } else { PROSE_CHARS_PER_TOKEN };
    let target_chars = ((budget_tokens as f64) * ratio) as usize;

    if text.chars().count() <= target_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(target_chars).collect();

    let last_para = truncated.rfind("\n\n");
    let last_line = truncated.rfind('\n');
    let last_space = truncated.rfind(' ');

    let cut = if let Some(p) = last_para.filter(|&p| p as f64 > target_chars as f64 * 0.7) {
        p
    } else if let Some(l) = last_line.filter(|&l| l as f64 > target_chars as f64 * 0.8) {
        l
    } else if let Some(s) = last_space.filter(|&s| s as f64 > target_chars as f64 * 0.9) {
        s
    } else {
        truncated.len()
    };

    let mut result = truncated[..cut].to_string();
    result.push_str(TRUNCATION_NOTICE);
    result
}

/// Distribute `total` proportionally across the named ratios in `ratios`,
/// normalizing so the shares sum to `total` (modulo integer rounding).
pub fn allocate_budget(total: usize, ratios: &HashMap<&str, f64>) -> HashMap<String, usize> {
    let sum: f64 = ratios.values().sum();
    if sum <= 0.0 {
        return ratios.keys().map(|k| (k.to_string(), 0)).collect();
    }
    ratios
        .iter()
        .map(|(name, ratio)| (name.to_string(), ((total as f64) * ratio / sum).round() as usize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_costs_nothing() {
        assert_eq!(estimate_tokens("", false), 0);
    }

    #[test]
    fn non_empty_string_costs_at_least_one() {
        assert_eq!(estimate_tokens("a", false), 1);
        assert_eq!(estimate_tokens("ab", false), 1);
    }

    #[test]
    fn code_ratio_is_denser_than_prose() {
        let text = "x".repeat(100);
        assert!(estimate_tokens(&text, true) >= estimate_tokens(&text, false));
    }

    #[test]
    fn text_within_budget_is_unchanged() {
        let text = "# Title\n\nshort body";
        assert_eq!(truncate_to_budget(text, 1000, false), text);
    }

    #[test]
    fn truncation_keeps_highest_priority_sections_first() {
        let text = "# Title\n\nAlways kept.\n\n## Section A\n\nBody A.\n\n### Detail\n\nBody detail that is quite long and should be dropped when the budget is tight enough to force a choice between sections.";
        let result = truncate_to_budget(text, 12, false);
        assert!(result.contains("# Title"));
        assert!(result.contains(super::TRUNCATION_NOTICE.trim()));
    }

    #[test]
    fn no_header_text_falls_back_to_char_truncation() {
        let text = "word ".repeat(200);
        let result = truncate_to_budget(&text, 5, false);
        assert!(result.ends_with(TRUNCATION_NOTICE));
        assert!(estimate_tokens(&result, false) <= 10); // generous slack check
    }

    #[test]
    fn budget_conformance_within_ten_percent_slack() {
        let text = "# H\n\n".to_string() + &"lorem ipsum dolor sit amet ".repeat(500);
        for budget in [10, 50, 200, 1000] {
            let truncated = truncate_to_budget(&text, budget, false);
            let tokens = estimate_tokens(&truncated, false);
            assert!(
                tokens as f64 <= budget as f64 * 1.1,
                "budget {budget} exceeded: got {tokens} tokens"
            );
        }
    }

    #[test]
    fn allocate_budget_distributes_proportionally() {
        let mut ratios = HashMap::new();
        ratios.insert("a", 1.0);
        ratios.insert("b", 3.0);
        let shares = allocate_budget(400, &ratios);
        assert_eq!(shares["a"], 100);
        assert_eq!(shares["b"], 300);
    }
}
