// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thresholding and rendering of retrieved snippets.

use tijara_core::{ProductMention, RankedSnippet};

/// Snippets that cleared the match threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    /// Kept snippets, best first.
    pub snippets: Vec<RankedSnippet>,
    /// Whether the top snippet reached the confident threshold.
    pub confident: bool,
}

impl RetrievedContext {
    /// Products carried by snippets at or above `confident_threshold`.
    pub fn confident_products(&self, confident_threshold: f32) -> Vec<ProductMention> {
        self.snippets
            .iter()
            .filter(|s| s.score >= confident_threshold)
            .filter_map(|s| s.product.clone())
            .collect()
    }

    pub fn render(&self) -> String {
        self.snippets
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let marker = if i == 0 && self.confident {
                    " (confident match)"
                } else {
                    ""
                };
                format!("{}. [score {:.2}]{marker} {}", i + 1, s.score, s.text.trim())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Drops snippets below `match_threshold` and keeps at most `limit`.
pub fn select_snippets(
    mut snippets: Vec<RankedSnippet>,
    match_threshold: f32,
    confident_threshold: f32,
    limit: usize,
) -> RetrievedContext {
    snippets.retain(|s| s.score >= match_threshold);
    snippets.sort_by(|a, b| b.score.total_cmp(&a.score));
    snippets.truncate(limit);
    let confident = snippets
        .first()
        .is_some_and(|s| s.score >= confident_threshold);
    RetrievedContext {
        snippets,
        confident,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(text: &str, score: f32, product: Option<&str>) -> RankedSnippet {
        RankedSnippet {
            text: text.into(),
            score,
            product: product.map(|name| ProductMention {
                name: name.into(),
                variant: None,
                price: Some(850.0),
            }),
        }
    }

    #[test]
    fn low_scores_are_dropped_and_top_is_marked() {
        let ctx = select_snippets(
            vec![
                snippet("FAQ: shipping 3 days", 0.72, None),
                snippet("Belle Boot, black, 850 EGP", 0.91, Some("Belle Boot")),
                snippet("unrelated", 0.4, None),
            ],
            0.7,
            0.85,
            5,
        );
        assert_eq!(ctx.snippets.len(), 2);
        assert!(ctx.confident);
        assert_eq!(
            ctx.render(),
            "1. [score 0.91] (confident match) Belle Boot, black, 850 EGP\n\
             2. [score 0.72] FAQ: shipping 3 days"
        );
        let products = ctx.confident_products(0.85);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Belle Boot");
    }

    #[test]
    fn middling_match_is_not_confident() {
        let ctx = select_snippets(vec![snippet("Belle Boot", 0.8, Some("Belle Boot"))], 0.7, 0.85, 5);
        assert!(!ctx.confident);
        assert!(ctx.confident_products(0.85).is_empty());
    }

    #[test]
    fn limit_is_applied_after_sorting() {
        let ctx = select_snippets(
            vec![snippet("a", 0.75, None), snippet("b", 0.95, None), snippet("c", 0.8, None)],
            0.7,
            0.85,
            2,
        );
        let texts: Vec<&str> = ctx.snippets.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }
}
