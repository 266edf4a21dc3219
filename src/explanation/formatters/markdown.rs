use crate::explanation::types::{MeasureCard, RecommendationView};

/// Markdown formatter for recommendation views
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    /// Format view as markdown
    pub fn format(view: &RecommendationView) -> String {
        let mut md = String::with_capacity(1024 + view.cards.len() * 512);

        md.push_str("# Biodiversity Recommendations\n\n");
        if let Some(notice) = &view.notice {
            md.push_str(&format!("> {}\n\n", notice));
        }

        if view.cards.is_empty() {
            md.push_str("No measures to recommend.\n");
            return md;
        }

        // Summary table
        md.push_str("| # | Measure | Points |\n");
        md.push_str("|---|---------|--------|\n");
        for card in &view.cards {
            md.push_str(&format!(
                "| {} | {} {} | {}/{} |\n",
                card.rank, card.emoji, card.title, card.total_points, view.max_total
            ));
        }
        md.push('\n');

        for card in &view.cards {
            Self::format_card(&mut md, card, view.max_total);
        }

        md
    }

    fn format_card(md: &mut String, card: &MeasureCard, max_total: u32) {
        md.push_str(&format!("## {}. {} {}\n\n", card.rank, card.emoji, card.title));
        md.push_str(&format!(
            "**Total Points:** {}/{} ({:.0}%)\n\n",
            card.total_points, max_total, card.progress
        ));

        for line in &card.points {
            md.push_str(&format!("- **{}:** {}  \n", line.label, line.points));
            md.push_str(&format!("  *{}*\n", line.reasoning));
        }
        md.push('\n');

        if !card.description.is_empty() {
            md.push_str(&format!("{}\n\n", card.description));
        }

        if !card.benefits.is_empty() {
            md.push_str("### Benefits\n\n");
            for benefit in &card.benefits {
                md.push_str(&format!("- {}\n", benefit));
            }
            md.push('\n');
        }

        if !card.implementation_tips.is_empty() {
            md.push_str(&format!("*Tip:* {}\n\n", card.implementation_tips));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MeasureCatalog;
    use crate::error::ResponseIssue;
    use crate::explanation::ExplanationGenerator;
    use crate::scorer::{RecommendationSet, ScoreScale};

    #[test]
    fn test_format_fallback_markdown() {
        let set = RecommendationSet::fallback(
            &MeasureCatalog::builtin(),
            ScoreScale::FivePoint,
            ResponseIssue::malformed("garbage"),
        );
        let md = MarkdownFormatter::format(&ExplanationGenerator::generate(&set));

        assert!(md.starts_with("# Biodiversity Recommendations"));
        assert!(md.contains("> We could not tailor"));
        assert!(md.contains("| 1 | 🐝 Bee Hotels | 8/15 |"));
        assert!(md.contains("**Total Points:** 8/15 (53%)"));
        assert!(md.contains("### Benefits"));
    }

    #[test]
    fn test_format_empty_view() {
        let view = RecommendationView {
            scale: "five-point-v1".to_string(),
            max_total: 15,
            notice: None,
            cards: vec![],
        };
        let md = MarkdownFormatter::format(&view);
        assert!(md.contains("No measures to recommend."));
    }
}
