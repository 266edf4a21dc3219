use crate::explanation::types::RecommendationView;

/// Whitespace layout of a rendered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// Single line, used for API bodies
    Compact,
    /// Indented, for saving or reading by hand
    Pretty,
}

impl JsonLayout {
    /// Map a render format name ("json", "json-pretty") to a layout
    pub fn from_format_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(JsonLayout::Compact),
            "json-pretty" => Some(JsonLayout::Pretty),
            _ => None,
        }
    }
}

/// Serializes measure cards for export
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(view: &RecommendationView, layout: JsonLayout) -> Result<String, serde_json::Error> {
        match layout {
            JsonLayout::Compact => serde_json::to_string(view),
            JsonLayout::Pretty => serde_json::to_string_pretty(view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explanation::types::*;

    fn bee_hotel_view() -> RecommendationView {
        RecommendationView {
            scale: "five-point-v1".to_string(),
            max_total: 15,
            notice: None,
            cards: vec![MeasureCard {
                rank: 1,
                measure_id: 15,
                emoji: "🐝".to_string(),
                title: "Bee Hotels".to_string(),
                total_points: 8,
                progress: 53.3,
                points: vec![PointLine {
                    label: "Impact Points".to_string(),
                    points: 5,
                    reasoning: NO_REASONING.to_string(),
                }],
                description: String::new(),
                benefits: vec![],
                implementation_tips: String::new(),
            }],
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(JsonLayout::from_format_name("json"), Some(JsonLayout::Compact));
        assert_eq!(JsonLayout::from_format_name("json-pretty"), Some(JsonLayout::Pretty));
        assert_eq!(JsonLayout::from_format_name("markdown"), None);
    }

    #[test]
    fn test_layouts_carry_same_cards() {
        let view = bee_hotel_view();
        let compact = JsonFormatter::format(&view, JsonLayout::Compact).unwrap();
        let pretty = JsonFormatter::format(&view, JsonLayout::Pretty).unwrap();

        assert_eq!(compact.lines().count(), 1);
        assert!(pretty.lines().count() > 1);

        let a: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let b: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["cards"][0]["measureId"], 15);
        assert_eq!(a["cards"][0]["points"][0]["reasoning"], NO_REASONING);
    }
}
