//! Questionnaire Definition
//!
//! The six-section garden questionnaire. Question ids double as the field
//! vocabulary for image-derived answers, so the normalizer and the image
//! analysis request both read from this one definition.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub label: &'static str,
    pub value: &'static str,
    pub allow_custom: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: &'static [QuestionOption],
    pub section: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub questions: &'static [Question],
}

/// Full questionnaire definition
#[derive(Debug, Clone, Serialize)]
pub struct Questionnaire {
    pub sections: &'static [Section],
}

const fn opt(label: &'static str, value: &'static str) -> QuestionOption {
    QuestionOption { label, value, allow_custom: false }
}

const fn custom(label: &'static str, value: &'static str) -> QuestionOption {
    QuestionOption { label, value, allow_custom: true }
}

// ============================================================================
// EMBEDDED QUESTIONNAIRE
// ============================================================================

static SECTIONS: &[Section] = &[
    Section {
        id: "general",
        title: "General Information",
        questions: &[
            Question {
                id: "landSize",
                text: "What is the approximate size of your land?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Small (Less than 500 m²)", "small"),
                    opt("Medium (500 m² - 2000 m²)", "medium"),
                    opt("Large (More than 2000 m²)", "large"),
                ],
                section: "general",
            },
            Question {
                id: "landUse",
                text: "What is the main use of your land?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Private garden", "private_garden"),
                    opt("Agricultural land", "agricultural"),
                    opt("Mixed-use (garden + small-scale farming)", "mixed"),
                    custom("Other", "other"),
                ],
                section: "general",
            },
            Question {
                id: "currentMeasures",
                text: "Do you currently take measures to promote biodiversity?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes", "yes"),
                    opt("No", "no"),
                    opt("Not sure", "not_sure"),
                ],
                section: "general",
            },
        ],
    },
    Section {
        id: "habitat",
        title: "Habitat Features and Vegetation",
        questions: &[
            Question {
                id: "vegetationTypes",
                text: "What types of vegetation are present on your land? (Check all that apply)",
                kind: QuestionKind::Multiple,
                options: &[
                    opt("Lawn/grass", "lawn"),
                    opt("Wildflower meadow", "wildflower"),
                    opt("Native trees and shrubs", "native_trees"),
                    opt("Exotic/non-native plants", "exotic"),
                    opt("Vegetables/fruits (e.g., in a garden or orchard)", "vegetables"),
                    custom("Other", "other"),
                ],
                section: "habitat",
            },
            Question {
                id: "nativeSpecies",
                text: "Do you plant native species to support local biodiversity?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, mostly native plants", "mostly_native"),
                    opt("Some native, some non-native", "mixed"),
                    opt("No, mostly non-native", "mostly_non_native"),
                ],
                section: "habitat",
            },
            Question {
                id: "vegetationHeight",
                text: "Is there a mix of vegetation heights (e.g., ground cover, shrubs, trees)?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, diverse vegetation layers", "diverse"),
                    opt("Some variation, but not many layers", "some_variation"),
                    opt("Mostly uniform height (e.g., lawn only)", "uniform"),
                ],
                section: "habitat",
            },
        ],
    },
    Section {
        id: "wildlife",
        title: "Wildlife Habitats",
        questions: &[
            Question {
                id: "wildlifeFeatures",
                text: "Do you have any of the following wildlife-friendly features on your land? (Check all that apply)",
                kind: QuestionKind::Multiple,
                options: &[
                    opt("Hedgehog house", "hedgehog_house"),
                    opt("Birdhouses", "birdhouses"),
                    opt("Bat boxes", "bat_boxes"),
                    opt("Bee hotel", "bee_hotel"),
                    opt("Log piles or brush piles (for insects and small mammals)", "log_piles"),
                    opt("None", "none"),
                ],
                section: "wildlife",
            },
            Question {
                id: "waterFeatures",
                text: "Do you have any water features?",
                kind: QuestionKind::Single,
                options: &[
                    opt("A natural pond or stream", "natural_pond"),
                    opt("A man-made pond", "man_made_pond"),
                    opt("No water feature", "no_water"),
                ],
                section: "wildlife",
            },
            Question {
                id: "foodSources",
                text: "Do you provide food sources for wildlife (e.g., flowers for pollinators, fruit trees, bird feeders)?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, year-round", "year_round"),
                    opt("Yes, but seasonally", "seasonally"),
                    opt("No", "no"),
                ],
                section: "wildlife",
            },
        ],
    },
    Section {
        id: "management",
        title: "Land Management Practices",
        questions: &[
            Question {
                id: "grassManagement",
                text: "How do you manage grass and lawns?",
                kind: QuestionKind::Single,
                options: &[
                    opt("I mow regularly and keep it short", "mow_regularly"),
                    opt("I leave some areas uncut to support wildlife", "leave_uncut"),
                    opt("I use rotational or phased mowing to encourage biodiversity", "rotational_mowing"),
                ],
                section: "management",
            },
            Question {
                id: "chemicalUse",
                text: "Do you use chemical pesticides or herbicides?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, frequently", "frequently"),
                    opt("Occasionally", "occasionally"),
                    opt("No, I use natural pest control methods", "natural_methods"),
                ],
                section: "management",
            },
            Question {
                id: "soilHealth",
                text: "How do you manage soil health and fertility?",
                kind: QuestionKind::Single,
                options: &[
                    opt("I compost and use organic matter", "compost"),
                    opt("I use chemical fertilizers", "chemical_fertilizers"),
                    opt("I don't actively manage soil health", "no_management"),
                ],
                section: "management",
            },
        ],
    },
    Section {
        id: "connectivity",
        title: "Connectivity and Sustainability",
        questions: &[
            Question {
                id: "landConnectivity",
                text: "Is your land connected to other green areas (e.g., hedgerows, corridors to forests, neighboring gardens with biodiversity-friendly features)?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, well-connected", "well_connected"),
                    opt("Somewhat connected", "somewhat_connected"),
                    opt("No, isolated", "isolated"),
                ],
                section: "connectivity",
            },
            Question {
                id: "wildlifeBarriers",
                text: "Are there any barriers that prevent wildlife movement (e.g., solid fences, walls without openings, roads)?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, many barriers", "many_barriers"),
                    opt("Some barriers, but with openings", "some_barriers"),
                    opt("No, my land is accessible to wildlife", "accessible"),
                ],
                section: "connectivity",
            },
            Question {
                id: "sustainableUse",
                text: "Do you have any areas dedicated to sustainable land use (e.g., permaculture, regenerative farming, water retention features like a wadi)?",
                kind: QuestionKind::Single,
                options: &[opt("Yes", "yes"), opt("No", "no")],
                section: "connectivity",
            },
        ],
    },
    Section {
        id: "future",
        title: "Future Plans",
        questions: &[
            Question {
                id: "improvements",
                text: "Are you interested in making improvements to enhance biodiversity?",
                kind: QuestionKind::Single,
                options: &[
                    opt("Yes, I'm actively looking for ways to improve", "actively_looking"),
                    opt("Maybe, but I need more information", "maybe"),
                    opt("No, I'm satisfied with the current state", "satisfied"),
                ],
                section: "future",
            },
            Question {
                id: "aspectsToImprove",
                text: "Which aspects of biodiversity would you like to improve? (Check all that apply)",
                kind: QuestionKind::Multiple,
                options: &[
                    opt("More wildlife habitats (e.g., birdhouses, bee hotels)", "wildlife_habitats"),
                    opt("Increasing plant diversity", "plant_diversity"),
                    opt("Water retention and sustainable management", "water_retention"),
                    opt("Reducing pesticide use", "reducing_pesticide"),
                    opt("Encouraging pollinators", "encouraging_pollinators"),
                    custom("Other", "other"),
                ],
                section: "future",
            },
        ],
    },
];

impl Questionnaire {
    /// The built-in garden questionnaire
    pub fn garden() -> Self {
        Self { sections: SECTIONS }
    }

    pub fn questions(&self) -> impl Iterator<Item = &'static Question> + '_ {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    pub fn question(&self, id: &str) -> Option<&'static Question> {
        self.questions().find(|q| q.id == id)
    }

    /// Section id owning a question, if the question is known
    pub fn section_of(&self, question_id: &str) -> Option<&'static str> {
        self.question(question_id).map(|q| q.section)
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::garden()
    }
}
