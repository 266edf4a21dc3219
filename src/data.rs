//! Measure Catalog
//!
//! Read-only reference data for every biodiversity measure the service can
//! recommend. The built-in catalog is compiled in; a JSON file with the same
//! shape can replace it at startup (`CATALOG_PATH`). Per-garden scores are
//! never written here, they are joined in by the ranking engine.

use crate::error::CatalogError;
use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Version tag of the compiled-in catalog
pub const BUILTIN_CATALOG_VERSION: &str = "measures-v1";

/// Upper bound for baseline difficulty/impact
pub const BASELINE_MAX: u8 = 5;

/// One biodiversity intervention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub benefits: Vec<String>,
    pub implementation_tips: String,
    pub emoji: String,
    pub baseline_difficulty: u8,
    pub baseline_impact: u8,
}

/// Immutable, versioned measure catalog with an id index
#[derive(Debug, Clone)]
pub struct MeasureCatalog {
    version: String,
    measures: Vec<Measure>,
    index: FxHashMap<u32, usize>,
}

/// On-disk catalog shape
#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    version: String,
    measures: Vec<Measure>,
}

struct BuiltinMeasure {
    id: u32,
    title: &'static str,
    description: &'static str,
    benefits: &'static [&'static str],
    implementation_tips: &'static str,
    emoji: &'static str,
    difficulty: u8,
    impact: u8,
}

// ============================================================================
// EMBEDDED CATALOG (measures-v1)
// ============================================================================

static BUILTIN_MEASURES: &[BuiltinMeasure] = &[
    BuiltinMeasure {
        id: 1,
        title: "Hedgehog House",
        description: "Shelter for hedgehogs to overwinter and breed.",
        benefits: &["Biodiversity", "natural pest control", "wildlife habitat"],
        implementation_tips: "Place in a sheltered, dry spot covered with leaves and twigs. No milk; cat food can be given if needed.",
        emoji: "🦔",
        difficulty: 2,
        impact: 4,
    },
    BuiltinMeasure {
        id: 2,
        title: "Plant Selection",
        description: "Using native, layered vegetation (low plants, shrubs, trees) for year-round biodiversity.",
        benefits: &["Biodiversity", "cooling", "soil health", "ecological management"],
        implementation_tips: "Use native, pollinator-friendly, and pesticide-free plants. Ensure year-round flowering.",
        emoji: "🌿",
        difficulty: 3,
        impact: 5,
    },
    BuiltinMeasure {
        id: 3,
        title: "Vegetable Garden",
        description: "Growing food without chemical pesticides; improving soil health.",
        benefits: &["Biodiversity", "soil health", "sustainability"],
        implementation_tips: "Use companion planting (e.g., marigolds for pest control), compost, and crop rotation.",
        emoji: "🍅",
        difficulty: 3,
        impact: 4,
    },
    BuiltinMeasure {
        id: 4,
        title: "Pond",
        description: "Water feature with shallow edges for wildlife habitat and ecosystem balance.",
        benefits: &["Biodiversity", "water storage", "ecological function"],
        implementation_tips: "Use native water plants, avoid fish to prevent nutrient overload, maintain clean edges.",
        emoji: "💧",
        difficulty: 4,
        impact: 5,
    },
    BuiltinMeasure {
        id: 5,
        title: "Natural Boundaries",
        description: "Using hedgerows, trees, and shrubs instead of fences for natural separation.",
        benefits: &["Biodiversity", "habitat connectivity", "wind protection"],
        implementation_tips: "Plant mixed hedgerows with species like hawthorn, blackthorn, or willow. Avoid impermeable barriers.",
        emoji: "🌳",
        difficulty: 3,
        impact: 4,
    },
    BuiltinMeasure {
        id: 6,
        title: "Trees & Orchards",
        description: "Planting trees, including fruit trees, for ecosystem stability and food sources.",
        benefits: &["Biodiversity", "habitat", "shade", "carbon capture"],
        implementation_tips: "Use native trees; avoid excessive pruning. Incorporate a protective hedge around orchards.",
        emoji: "🍏",
        difficulty: 4,
        impact: 5,
    },
    BuiltinMeasure {
        id: 7,
        title: "Wadi & Flat Bank",
        description: "Creating water retention areas for flood control and biodiversity.",
        benefits: &["Water storage", "biodiversity", "cooling"],
        implementation_tips: "Design for natural water drainage; plant water-tolerant species such as reeds and sedges.",
        emoji: "💦",
        difficulty: 5,
        impact: 4,
    },
    BuiltinMeasure {
        id: 8,
        title: "Flower Strips",
        description: "Planting native wildflower meadows to support pollinators and insects.",
        benefits: &["Pollinators", "biodiversity", "habitat"],
        implementation_tips: "Use native wildflower seed mixes, minimize mowing, avoid fertilizers.",
        emoji: "🦋",
        difficulty: 2,
        impact: 4,
    },
    BuiltinMeasure {
        id: 9,
        title: "Wildlife Corners",
        description: "Leaving areas untidy (piles of wood, stones, compost) to support small animals & insects.",
        benefits: &["Biodiversity", "habitat", "food web support"],
        implementation_tips: "Create brush piles, leave dead wood, avoid chemical treatments.",
        emoji: "🦎",
        difficulty: 1,
        impact: 3,
    },
    BuiltinMeasure {
        id: 10,
        title: "Phased Mowing",
        description: "Rotational mowing to allow insects and plants to thrive.",
        benefits: &["Pollinators", "biodiversity", "soil health"],
        implementation_tips: "Mow in sections, leave some areas undisturbed. Remove cuttings to avoid over-fertilization.",
        emoji: "🌱",
        difficulty: 2,
        impact: 3,
    },
    BuiltinMeasure {
        id: 11,
        title: "Permeable Surfaces",
        description: "Reducing paved areas to increase soil permeability.",
        benefits: &["Biodiversity", "water retention", "soil health"],
        implementation_tips: "Replace impermeable surfaces with gravel, grass pavers, or permeable stones.",
        emoji: "🌍",
        difficulty: 4,
        impact: 4,
    },
    BuiltinMeasure {
        id: 12,
        title: "Owl Nest Boxes",
        description: "Providing safe nesting sites for owls that control rodent populations.",
        benefits: &["Biodiversity", "natural pest control"],
        implementation_tips: "Install in barns or trees, ensure predator protection (e.g., against martens).",
        emoji: "🦉",
        difficulty: 3,
        impact: 4,
    },
    BuiltinMeasure {
        id: 13,
        title: "Bat Boxes",
        description: "Safe roosting spots for bats, which help control insect populations.",
        benefits: &["Biodiversity", "natural pest control"],
        implementation_tips: "Place boxes on buildings or trees near feeding areas (e.g., hedgerows, water bodies).",
        emoji: "🦇",
        difficulty: 2,
        impact: 4,
    },
    BuiltinMeasure {
        id: 14,
        title: "Birdhouses",
        description: "Nesting sites for various bird species.",
        benefits: &["Biodiversity", "pest control", "habitat support"],
        implementation_tips: "Provide different house types for different species. Avoid placing near high-traffic areas.",
        emoji: "🐦",
        difficulty: 2,
        impact: 3,
    },
    BuiltinMeasure {
        id: 15,
        title: "Bee Hotels",
        description: "Nesting sites for wild bees to support pollination.",
        benefits: &["Pollinators", "biodiversity", "food security"],
        implementation_tips: "Use untreated wood, drill holes of varying diameters, place in sunny areas.",
        emoji: "🐝",
        difficulty: 2,
        impact: 5,
    },
];

impl MeasureCatalog {
    /// Compiled-in catalog (15 measures, version `measures-v1`)
    pub fn builtin() -> Self {
        let measures: Vec<Measure> = BUILTIN_MEASURES
            .iter()
            .map(|m| Measure {
                id: m.id,
                title: m.title.to_string(),
                description: m.description.to_string(),
                benefits: m.benefits.iter().map(|b| b.to_string()).collect(),
                implementation_tips: m.implementation_tips.to_string(),
                emoji: m.emoji.to_string(),
                baseline_difficulty: m.difficulty,
                baseline_impact: m.impact,
            })
            .collect();

        let index = build_index(&measures);
        Self {
            version: BUILTIN_CATALOG_VERSION.to_string(),
            measures,
            index,
        }
    }

    /// Build a catalog from explicit measures, enforcing id and baseline invariants
    pub fn from_measures(version: &str, measures: Vec<Measure>) -> Result<Self, CatalogError> {
        if measures.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = FxHashSet::default();
        for measure in &measures {
            if measure.id == 0 {
                return Err(CatalogError::ZeroId);
            }
            if !seen.insert(measure.id) {
                return Err(CatalogError::DuplicateId(measure.id));
            }
            for (field, value) in [
                ("difficulty", measure.baseline_difficulty),
                ("impact", measure.baseline_impact),
            ] {
                if !(1..=BASELINE_MAX).contains(&value) {
                    return Err(CatalogError::BaselineOutOfRange {
                        id: measure.id,
                        field,
                        value,
                        max: BASELINE_MAX,
                    });
                }
            }
        }

        let index = build_index(&measures);
        Ok(Self {
            version: version.to_string(),
            measures,
            index,
        })
    }

    /// Load catalog from a JSON file: `{"version": "...", "measures": [...]}`
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read measure catalog: {:?}", path))?;

        let file: CatalogFile = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse measure catalog JSON")?;

        let catalog = Self::from_measures(&file.version, file.measures)
            .with_context(|| format!("Invalid measure catalog: {:?}", path))?;

        tracing::info!(
            "Loaded measure catalog {} ({} measures)",
            catalog.version,
            catalog.len()
        );
        Ok(catalog)
    }

    pub fn get(&self, id: u32) -> Option<&Measure> {
        self.index.get(&id).map(|&idx| &self.measures[idx])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Highest id in the catalog (upper bound of the valid id range)
    pub fn max_id(&self) -> u32 {
        self.measures.iter().map(|m| m.id).max().unwrap_or(0)
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}

fn build_index(measures: &[Measure]) -> FxHashMap<u32, usize> {
    measures
        .iter()
        .enumerate()
        .map(|(idx, m)| (m.id, idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_ids_are_contiguous() {
        let catalog = MeasureCatalog::builtin();
        assert_eq!(catalog.len(), 15);
        assert_eq!(catalog.max_id(), 15);
        for id in 1..=15 {
            assert!(catalog.contains(id), "missing measure {}", id);
        }
        assert_eq!(catalog.version(), BUILTIN_CATALOG_VERSION);
    }

    #[test]
    fn test_builtin_catalog_passes_validation() {
        let builtin = MeasureCatalog::builtin();
        let rebuilt = MeasureCatalog::from_measures("copy", builtin.measures().to_vec());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = MeasureCatalog::builtin();
        let pond = catalog.get(4).unwrap();
        assert_eq!(pond.title, "Pond");
        assert_eq!(pond.baseline_difficulty, 4);
        assert_eq!(pond.baseline_impact, 5);
        assert!(catalog.get(99).is_none());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut measures = MeasureCatalog::builtin().measures().to_vec();
        measures[1].id = 1;
        let err = MeasureCatalog::from_measures("dup", measures).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(1)));
    }

    #[test]
    fn test_rejects_out_of_range_baseline() {
        let mut measures = MeasureCatalog::builtin().measures().to_vec();
        measures[0].baseline_impact = 6;
        let err = MeasureCatalog::from_measures("bad", measures).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::BaselineOutOfRange { id: 1, field: "impact", .. }
        ));
    }

    #[test]
    fn test_rejects_empty_and_zero_id() {
        assert!(matches!(
            MeasureCatalog::from_measures("empty", vec![]).unwrap_err(),
            CatalogError::Empty
        ));

        let mut measures = MeasureCatalog::builtin().measures().to_vec();
        measures[3].id = 0;
        assert!(matches!(
            MeasureCatalog::from_measures("zero", measures).unwrap_err(),
            CatalogError::ZeroId
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "measure_catalog_{}.json",
            std::process::id()
        ));
        let file = CatalogFile {
            version: "measures-test".to_string(),
            measures: MeasureCatalog::builtin().measures()[..3].to_vec(),
        };
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let catalog = MeasureCatalog::load(&path).unwrap();
        assert_eq!(catalog.version(), "measures-test");
        assert_eq!(catalog.max_id(), 3);

        fs::remove_file(&path).ok();
    }
}
