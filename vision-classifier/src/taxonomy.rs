use serde::{Deserialize, Serialize};

/// A furniture or fixture category, described by shape rather than size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureType {
    pub id: String,
    pub name: String,
    /// Typical top-down aspect ratio, e.g. "wide (2:1)"
    pub aspect_ratio: String,
    pub description: String,
}

impl FurnitureType {
    fn new(id: &str, name: &str, aspect_ratio: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            aspect_ratio: aspect_ratio.to_string(),
            description: description.to_string(),
        }
    }
}

/// Id every taxonomy falls back to when a label can't be matched.
pub const OTHER_ID: &str = "other";

/// The set of labels a region may be classified as.
///
/// Passed explicitly to the classifier so callers can swap in their own catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureTaxonomy {
    types: Vec<FurnitureType>,
}

impl Default for FurnitureTaxonomy {
    fn default() -> Self {
        Self::new(vec![
            // Architectural elements
            FurnitureType::new("door", "Door", "wide (2.5:1)", "Thin rectangular, usually along walls"),
            FurnitureType::new("window", "Window", "wide (4:1)", "Very thin rectangular along walls"),
            FurnitureType::new("wall", "Wall", "very wide (15:1)", "Long thin lines"),
            // Bedroom
            FurnitureType::new("bed", "Bed", "rectangular (3:4)", "Medium rectangle, usually against wall"),
            FurnitureType::new("dresser", "Dresser", "wide (2.5:1)", "Wide shallow rectangle against wall"),
            // Seating
            FurnitureType::new("chair", "Chair", "square (1:1)", "Small square or circular, any size"),
            FurnitureType::new("couch", "Couch/Sofa", "wide (2:1)", "Long rectangle, usually against wall"),
            // Tables
            FurnitureType::new(
                "table",
                "Table",
                "square to rectangular (1:1 to 3:2)",
                "Square or slightly rectangular, can be any size (dining table, coffee table, side table, bedside table, etc.)",
            ),
            FurnitureType::new("desk", "Desk", "rectangular (2:1)", "Rectangular, often against wall"),
            // Bathroom
            FurnitureType::new("toilet", "Toilet", "tall (1:1.5)", "Small, slightly taller than wide"),
            FurnitureType::new("sink", "Sink", "square (1:1)", "Small square, usually wall-mounted"),
            FurnitureType::new("bathtub", "Bathtub", "rectangular (2:1)", "Long rectangle"),
            FurnitureType::new("shower", "Shower", "square (1:1)", "Square enclosure"),
            // Kitchen
            FurnitureType::new("kitchen_counter", "Kitchen Counter", "very wide (4:1)", "Long thin rectangle along wall"),
            FurnitureType::new("refrigerator", "Refrigerator", "square to tall (1:1.3)", "Slightly taller than wide"),
            FurnitureType::new("oven", "Oven/Stove", "square (1:1)", "Square appliance"),
            FurnitureType::new("dishwasher", "Dishwasher", "square (1:1)", "Square, built into counter"),
            // Storage
            FurnitureType::new("cabinet", "Cabinet", "rectangular (2:1)", "Rectangular storage"),
            FurnitureType::new("closet", "Closet", "rectangular (1.5:1)", "Rectangular enclosed space"),
            // Other
            FurnitureType::new("stairs", "Stairs", "tall (1:2.5)", "Vertical rectangle with steps"),
            FurnitureType::new(OTHER_ID, "Other/Unknown", "any", "Unknown object"),
        ])
    }
}

impl FurnitureTaxonomy {
    /// Build a taxonomy, appending an `other` entry if the list lacks one.
    pub fn new(mut types: Vec<FurnitureType>) -> Self {
        if !types.iter().any(|t| t.id == OTHER_ID) {
            types.push(FurnitureType::new(OTHER_ID, "Other/Unknown", "any", "Unknown object"));
        }
        Self { types }
    }

    pub fn types(&self) -> &[FurnitureType] {
        &self.types
    }

    pub fn get(&self, id: &str) -> Option<&FurnitureType> {
        self.types.iter().find(|t| t.id == id)
    }

    /// The catch-all entry. Always present.
    pub fn other(&self) -> &FurnitureType {
        self.types
            .iter()
            .find(|t| t.id == OTHER_ID)
            .unwrap_or(&self.types[self.types.len() - 1])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// One line per type, in the form the classification prompt lists them.
    pub fn prompt_listing(&self) -> String {
        self.types
            .iter()
            .map(|t| {
                format!(
                    "- {}: {} - Aspect ratio: {} - {}",
                    t.id, t.name, t.aspect_ratio, t.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
