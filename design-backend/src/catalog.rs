use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectModel {
    pub model_id: String,
    pub name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub object_type: String,
    pub models: Vec<ObjectModel>,
}

/// The placeable object types and the 3D models available for each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCatalog {
    entries: Vec<CatalogEntry>,
}

/// Type and model used when nothing better is known.
pub const DEFAULT_OBJECT_TYPE: &str = "table";
pub const DEFAULT_MODEL_ID: &str = "001";

fn entry(object_type: &str, models: [(&str, &str); 2]) -> CatalogEntry {
    CatalogEntry {
        object_type: object_type.to_string(),
        models: models
            .iter()
            .map(|(id, name)| ObjectModel {
                model_id: id.to_string(),
                name: name.to_string(),
                image_url: String::new(),
            })
            .collect(),
    }
}

impl Default for ObjectCatalog {
    fn default() -> Self {
        Self::new(vec![
            entry("table", [("001", "Round Table"), ("002", "Square Table")]),
            entry("chair", [("001", "Office Chair"), ("002", "Dining Chair")]),
            entry("bed", [("001", "Queen Bed"), ("002", "King Bed")]),
            entry("sofa", [("001", "L-Shaped Sofa"), ("002", "3-Seater Sofa")]),
            entry("desk", [("001", "Office Desk"), ("002", "Standing Desk")]),
            entry("cabinet", [("001", "Storage Cabinet"), ("002", "Display Cabinet")]),
            entry("shelf", [("001", "Bookshelf"), ("002", "Wall Shelf")]),
        ])
    }
}

impl ObjectCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Type names in catalog order.
    pub fn type_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.object_type.clone()).collect()
    }

    pub fn models(&self, object_type: &str) -> Option<&[ObjectModel]> {
        self.entries
            .iter()
            .find(|e| e.object_type == object_type)
            .map(|e| e.models.as_slice())
    }

    pub fn model(&self, object_type: &str, model_id: &str) -> Option<&ObjectModel> {
        self.models(object_type)?
            .iter()
            .find(|m| m.model_id == model_id)
    }

    /// First model listed for a type.
    pub fn default_model(&self, object_type: &str) -> Option<&ObjectModel> {
        self.models(object_type)?.first()
    }
}
