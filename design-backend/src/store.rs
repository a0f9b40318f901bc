use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::scene::UnityScene;

/// Point on the floorplan, in the editor's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position2D {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

fn unit() -> f64 {
    1.0
}

/// Footprint of an object on the floorplan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions2D {
    #[serde(default = "unit")]
    pub x: f64,
    #[serde(default = "unit")]
    pub y: f64,
}

impl Default for Dimensions2D {
    fn default() -> Self {
        Self { x: unit(), y: unit() }
    }
}

/// A piece of furniture placed on a constructed floorplan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorplanObject {
    pub object_id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub model_id: String,
    pub position: Position2D,
    pub dimensions: Dimensions2D,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorplanData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_floorplan_url: Option<String>,
    #[serde(default)]
    pub objects: Vec<FloorplanObject>,
    #[serde(default)]
    pub constructed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub created_at: DateTime<Utc>,
    pub sketch_data: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub floorplan_data: Option<FloorplanData>,
    pub scene_data: Option<UnityScene>,
}

impl Project {
    fn new(project_id: String) -> Self {
        Self {
            project_id,
            created_at: Utc::now(),
            sketch_data: None,
            image_url: None,
            floorplan_data: None,
            scene_data: None,
        }
    }

    /// Objects of a constructed floorplan, if there is one.
    pub fn constructed_objects(&self) -> Option<&[FloorplanObject]> {
        self.floorplan_data
            .as_ref()
            .filter(|data| data.constructed)
            .map(|data| data.objects.as_slice())
    }
}

/// In-memory project storage shared by all handlers. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    projects: Arc<RwLock<HashMap<String, Project>>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Project {
        let project = Project::new(Uuid::new_v4().to_string());
        self.projects
            .write()
            .await
            .insert(project.project_id.clone(), project.clone());
        project
    }

    pub async fn get(&self, project_id: &str) -> Option<Project> {
        self.projects.read().await.get(project_id).cloned()
    }

    /// Apply `f` to a stored project under the write lock.
    ///
    /// Returns `None` when the project doesn't exist.
    pub async fn update<R>(&self, project_id: &str, f: impl FnOnce(&mut Project) -> R) -> Option<R> {
        let mut projects = self.projects.write().await;
        projects.get_mut(project_id).map(f)
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }
}
