//! The document wire format: plain `serde`-derived structs mirroring the
//! JSON schema byte-for-byte. Nothing here knows about `bevy_ecs`; the
//! `World` only appears once [`crate::translate`] takes over.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The crate only checks the major component of this against
/// [`crate::SUPPORTED_MAJOR_VERSION`]; minor/patch are free to vary.
pub const CURRENT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFile {
    pub version: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub pages: Vec<PageFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFile {
    pub page_id: String,
    pub name: String,
    #[serde(default)]
    pub canvas_x: f32,
    #[serde(default)]
    pub canvas_y: f32,
    #[serde(default = "default_zoom")]
    pub canvas_zoom: f32,
    #[serde(default)]
    pub components: Vec<ComponentFile>,
    #[serde(default)]
    pub wires: Vec<WireFile>,
    #[serde(default)]
    pub junctions: Vec<JunctionFile>,
}

fn default_zoom() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFile {
    pub component_id: String,
    pub component_type: String,
    pub position: Position,
    #[serde(default)]
    pub rotation: i32,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_name: Option<String>,
    #[serde(default)]
    pub pins: Vec<PinFile>,
    /// Persisted [`relay_core::component::ComponentState`], keyed by kind.
    /// Absent for a component with no interesting runtime state to save
    /// (VCC, Clock, DPDT relay, Link, Bus) or one freshly placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinFile {
    pub pin_id: String,
    #[serde(default)]
    pub tabs: Vec<TabFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabFile {
    pub tab_id: String,
    pub position: Position,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFile {
    pub wire_id: String,
    pub start_tab_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_tab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<WaypointFile>,
    /// Embedded branch points along this wire's run, each possibly
    /// fanning out into more wires of its own. See §10.2: a child wire's
    /// own `start_tab_id` is ignored in favor of its parent junction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub junctions: Vec<EmbeddedJunctionFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedJunctionFile {
    pub junction_id: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_wires: Vec<WireFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionFile {
    pub junction_id: String,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoint_id: Option<String>,
    pub position: Position,
}
