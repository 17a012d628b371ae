//! Interaction capabilities attached to an engine instance.
//!
//! Each capability is one named engine extension plus its parameters. The
//! standard set is applied in a fixed order; a capability that fails to
//! attach is reported and skipped, the rest still attach.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::engine::{Engine, EngineError};

pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;

    fn params(&self) -> Value {
        Value::Null
    }

    fn attach(&self, engine: &mut dyn Engine) -> Result<(), EngineError> {
        engine.extend(self.name(), &self.params())
    }
}

fn params_of<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Pointer cursor over pickable entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorFeedback {
    pub hover_cursor: String,
}

impl Default for CursorFeedback {
    fn default() -> Self {
        Self {
            hover_cursor: "pointer".to_string(),
        }
    }
}

impl Capability for CursorFeedback {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

/// Compass, zoom buttons and distance legend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationControls {
    pub enable_compass: bool,
    pub enable_compass_outer_ring: bool,
    pub enable_zoom_controls: bool,
    pub enable_distance_legend: bool,
}

impl Default for NavigationControls {
    fn default() -> Self {
        Self {
            enable_compass: true,
            enable_compass_outer_ring: true,
            enable_zoom_controls: true,
            enable_distance_legend: true,
        }
    }
}

impl Capability for NavigationControls {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionHighlight {
    /// CSS color.
    pub color: String,
}

impl Default for SelectionHighlight {
    fn default() -> Self {
        Self {
            color: "#ffff00".to_string(),
        }
    }
}

impl Capability for SelectionHighlight {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverTooltip {
    pub offset_px: [i32; 2],
}

impl Default for HoverTooltip {
    fn default() -> Self {
        Self { offset_px: [12, 12] }
    }
}

impl Capability for HoverTooltip {
    fn name(&self) -> &'static str {
        "tooltip"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Meters,
    Kilometers,
    Miles,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct DistanceMeasure {
    pub units: LengthUnit,
}

impl Default for DistanceMeasure {
    fn default() -> Self {
        Self {
            units: LengthUnit::Kilometers,
        }
    }
}

impl Capability for DistanceMeasure {
    fn name(&self) -> &'static str {
        "measure"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EntityPicker;

impl Capability for EntityPicker {
    fn name(&self) -> &'static str {
        "entity-pick"
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LocationPicker;

impl Capability for LocationPicker {
    fn name(&self) -> &'static str {
        "location-pick"
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDrawing {
    pub clamp_to_ground: bool,
}

impl Default for CircleDrawing {
    fn default() -> Self {
        Self {
            clamp_to_ground: true,
        }
    }
}

impl Capability for CircleDrawing {
    fn name(&self) -> &'static str {
        "draw-circle"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonDrawing {
    pub clamp_to_ground: bool,
}

impl Default for PolygonDrawing {
    fn default() -> Self {
        Self {
            clamp_to_ground: true,
        }
    }
}

impl Capability for PolygonDrawing {
    fn name(&self) -> &'static str {
        "draw-polygon"
    }

    fn params(&self) -> Value {
        params_of(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFailure {
    pub name: &'static str,
    pub error: String,
}

/// Outcome of applying a [`CapabilitySet`], in application order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttachReport {
    pub attached: Vec<&'static str>,
    pub failed: Vec<CapabilityFailure>,
}

impl AttachReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered capability list. Order is fixed at construction.
pub struct CapabilitySet {
    capabilities: Vec<Box<dyn Capability>>,
}

impl CapabilitySet {
    pub fn new(capabilities: Vec<Box<dyn Capability>>) -> Self {
        Self { capabilities }
    }

    /// Cursor, navigation, selection, tooltip, measure, entity pick,
    /// location pick, circle drawing, polygon drawing.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(CursorFeedback::default()),
            Box::new(NavigationControls::default()),
            Box::new(SelectionHighlight::default()),
            Box::new(HoverTooltip::default()),
            Box::new(DistanceMeasure::default()),
            Box::new(EntityPicker),
            Box::new(LocationPicker),
            Box::new(CircleDrawing::default()),
            Box::new(PolygonDrawing::default()),
        ])
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.capabilities.iter().map(|c| c.name()).collect()
    }

    pub fn apply(&self, engine: &mut dyn Engine) -> AttachReport {
        let mut report = AttachReport::default();
        for capability in &self.capabilities {
            let name = capability.name();
            match capability.attach(engine) {
                Ok(()) => report.attached.push(name),
                Err(err) => {
                    warn!("capability {name} failed to attach: {err}");
                    report.failed.push(CapabilityFailure {
                        name,
                        error: err.to_string(),
                    });
                }
            }
        }
        report
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEngineFactory;
    use crate::engine::EngineFactory;
    use crate::options::ViewerOptions;
    use foundation::MountId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const STANDARD_ORDER: [&str; 9] = [
        "cursor",
        "navigation",
        "selection",
        "tooltip",
        "measure",
        "entity-pick",
        "location-pick",
        "draw-circle",
        "draw-polygon",
    ];

    #[test]
    fn standard_set_has_fixed_order() {
        assert_eq!(CapabilitySet::standard().names(), STANDARD_ORDER.to_vec());
    }

    #[test]
    fn apply_attaches_in_order() {
        let factory = HeadlessEngineFactory::new();
        let mount = MountId::from("map");
        let mut engine = factory.create(&mount, &ViewerOptions::default()).unwrap();

        let report = CapabilitySet::standard().apply(engine.as_mut());

        assert!(report.is_complete());
        assert_eq!(report.attached, STANDARD_ORDER.to_vec());
        let state = factory.snapshot(&mount).unwrap();
        assert_eq!(state.extension_names(), STANDARD_ORDER.to_vec());
    }

    #[test]
    fn failure_is_isolated() {
        let factory = HeadlessEngineFactory::new().without_capability("tooltip");
        let mount = MountId::from("map");
        let mut engine = factory.create(&mount, &ViewerOptions::default()).unwrap();

        let report = CapabilitySet::standard().apply(engine.as_mut());

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "tooltip");
        assert_eq!(report.attached.len(), 8);
        assert_eq!(report.attached[3], "measure");
        assert_eq!(factory.snapshot(&mount).unwrap().extension_names().len(), 8);
    }

    #[test]
    fn params_use_engine_field_names() {
        assert_eq!(
            NavigationControls::default().params(),
            json!({
                "enableCompass": true,
                "enableCompassOuterRing": true,
                "enableZoomControls": true,
                "enableDistanceLegend": true
            })
        );
        assert_eq!(DistanceMeasure::default().params(), json!({"units": "kilometers"}));
        assert_eq!(EntityPicker.params(), Value::Null);
    }
}
