use crate::document::DocumentLayer;
use crate::layer::{Layer, LayerName};
use crate::stream::StreamLayer;

/// The fixed overlay set of a session, one layer per [`LayerName`].
///
/// Stacking follows [`LayerName::STACKING_ORDER`] and cannot be changed.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSet {
    boundaries: DocumentLayer,
    streaming: StreamLayer,
    labels: StreamLayer,
}

impl LayerSet {
    pub fn new() -> Self {
        Self {
            boundaries: DocumentLayer::new(LayerName::Boundaries),
            streaming: StreamLayer::new(LayerName::Streaming),
            labels: StreamLayer::new(LayerName::Labels),
        }
    }

    pub fn get(&self, name: LayerName) -> &dyn Layer {
        match name {
            LayerName::Boundaries => &self.boundaries,
            LayerName::Streaming => &self.streaming,
            LayerName::Labels => &self.labels,
        }
    }

    pub fn get_mut(&mut self, name: LayerName) -> &mut dyn Layer {
        match name {
            LayerName::Boundaries => &mut self.boundaries,
            LayerName::Streaming => &mut self.streaming,
            LayerName::Labels => &mut self.labels,
        }
    }

    /// Streaming-kind layer by name; `None` for static document layers.
    pub fn stream_mut(&mut self, name: LayerName) -> Option<&mut StreamLayer> {
        match name {
            LayerName::Boundaries => None,
            LayerName::Streaming => Some(&mut self.streaming),
            LayerName::Labels => Some(&mut self.labels),
        }
    }

    pub fn boundaries(&self) -> &DocumentLayer {
        &self.boundaries
    }

    pub fn boundaries_mut(&mut self) -> &mut DocumentLayer {
        &mut self.boundaries
    }

    pub fn streaming(&self) -> &StreamLayer {
        &self.streaming
    }

    pub fn streaming_mut(&mut self) -> &mut StreamLayer {
        &mut self.streaming
    }

    pub fn labels(&self) -> &StreamLayer {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut StreamLayer {
        &mut self.labels
    }

    pub fn visible(&self, name: LayerName) -> bool {
        self.get(name).visible()
    }

    pub fn set_visible(&mut self, name: LayerName, visible: bool) {
        self.get_mut(name).set_visible(visible);
    }

    /// Flips visibility and returns the new value.
    pub fn toggle_visible(&mut self, name: LayerName) -> bool {
        let layer = self.get_mut(name);
        let visible = !layer.visible();
        layer.set_visible(visible);
        visible
    }
}

impl Default for LayerSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::LayerSet;
    use crate::layer::{Layer, LayerName};
    use streaming::Packet;

    #[test]
    fn addressable_in_stacking_order() {
        let set = LayerSet::new();
        for name in LayerName::STACKING_ORDER {
            assert_eq!(set.get(name).name(), name);
        }
    }

    #[test]
    fn hide_then_toggle_leaves_visible_and_content_untouched() {
        let mut set = LayerSet::new();
        set.labels_mut().open();
        set.labels_mut().process(vec![Packet::new("US")]).unwrap();
        let before = set.labels().clone();

        set.set_visible(LayerName::Labels, false);
        assert!(!set.visible(LayerName::Labels));
        assert!(set.toggle_visible(LayerName::Labels));
        assert!(set.visible(LayerName::Labels));
        assert_eq!(set.labels().document(), before.document());
    }

    #[test]
    fn visibility_is_per_layer() {
        let mut set = LayerSet::new();
        set.toggle_visible(LayerName::Boundaries);
        assert!(!set.visible(LayerName::Boundaries));
        assert!(set.visible(LayerName::Streaming));
        assert!(set.stream_mut(LayerName::Boundaries).is_none());
    }
}
