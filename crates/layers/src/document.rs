use serde_json::Value;

use crate::layer::{Layer, LayerName};

/// Static document layer: content is loaded wholesale and replaced on
/// reload.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayer {
    name: LayerName,
    visible: bool,
    source: Option<String>,
    document: Option<Value>,
}

impl DocumentLayer {
    pub fn new(name: LayerName) -> Self {
        Self {
            name,
            visible: true,
            source: None,
            document: None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    pub fn replace(&mut self, source: impl Into<String>, document: Value) {
        self.source = Some(source.into());
        self.document = Some(document);
    }
}

impl Layer for DocumentLayer {
    fn name(&self) -> LayerName {
        self.name
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
