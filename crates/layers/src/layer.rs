use serde::{Deserialize, Serialize};

/// Addressable overlay names within a session.
///
/// Variant order is the stacking order: earlier layers render beneath later
/// ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerName {
    Boundaries,
    Streaming,
    Labels,
}

impl LayerName {
    pub const STACKING_ORDER: [LayerName; 3] =
        [LayerName::Boundaries, LayerName::Streaming, LayerName::Labels];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerName::Boundaries => "boundaries",
            LayerName::Streaming => "streaming",
            LayerName::Labels => "labels",
        }
    }

    /// Position in [`LayerName::STACKING_ORDER`], 0 at the bottom.
    pub fn stacking_index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> LayerKind {
        match self {
            LayerName::Boundaries => LayerKind::StaticDocument,
            LayerName::Streaming | LayerName::Labels => LayerKind::StreamingDocument,
        }
    }
}

impl std::fmt::Display for LayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLayer(pub String);

impl std::fmt::Display for UnknownLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown layer {:?}", self.0)
    }
}

impl std::error::Error for UnknownLayer {}

impl std::str::FromStr for LayerName {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerName::STACKING_ORDER
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownLayer(s.to_string()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Loaded wholesale from an external location; reload replaces it.
    StaticDocument,
    /// Header-gated packet stream merged into live state.
    StreamingDocument,
}

impl LayerKind {
    pub fn requires_header(self) -> bool {
        matches!(self, LayerKind::StreamingDocument)
    }
}

pub trait Layer {
    fn name(&self) -> LayerName;

    fn kind(&self) -> LayerKind {
        self.name().kind()
    }

    fn visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);
}

#[cfg(test)]
mod tests {
    use super::{LayerKind, LayerName};

    #[test]
    fn stacking_order_matches_variant_order() {
        let mut sorted = LayerName::STACKING_ORDER;
        sorted.sort();
        assert_eq!(sorted, LayerName::STACKING_ORDER);
        assert_eq!(LayerName::STACKING_ORDER[0], LayerName::Boundaries);
        assert_eq!(LayerName::STACKING_ORDER[2], LayerName::Labels);
        for (i, name) in LayerName::STACKING_ORDER.into_iter().enumerate() {
            assert_eq!(name.stacking_index(), i);
        }
    }

    #[test]
    fn names_round_trip_through_strings() {
        for name in LayerName::STACKING_ORDER {
            assert_eq!(name.as_str().parse::<LayerName>(), Ok(name));
        }
        assert!("roads".parse::<LayerName>().is_err());
    }

    #[test]
    fn only_streaming_kinds_need_headers() {
        assert!(!LayerName::Boundaries.kind().requires_header());
        assert_eq!(LayerName::Labels.kind(), LayerKind::StreamingDocument);
        assert!(LayerName::Streaming.kind().requires_header());
    }
}
