use streaming::{DocumentHeader, Packet, StreamDocument, StreamError};

use crate::layer::{Layer, LayerName};

/// Streaming document layer.
///
/// Content is only accepted after [`StreamLayer::open`] has applied the
/// layer's document header.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLayer {
    name: LayerName,
    visible: bool,
    header: DocumentHeader,
    document: StreamDocument,
}

impl StreamLayer {
    pub fn new(name: LayerName) -> Self {
        Self {
            name,
            visible: true,
            header: DocumentHeader::new(name.as_str()),
            document: StreamDocument::new(),
        }
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn document(&self) -> &StreamDocument {
        &self.document
    }

    pub fn entities(&self) -> &[Packet] {
        self.document.entities()
    }

    /// Header followed by every entity held: the sequence that rebuilds
    /// this layer's current content.
    pub fn snapshot(&self) -> Vec<Packet> {
        let header = self
            .document
            .header()
            .cloned()
            .unwrap_or_else(|| self.header.to_packet());
        let mut sequence = Vec::with_capacity(self.document.len() + 1);
        sequence.push(header);
        sequence.extend(self.document.entities().iter().cloned());
        sequence
    }

    /// Applies the document header and returns the packet to forward.
    pub fn open(&mut self) -> Packet {
        let packet = self.header.to_packet();
        // A header packet is always accepted.
        let _ = self.document.process(packet.clone());
        packet
    }

    pub fn process(&mut self, packets: Vec<Packet>) -> Result<usize, StreamError> {
        self.document.process_all(packets)
    }

    /// Discards current content and reopens with `packets`.
    ///
    /// Returns the full sequence, header first, that rebuilds the layer.
    pub fn replace(&mut self, packets: Vec<Packet>) -> Result<Vec<Packet>, StreamError> {
        self.document.clear();
        let mut sequence = Vec::with_capacity(packets.len() + 1);
        sequence.push(self.open());
        self.document.process_all(packets.iter().cloned())?;
        sequence.extend(packets);
        Ok(sequence)
    }
}

impl Layer for StreamLayer {
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

#[cfg(test)]
mod tests {
    use super::StreamLayer;
    use crate::layer::LayerName;
    use streaming::Packet;

    #[test]
    fn content_requires_open() {
        let mut layer = StreamLayer::new(LayerName::Streaming);
        assert!(layer.process(vec![Packet::new("a")]).is_err());

        let header = layer.open();
        assert!(header.is_document());
        assert_eq!(header.name.as_deref(), Some("streaming"));
        assert_eq!(layer.process(vec![Packet::new("a")]), Ok(1));
        assert_eq!(layer.entities().len(), 1);
    }

    #[test]
    fn replace_rebuilds_from_header() {
        let mut layer = StreamLayer::new(LayerName::Labels);
        layer.open();
        layer.process(vec![Packet::new("old")]).unwrap();

        let sequence = layer
            .replace(vec![Packet::new("a"), Packet::new("b")])
            .unwrap();
        let ids: Vec<&str> = sequence.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["document", "a", "b"]);

        let kept: Vec<&str> = layer.entities().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(kept, vec!["a", "b"]);
        assert_eq!(layer.snapshot(), sequence);
    }

    #[test]
    fn snapshot_reflects_merged_content() {
        let mut layer = StreamLayer::new(LayerName::Labels);
        layer.open();
        layer
            .process(vec![Packet::new("a"), Packet::new("b"), Packet::new("a")])
            .unwrap();
        let ids: Vec<String> = layer.snapshot().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["document", "a", "b"]);
    }
}
