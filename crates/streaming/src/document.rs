use std::collections::HashMap;

use crate::protocol::Packet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A content packet arrived before the document header.
    MissingHeader { id: String },
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::MissingHeader { id } => {
                write!(f, "packet {id:?} arrived before the document header")
            }
        }
    }
}

impl std::error::Error for StreamError {}

/// Live state built from an ordered packet stream.
///
/// Ordering contract:
/// - Entities iterate in order of first insertion.
/// - Updating an entity keeps its position; deleting and re-inserting moves
///   it to the end.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamDocument {
    header: Option<Packet>,
    entities: Vec<Packet>,
    index: HashMap<String, usize>,
}

impl StreamDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<&Packet> {
        self.header.as_ref()
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    pub fn entities(&self) -> &[Packet] {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Option<&Packet> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Applies one packet. Deleting an id the document does not hold is a
    /// no-op.
    pub fn process(&mut self, packet: Packet) -> Result<(), StreamError> {
        if packet.is_document() {
            match &mut self.header {
                Some(header) => header.merge_from(&packet),
                None => self.header = Some(packet),
            }
            return Ok(());
        }
        if self.header.is_none() {
            return Err(StreamError::MissingHeader { id: packet.id });
        }

        if packet.delete {
            let Some(i) = self.index.remove(&packet.id) else {
                return Ok(());
            };
            self.entities.remove(i);
            self.reindex_from(i);
            return Ok(());
        }

        if let Some(&i) = self.index.get(&packet.id) {
            self.entities[i].merge_from(&packet);
            return Ok(());
        }

        self.index.insert(packet.id.clone(), self.entities.len());
        self.entities.push(packet);
        Ok(())
    }

    /// Processes packets in order, stopping at the first rejected one.
    ///
    /// Packets before the rejected one stay applied.
    pub fn process_all(
        &mut self,
        packets: impl IntoIterator<Item = Packet>,
    ) -> Result<usize, StreamError> {
        let mut applied = 0;
        for packet in packets {
            self.process(packet)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Drops header and entities.
    pub fn clear(&mut self) {
        self.header = None;
        self.entities.clear();
        self.index.clear();
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, entity) in self.entities.iter().enumerate().skip(start) {
            self.index.insert(entity.id.clone(), i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DocumentHeader;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ids(doc: &StreamDocument) -> Vec<&str> {
        doc.entities().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn content_before_header_is_rejected() {
        let mut doc = StreamDocument::new();
        assert_eq!(
            doc.process(Packet::new("a")),
            Err(StreamError::MissingHeader { id: "a".into() })
        );
        assert!(doc.is_empty());
    }

    #[test]
    fn merges_updates_by_id_and_keeps_order() {
        let mut doc = StreamDocument::new();
        doc.process(DocumentHeader::new("feed").to_packet()).unwrap();
        doc.process(Packet::new("a").with_property("label", json!({"text": "A"})))
            .unwrap();
        doc.process(Packet::new("b")).unwrap();
        doc.process(Packet::new("a").with_property("label", json!({"scale": 2})))
            .unwrap();

        assert_eq!(ids(&doc), vec!["a", "b"]);
        assert_eq!(
            doc.entity("a").unwrap().property("label"),
            Some(&json!({"text": "A", "scale": 2}))
        );
    }

    #[test]
    fn delete_removes_and_reindexes() {
        let mut doc = StreamDocument::new();
        doc.process_all(vec![
            DocumentHeader::new("feed").to_packet(),
            Packet::new("a"),
            Packet::new("b"),
            Packet::new("c"),
        ])
        .unwrap();

        doc.process(Packet::deletion("a")).unwrap();
        doc.process(Packet::deletion("zz")).unwrap();
        assert_eq!(ids(&doc), vec!["b", "c"]);
        assert_eq!(doc.entity("c").map(|p| p.id.as_str()), Some("c"));

        doc.process(Packet::new("a")).unwrap();
        assert_eq!(ids(&doc), vec!["b", "c", "a"]);
    }

    #[test]
    fn header_updates_merge_and_clear_resets() {
        let mut doc = StreamDocument::new();
        doc.process(DocumentHeader::new("feed").to_packet()).unwrap();
        doc.process(Packet::new("document").with_name("renamed")).unwrap();
        assert_eq!(doc.header().and_then(|h| h.name.as_deref()), Some("renamed"));
        assert_eq!(doc.header().and_then(|h| h.version.as_deref()), Some("1.0"));

        doc.clear();
        assert!(!doc.has_header());
        assert!(doc.process(Packet::new("a")).is_err());
    }
}
