//! Update packet envelope.
//!
//! Packets are declarative entity updates addressed by id. Apart from the
//! envelope fields below the payload is opaque: every other key is kept as a
//! JSON property and handed to the engine untouched.
//!
//! A stream starts with a document header, the packet whose id is
//! [`DOCUMENT_PACKET_ID`]. Content packets are only meaningful after it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Id reserved for the document header packet.
pub const DOCUMENT_PACKET_ID: &str = "document";

/// Packet format version written into generated headers.
pub const PACKET_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Removes the entity with this id instead of updating it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Packet {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: None,
            delete: false,
            properties: Map::new(),
        }
    }

    pub fn deletion(id: impl Into<String>) -> Self {
        Self {
            delete: true,
            ..Self::new(id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn is_document(&self) -> bool {
        self.id == DOCUMENT_PACKET_ID
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Applies `update` on top of this packet.
    ///
    /// Envelope fields present in the update replace ours. Properties merge
    /// recursively: objects merge key by key, any other value replaces.
    pub fn merge_from(&mut self, update: &Packet) {
        if update.name.is_some() {
            self.name = update.name.clone();
        }
        if update.version.is_some() {
            self.version = update.version.clone();
        }
        for (key, value) in &update.properties {
            let slot = self.properties.entry(key.clone()).or_insert(Value::Null);
            merge_value(slot, value);
        }
    }
}

fn merge_value(target: &mut Value, update: &Value) {
    if let (Value::Object(existing), Value::Object(incoming)) = (&mut *target, update) {
        for (key, value) in incoming {
            let slot = existing.entry(key.clone()).or_insert(Value::Null);
            merge_value(slot, value);
        }
        return;
    }
    *target = update.clone();
}

/// Identity of a packet stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub name: String,
    pub version: String,
}

impl DocumentHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: PACKET_VERSION.to_string(),
        }
    }

    pub fn to_packet(&self) -> Packet {
        Packet {
            version: Some(self.version.clone()),
            ..Packet::new(DOCUMENT_PACKET_ID).with_name(self.name.clone())
        }
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    Json(serde_json::Error),
    /// Packet at this position in the batch has an empty id.
    EmptyId { index: usize },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Json(err) => write!(f, "invalid packet document: {err}"),
            ProtocolError::EmptyId { index } => write!(f, "packet {index} has an empty id"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Json(err) => Some(err),
            ProtocolError::EmptyId { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Json(err)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PacketDocument {
    Many(Vec<Packet>),
    One(Box<Packet>),
}

/// Parses a packet document: either a JSON array of packets or one packet.
pub fn parse_packets(text: &str) -> Result<Vec<Packet>, ProtocolError> {
    let packets = match serde_json::from_str::<PacketDocument>(text)? {
        PacketDocument::Many(packets) => packets,
        PacketDocument::One(packet) => vec![*packet],
    };
    if let Some(index) = packets.iter().position(|p| p.id.trim().is_empty()) {
        return Err(ProtocolError::EmptyId { index });
    }
    Ok(packets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_array_and_single_object() {
        let many = parse_packets(
            r#"[{"id":"document","name":"feed","version":"1.0"},{"id":"a","billboard":{"scale":2}}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert!(many[0].is_document());
        assert_eq!(many[1].property("billboard"), Some(&json!({"scale": 2})));

        let one = parse_packets(r#"{"id":"b","delete":true}"#).unwrap();
        assert_eq!(one, vec![Packet::deletion("b")]);
    }

    #[test]
    fn rejects_empty_ids_and_bad_json() {
        assert!(matches!(
            parse_packets(r#"[{"id":"a"},{"id":" "}]"#),
            Err(ProtocolError::EmptyId { index: 1 })
        ));
        assert!(matches!(parse_packets("{"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            parse_packets(r#"{"name":"no id"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn merge_is_recursive_for_objects() {
        let mut base = Packet::new("a")
            .with_name("Alpha")
            .with_property("label", json!({"text": "A", "scale": 1.0}));
        let update = Packet::new("a").with_property("label", json!({"scale": 2.0}));
        base.merge_from(&update);

        assert_eq!(base.name.as_deref(), Some("Alpha"));
        assert_eq!(base.property("label"), Some(&json!({"text": "A", "scale": 2.0})));
    }

    #[test]
    fn merge_replaces_non_object_values() {
        let mut base = Packet::new("a").with_property("position", json!([1, 2, 3]));
        base.merge_from(&Packet::new("a").with_property("position", json!([4, 5, 6])));
        assert_eq!(base.property("position"), Some(&json!([4, 5, 6])));
    }

    #[test]
    fn header_serializes_as_document_packet() {
        let packet = DocumentHeader::new("labels").to_packet();
        assert_eq!(
            serde_json::to_value(&packet).unwrap(),
            json!({"id": "document", "name": "labels", "version": "1.0"})
        );
    }
}
