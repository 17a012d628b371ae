/// Structured record of something a session did.
///
/// Kinds are short static tags (`"capability_failed"`, `"layer_attached"`,
/// ...). Messages are free text for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// 0-based position in the log.
    pub sequence: u64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    next_sequence: u64,
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: &'static str, message: impl Into<String>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(Event {
            sequence,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
