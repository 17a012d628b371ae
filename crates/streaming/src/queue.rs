use crate::protocol::Packet;

/// Default bound on packets held while a session is not ready.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PendingFull {
    pub max_len: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl std::fmt::Display for PendingFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "packet buffer full: pending={} rejected={} max={}",
            self.pending, self.rejected, self.max_len
        )
    }
}

impl std::error::Error for PendingFull {}

/// Packets submitted before their destination exists, held in submission
/// order for replay.
///
/// Batches are accepted whole or not at all so a replay never contains a
/// partial batch.
#[derive(Debug)]
pub struct PendingPackets {
    items: Vec<Packet>,
    max_len: usize,
}

impl PendingPackets {
    pub fn new(max_len: usize) -> Self {
        Self {
            items: Vec::new(),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn try_extend(&mut self, batch: Vec<Packet>) -> Result<usize, PendingFull> {
        if self.items.len() + batch.len() > self.max_len {
            return Err(PendingFull {
                max_len: self.max_len,
                pending: self.items.len(),
                rejected: batch.len(),
            });
        }
        let n = batch.len();
        self.items.extend(batch);
        Ok(n)
    }

    pub fn drain(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.items)
    }
}

impl Default for PendingPackets {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

#[cfg(test)]
mod tests {
    use super::{PendingFull, PendingPackets};
    use crate::protocol::Packet;

    #[test]
    fn enforces_backpressure_per_batch() {
        let mut q = PendingPackets::new(2);
        assert_eq!(q.try_extend(vec![Packet::new("a")]), Ok(1));
        assert_eq!(
            q.try_extend(vec![Packet::new("b"), Packet::new("c")]),
            Err(PendingFull {
                max_len: 2,
                pending: 1,
                rejected: 2
            })
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn drain_preserves_submission_order() {
        let mut q = PendingPackets::default();
        q.try_extend(vec![Packet::new("a"), Packet::new("b")]).unwrap();
        q.try_extend(vec![Packet::new("c")]).unwrap();
        let ids: Vec<String> = q.drain().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }
}
