use std::sync::{Arc, RwLock};

use crate::dissect::PacketRecord;
use crate::filter::FilterExpression;

/// Every packet of the current session in capture order.
///
/// Cloning shares the same backing list. Only the session's consumer thread
/// appends. Locks are held only for the copy in or out.
#[derive(Debug, Clone, Default)]
pub struct PacketStore {
    packets: Arc<RwLock<Vec<PacketRecord>>>,
}

impl PacketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, batch: Vec<PacketRecord>) {
        self.packets.write().unwrap().extend(batch);
    }

    pub fn clear(&self) {
        self.packets.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.packets.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, number: u64) -> Option<PacketRecord> {
        let packets = self.packets.read().unwrap();
        let idx = number.checked_sub(1)? as usize;
        packets.get(idx).filter(|p| p.number == number).cloned()
    }

    pub fn snapshot(&self) -> Vec<PacketRecord> {
        self.packets.read().unwrap().clone()
    }

    /// Packets matching `filter`, in capture order. `None` matches all.
    pub fn filtered(&self, filter: Option<&FilterExpression>) -> Vec<PacketRecord> {
        let packets = self.packets.read().unwrap();
        match filter {
            Some(f) => packets.iter().filter(|p| f.matches(p)).cloned().collect(),
            None => packets.clone(),
        }
    }
}
