//! Order registry: local↔external identifier mapping and bounded history.
//!
//! The host exchanges small dense integers; the external application
//! exchanges opaque variable-length identifiers. The registry is the sole
//! authority for the mapping and never leaks external ids to the host.
//! Terminal orders past the history cap are retired oldest-first so memory
//! stays bounded across long sessions.

use rustc_hash::FxHashMap;

use crate::order::Order;

/// First local id handed to the host.
pub const FIRST_LOCAL_ID: i32 = 1000;

pub struct OrderRegistry {
    next_local_id: i32,
    orders: FxHashMap<i32, Order>,
    by_external: FxHashMap<String, i32>,
    history_cap: usize,
}

impl OrderRegistry {
    pub fn new(history_cap: usize) -> Self {
        Self {
            next_local_id: FIRST_LOCAL_ID,
            orders: FxHashMap::default(),
            by_external: FxHashMap::default(),
            history_cap,
        }
    }

    /// Allocate the next local id and insert the order under both maps.
    /// Ids are strictly monotonic; none is ever reused in-process.
    pub fn register(&mut self, mut order: Order) -> i32 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        order.local_id = local_id;
        self.by_external.insert(order.external_id.clone(), local_id);
        self.orders.insert(local_id, order);
        local_id
    }

    pub fn get(&self, local_id: i32) -> Option<&Order> {
        self.orders.get(&local_id)
    }

    pub fn get_mut(&mut self, local_id: i32) -> Option<&mut Order> {
        self.orders.get_mut(&local_id)
    }

    pub fn local_id_for(&self, external_id: &str) -> Option<i32> {
        self.by_external.get(external_id).copied()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn terminal_count(&self) -> usize {
        self.orders.values().filter(|o| o.is_terminal()).count()
    }

    /// Retire the oldest terminal orders until at most `history_cap`
    /// remain. Non-terminal orders are never touched; both maps stay
    /// consistent. Returns how many orders were removed.
    pub fn retire_terminal(&mut self) -> usize {
        let excess = self.terminal_count().saturating_sub(self.history_cap);
        if excess == 0 {
            return 0;
        }

        let mut terminal_ids: Vec<i32> = self
            .orders
            .values()
            .filter(|o| o.is_terminal())
            .map(|o| o.local_id)
            .collect();
        terminal_ids.sort_unstable();

        for local_id in terminal_ids.into_iter().take(excess) {
            if let Some(order) = self.orders.remove(&local_id) {
                self.by_external.remove(&order.external_id);
            }
        }
        excess
    }

    /// Drop everything, keeping the id counter monotonic.
    pub fn clear(&mut self) {
        self.orders.clear();
        self.by_external.clear();
    }
}
