// Copyright (c) 2026 Valstake
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Per-account FIFO ledger of pending-withdrawal stake.
//!
//! Entries are kept in an arena with a start cursor instead of being
//! physically removed, so push and pop stay amortized O(1). Claims consume
//! matured entries from the front; slashing consumes from the front
//! regardless of maturity.

use crate::core::types::Amount;
use serde::{Deserialize, Serialize};

/// One pending-withdrawal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboundEntry {
    /// Remaining amount; slashing may reduce it in place.
    pub amount: Amount,
    /// Earliest time the entry may be claimed.
    pub release_time: u64,
}

/// FIFO pending-withdrawal queue for one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboundQueue {
    entries: Vec<UnboundEntry>,
    start_idx: usize,
    pending_amount: Amount,
}

impl UnboundQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total amount still held in the queue.
    pub fn pending(&self) -> Amount {
        self.pending_amount
    }

    /// Live entry count (excluding consumed slots before the cursor).
    pub fn len(&self) -> usize {
        self.entries.len() - self.start_idx
    }

    /// True when no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a new entry.
    pub fn push(&mut self, amount: Amount, release_time: u64) {
        if amount == 0 {
            return;
        }
        self.entries.push(UnboundEntry {
            amount,
            release_time,
        });
        self.pending_amount = self.pending_amount.saturating_add(amount);
    }

    /// Sum of entries already matured at `now`, without consuming them.
    pub fn claimable(&self, now: u64) -> Amount {
        self.entries[self.start_idx..]
            .iter()
            .take_while(|e| e.release_time <= now)
            .map(|e| e.amount)
            .sum()
    }

    /// Pop matured entries off the front and return the released total.
    pub fn claim_matured(&mut self, now: u64) -> Amount {
        let mut released: Amount = 0;
        while self.start_idx < self.entries.len() {
            let entry = self.entries[self.start_idx];
            if entry.release_time > now {
                break;
            }
            released = released.saturating_add(entry.amount);
            self.start_idx += 1;
        }
        self.pending_amount = self.pending_amount.saturating_sub(released);
        self.compact();
        released
    }

    /// Consume up to `amount` from the front regardless of maturity.
    ///
    /// Returns the amount actually consumed (bounded by the pending total).
    /// A partially consumed front entry is reduced in place; fully consumed
    /// slots advance the cursor.
    pub fn slash(&mut self, amount: Amount) -> Amount {
        let mut remaining = amount;
        while remaining > 0 && self.start_idx < self.entries.len() {
            let entry = &mut self.entries[self.start_idx];
            if entry.amount > remaining {
                entry.amount -= remaining;
                remaining = 0;
            } else {
                remaining -= entry.amount;
                entry.amount = 0;
                self.start_idx += 1;
            }
        }
        let consumed = amount - remaining;
        self.pending_amount = self.pending_amount.saturating_sub(consumed);
        self.compact();
        consumed
    }

    /// Reset to the canonical empty state once fully drained, so queue
    /// metadata does not grow without bound.
    fn compact(&mut self) {
        if self.start_idx == self.entries.len() {
            self.entries.clear();
            self.start_idx = 0;
            self.pending_amount = 0;
        }
    }

    /// Cursor position (diagnostics).
    pub fn start_idx(&self) -> usize {
        self.start_idx
    }
}
