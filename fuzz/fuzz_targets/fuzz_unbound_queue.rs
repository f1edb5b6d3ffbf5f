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

#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use valstake::core::economics::unbound::UnboundQueue;

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Push { amount: u64, release_time: u64 },
    ClaimMatured { now: u64 },
    Slash { amount: u64 },
}

fuzz_target!(|ops: Vec<Op>| {
    let mut q = UnboundQueue::new();
    let mut expected: u128 = 0;

    for op in ops {
        match op {
            Op::Push { amount, release_time } => {
                q.push(amount as u128, release_time);
                expected += amount as u128;
            }
            Op::ClaimMatured { now } => {
                expected -= q.claim_matured(now);
            }
            Op::Slash { amount } => {
                let consumed = q.slash(amount as u128);
                assert!(consumed <= amount as u128);
                expected -= consumed;
            }
        }
        // The running total always matches the sum of live entries, and a
        // drained queue is in its canonical empty state.
        assert_eq!(q.pending(), expected);
        assert_eq!(q.claimable(u64::MAX), expected);
        if q.is_empty() {
            assert_eq!(q.start_idx(), 0);
            assert_eq!(q.pending(), 0);
        }
    }
});
