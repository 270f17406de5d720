// Copyright (c) 2024 Feature Graph Team. All rights reserved.
//
// FeatureRequest is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Per-sub-request slot: life cycle state, the declared outputs with their
//! completion latches, the stage sequence slots and the two locks. The
//! dependency lock covers state, tables and counters; the result lock only
//! covers the final-result rendezvous so notifiers never contend with
//! dependency traffic.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use log::warn;

use crate::error::FroError;
use crate::sequence::ProcessSequenceInfo;
use crate::state::RequestState;
use crate::types::{DependencyTableMaxima, GlobalId, SequenceOrder, StageInfo, INVALID_SEQUENCE_ID};

/// Everything the dependency mutex guards.
pub struct RequestInner {
    pub state: RequestState,
    pub request_index: usize,
    outputs: Vec<GlobalId>,
    output_notified: Vec<bool>,
    release_acked: Vec<bool>,
    output_generated: Vec<bool>,
    num_notified: usize,
    num_released: usize,
    num_generated: usize,
    pub cur_sequence_id: i32,
    pub next_sequence_id: i32,
    sequences: Vec<Option<ProcessSequenceInfo>>,
}

/// Which completion latch a setter addresses.
#[derive(Clone, Copy, Debug)]
pub enum OutputLatch {
    Notified,
    Released,
    Generated,
}

impl RequestInner {
    pub fn new(request_index: usize, outputs: Vec<GlobalId>) -> Self {
        let n = outputs.len();
        RequestInner {
            state: RequestState::Initialized,
            request_index,
            outputs,
            output_notified: vec![false; n],
            release_acked: vec![false; n],
            output_generated: vec![false; n],
            num_notified: 0,
            num_released: 0,
            num_generated: 0,
            cur_sequence_id: INVALID_SEQUENCE_ID,
            next_sequence_id: INVALID_SEQUENCE_ID,
            sequences: Vec::new(),
        }
    }

    pub fn outputs(&self) -> &[GlobalId] {
        &self.outputs
    }

    fn find_output(&self, global: &GlobalId) -> Option<usize> {
        self.outputs.iter().position(|o| {
            o.session == global.session && o.pipeline == global.pipeline && o.port == global.port
        })
    }

    /// Sets a completion latch for one declared output port. First set
    /// succeeds and bumps the aggregate; repeats report already-exists so
    /// callers can tell a duplicate notification from a fresh one.
    pub fn set_output_latch(&mut self, latch: OutputLatch, global: &GlobalId) -> Result<(), FroError> {
        let idx = self.find_output(global).ok_or_else(|| {
            FroError::NoSuch(format!(
                "output port session:{} pipeline:{} port:{}",
                global.session, global.pipeline, global.port
            ))
        })?;
        let (flags, count) = match latch {
            OutputLatch::Notified => (&mut self.output_notified, &mut self.num_notified),
            OutputLatch::Released => (&mut self.release_acked, &mut self.num_released),
            OutputLatch::Generated => (&mut self.output_generated, &mut self.num_generated),
        };
        if flags[idx] {
            return Err(FroError::AlreadyExists(format!(
                "{:?} latch for port {}",
                latch, global.port
            )));
        }
        flags[idx] = true;
        *count += 1;
        Ok(())
    }

    pub fn all_latched(&self, latch: OutputLatch) -> bool {
        let count = match latch {
            OutputLatch::Notified => self.num_notified,
            OutputLatch::Released => self.num_released,
            OutputLatch::Generated => self.num_generated,
        };
        count == self.outputs.len()
    }

    /// Lazily sizes the sequence slot array; a no-op once allocated.
    pub fn ensure_sequences(&mut self, max_sequence: usize) {
        if self.sequences.is_empty() {
            self.sequences = vec![None; max_sequence];
        }
    }

    pub fn sequences_allocated(&self) -> bool {
        !self.sequences.is_empty()
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    fn sequence_id(&self, order: SequenceOrder) -> Result<usize, FroError> {
        let id = match order {
            SequenceOrder::Current => self.cur_sequence_id,
            SequenceOrder::Next => self.next_sequence_id,
        };
        if id == INVALID_SEQUENCE_ID {
            return Err(FroError::InvalidState(
                format!("access {:?} sequence", order),
                "no sequence committed".to_string(),
            ));
        }
        Ok(id as usize)
    }

    pub fn sequence(&self, order: SequenceOrder) -> Result<&ProcessSequenceInfo, FroError> {
        let id = self.sequence_id(order)?;
        self.sequence_at(id)
    }

    pub fn sequence_mut(&mut self, order: SequenceOrder) -> Result<&mut ProcessSequenceInfo, FroError> {
        let id = self.sequence_id(order)?;
        self.sequence_at_mut(id)
    }

    pub fn sequence_at(&self, id: usize) -> Result<&ProcessSequenceInfo, FroError> {
        self.sequences
            .get(id)
            .ok_or(FroError::OutOfBound(id as u64, self.sequences.len() as u64))?
            .as_ref()
            .ok_or_else(|| {
                FroError::InvalidState(format!("access sequence {}", id), "slot empty".to_string())
            })
    }

    pub fn sequence_at_mut(&mut self, id: usize) -> Result<&mut ProcessSequenceInfo, FroError> {
        let len = self.sequences.len();
        self.sequences
            .get_mut(id)
            .ok_or(FroError::OutOfBound(id as u64, len as u64))?
            .as_mut()
            .ok_or_else(|| {
                FroError::InvalidState(format!("access sequence {}", id), "slot empty".to_string())
            })
    }

    /// Phase one of a stage advance: stage the slot after the current one.
    pub fn stage_next_sequence(
        &mut self,
        stage_info: StageInfo,
        maxima: &DependencyTableMaxima,
        num_dependencies: usize,
        max_dependencies: usize,
    ) -> Result<i32, FroError> {
        if !self.sequences_allocated() {
            return Err(FroError::InvalidState(
                "stage next sequence".to_string(),
                "config info not set".to_string(),
            ));
        }
        let next = self.cur_sequence_id + 1;
        if next as usize >= self.sequences.len() {
            return Err(FroError::OutOfBound(next as u64, self.sequences.len() as u64));
        }
        self.sequences[next as usize] = Some(ProcessSequenceInfo::new(
            stage_info,
            maxima,
            num_dependencies,
            max_dependencies,
        ));
        self.next_sequence_id = next;
        Ok(next)
    }

    /// Phase two: commit the staged slot as current.
    pub fn commit_next_sequence(&mut self) -> Result<i32, FroError> {
        if self.next_sequence_id == INVALID_SEQUENCE_ID {
            return Err(FroError::InvalidState(
                "move to next sequence".to_string(),
                "no next sequence staged".to_string(),
            ));
        }
        self.cur_sequence_id = self.next_sequence_id;
        self.next_sequence_id = INVALID_SEQUENCE_ID;
        Ok(self.cur_sequence_id)
    }
}

/// One request of the batch: the guarded inner plus the result rendezvous.
pub struct RequestSlot {
    index: usize,
    pub inner: Mutex<RequestInner>,
    result_ready: Mutex<bool>,
    result_cond: Condvar,
}

impl RequestSlot {
    pub fn new(request_index: usize, outputs: Vec<GlobalId>) -> Self {
        RequestSlot {
            index: request_index,
            inner: Mutex::new(RequestInner::new(request_index, outputs)),
            result_ready: Mutex::new(false),
            result_cond: Condvar::new(),
        }
    }

    /// Blocks until the final result is signalled or `timeout` lapses. The
    /// ready flag is consumed on return so the slot can be reused for the
    /// next round.
    pub fn wait_on_result(&self, timeout: Duration) -> Result<(), FroError> {
        let mut ready = self.result_ready.lock().unwrap();
        let deadline = std::time::Instant::now() + timeout;
        while !*ready {
            let now = std::time::Instant::now();
            if now >= deadline {
                warn!("request {}: result wait timed out", self.index);
                return Err(FroError::WaitTimeout(timeout.as_millis()));
            }
            let (guard, res) = self
                .result_cond
                .wait_timeout(ready, deadline - now)
                .unwrap();
            ready = guard;
            if res.timed_out() && !*ready {
                warn!("request {}: result wait timed out", self.index);
                return Err(FroError::WaitTimeout(timeout.as_millis()));
            }
        }
        *ready = false;
        Ok(())
    }

    pub fn notify_result(&self) {
        let mut ready = self.result_ready.lock().unwrap();
        *ready = true;
        self.result_cond.notify_all();
    }
}
