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

//! Per-stage dependency and configuration tables. One [`DependencyConfig`]
//! exists per session/pipeline pair touched by a stage; it holds the input
//! and output configuration ports, the input-dependency sets and the
//! request-input slots.

use crate::error::FroError;
use crate::types::{GlobalId, MetadataHandle, PortBufferStatus, TargetBufferHandle};

/// One port slot in a configuration or dependency table. Buffer and
/// metadata cells are write-once; a second write leaves the first value in
/// place.
#[derive(Clone, Debug, Default)]
pub struct PortEntry {
    pub port: Option<GlobalId>,
    pub buffer: Option<TargetBufferHandle>,
    pub metadata: Option<MetadataHandle>,
    pub buffer_status: Option<PortBufferStatus>,
    pub key: Option<u64>,
}

impl PortEntry {
    /// Records a buffer handle if the cell is empty. Returns whether this
    /// was the first write; duplicates are silent no-ops so the caller
    /// never double-moves its counters.
    pub fn set_buffer(
        &mut self,
        handle: TargetBufferHandle,
        key: u64,
        status: PortBufferStatus,
    ) -> bool {
        if self.buffer.is_some() {
            return false;
        }
        self.buffer = Some(handle);
        self.key = Some(key);
        self.buffer_status = Some(status);
        true
    }

    /// Records a metadata handle if the cell is empty; same first-write
    /// contract as [`set_buffer`](Self::set_buffer).
    pub fn set_metadata(&mut self, handle: MetadataHandle, key: u64) -> bool {
        if self.metadata.is_some() {
            return false;
        }
        self.metadata = Some(handle);
        self.key = Some(key);
        true
    }
}

/// One set of input dependencies. All sets of a stage share a common slot
/// count (the widest dependency descriptor of the stage) so a single index
/// space addresses them.
#[derive(Clone, Debug)]
pub struct InputDependencySet {
    pub entries: Vec<PortEntry>,
    /// Sticky marker: some buffer on this set arrived with an error.
    pub buffer_error_present: bool,
}

impl InputDependencySet {
    fn new(max_dependencies: usize) -> Self {
        InputDependencySet {
            entries: vec![PortEntry::default(); max_dependencies],
            buffer_error_present: false,
        }
    }
}

/// Dependency and configuration tables of one session/pipeline pair within
/// a stage.
#[derive(Clone, Debug)]
pub struct DependencyConfig {
    pub input_config: Vec<PortEntry>,
    pub output_config: Vec<PortEntry>,
    pub dependencies: Vec<InputDependencySet>,
    pub request_inputs: Vec<PortEntry>,
}

impl DependencyConfig {
    /// `num_dependencies` sets, each `max_dependencies` wide; the
    /// request-input slots mirror the dependency count.
    pub fn new(max_port: usize, num_dependencies: usize, max_dependencies: usize) -> Self {
        DependencyConfig {
            input_config: vec![PortEntry::default(); max_port],
            output_config: vec![PortEntry::default(); max_port],
            dependencies: vec![InputDependencySet::new(max_dependencies); num_dependencies],
            request_inputs: vec![PortEntry::default(); num_dependencies],
        }
    }

    pub fn num_dependencies(&self) -> usize {
        self.dependencies.len()
    }

    pub fn dependency(&self, index: usize) -> Result<&InputDependencySet, FroError> {
        self.dependencies
            .get(index)
            .ok_or(FroError::OutOfBound(index as u64, self.dependencies.len() as u64))
    }

    pub fn dependency_mut(&mut self, index: usize) -> Result<&mut InputDependencySet, FroError> {
        let len = self.dependencies.len();
        self.dependencies
            .get_mut(index)
            .ok_or(FroError::OutOfBound(index as u64, len as u64))
    }

    pub fn request_input(&self, index: usize) -> Result<&PortEntry, FroError> {
        self.request_inputs
            .get(index)
            .ok_or(FroError::OutOfBound(index as u64, self.request_inputs.len() as u64))
    }

    pub fn request_input_mut(&mut self, index: usize) -> Result<&mut PortEntry, FroError> {
        let len = self.request_inputs.len();
        self.request_inputs
            .get_mut(index)
            .ok_or(FroError::OutOfBound(index as u64, len as u64))
    }
}
