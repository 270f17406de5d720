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

//! One stage execution slot of a request: the dependency tables for every
//! session/pipeline pair the stage touches, the identifier map resolving
//! global ids into those tables, and the satisfaction counters.

use std::any::Any;
use std::sync::Arc;

use crate::dependency::DependencyConfig;
use crate::identifier_map::{IdentifierMap, LocalIndex};
use crate::types::{DependencyTableMaxima, GlobalId, PortBufferStatus, StageInfo};

/// Opaque per-sequence payload callers may attach.
pub type SequencePrivateData = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct ProcessSequenceInfo {
    pub stage_info: StageInfo,
    max_pipeline: usize,
    /// One table set per session/pipeline pair, indexed through the map.
    configs: Vec<DependencyConfig>,
    map: IdentifierMap,
    /// Declared buffer dependencies not yet met with success.
    pub buffers_to_satisfy: usize,
    /// Declared metadata dependencies not yet met.
    pub metadata_to_satisfy: usize,
    /// Starts at `total_input_dependencies`; each errored delivery takes one.
    pub max_possible_errors: usize,
    pub total_input_dependencies: usize,
    pub private_data: Option<SequencePrivateData>,
}

impl ProcessSequenceInfo {
    pub fn new(
        stage_info: StageInfo,
        maxima: &DependencyTableMaxima,
        num_dependencies: usize,
        max_dependencies: usize,
    ) -> Self {
        let num_configs = maxima.max_session * maxima.max_pipeline;
        ProcessSequenceInfo {
            stage_info,
            max_pipeline: maxima.max_pipeline,
            configs: vec![
                DependencyConfig::new(maxima.max_port, num_dependencies, max_dependencies);
                num_configs
            ],
            map: IdentifierMap::new(maxima),
            buffers_to_satisfy: 0,
            metadata_to_satisfy: 0,
            max_possible_errors: 0,
            total_input_dependencies: 0,
            private_data: None,
        }
    }

    pub fn map(&mut self) -> &mut IdentifierMap {
        &mut self.map
    }

    pub fn lookup(&self, global: &GlobalId, bucket: usize) -> Option<LocalIndex> {
        self.map.lookup(global, bucket)
    }

    pub fn config(&self, local: &LocalIndex) -> &DependencyConfig {
        &self.configs[local.session * self.max_pipeline + local.pipeline]
    }

    pub fn config_mut(&mut self, local: &LocalIndex) -> &mut DependencyConfig {
        &mut self.configs[local.session * self.max_pipeline + local.pipeline]
    }

    pub fn configs(&self) -> &[DependencyConfig] {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut [DependencyConfig] {
        &mut self.configs
    }

    /// A new input-dependency port was declared: one more buffer and one
    /// more metadata to wait for, one more potential error.
    pub fn account_dependency_declared(&mut self) {
        self.buffers_to_satisfy += 1;
        self.metadata_to_satisfy += 1;
        self.max_possible_errors += 1;
        self.total_input_dependencies += 1;
    }

    /// First buffer delivery on a dependency slot. An error takes from the
    /// error budget; a success retires the wait.
    pub fn account_buffer_arrival(&mut self, status: PortBufferStatus) {
        if status.is_error() {
            self.max_possible_errors = self.max_possible_errors.saturating_sub(1);
        } else {
            self.buffers_to_satisfy = self.buffers_to_satisfy.saturating_sub(1);
        }
    }

    pub fn account_metadata_arrival(&mut self) {
        self.metadata_to_satisfy = self.metadata_to_satisfy.saturating_sub(1);
    }

    /// Errored deliveries so far.
    pub fn errors_seen(&self) -> usize {
        self.total_input_dependencies - self.max_possible_errors
    }

    /// Successful buffer deliveries so far.
    pub fn buffers_received(&self) -> usize {
        self.total_input_dependencies - self.buffers_to_satisfy
    }

    /// Slots with no delivery at all yet, success or error.
    pub fn outstanding(&self) -> usize {
        self.buffers_to_satisfy - self.errors_seen()
    }
}
