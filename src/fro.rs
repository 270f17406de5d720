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

//! The feature request object: the shared state machine a feature and the
//! graph negotiate over while a batch of requests moves through the
//! feature's stages. All per-request bookkeeping lives in [`RequestSlot`]s;
//! this module adds bounds checking, state gating and the operation
//! surface.

use std::any::Any;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

use crate::error::FroError;
use crate::request::{OutputLatch, RequestInner, RequestSlot};
use crate::state::{transition, RequestState};
use crate::types::{
    DependencyStatus, DependencyTableMaxima, FeatureId, GlobalId, MetadataHandle,
    PortBufferStatus, PortOpType, SequenceOrder, StageInfo, TargetBufferHandle,
};
use crate::uro::UsecaseRequest;

/// Opaque payload attached by the graph or the feature itself.
pub type PrivateData = Arc<dyn Any + Send + Sync>;

/// Construction-time configuration.
pub struct FroConfig {
    pub usecase_request: Arc<dyn UsecaseRequest>,
    pub feature_id: FeatureId,
    pub feature_name: String,
    pub camera_id: u32,
    pub instance_id: u32,
    /// Declared output ports, one table per request in the batch.
    pub request_outputs: Vec<Vec<GlobalId>>,
    pub graph_private_data: Option<PrivateData>,
}

pub struct FeatureRequestObject {
    usecase_request: Weak<dyn UsecaseRequest>,
    feature_id: FeatureId,
    camera_id: u32,
    instance_id: u32,
    identifier: String,
    requests: Vec<RequestSlot>,
    maxima: Mutex<Option<DependencyTableMaxima>>,
    cur_request: Mutex<usize>,
    graph_private_data: Option<PrivateData>,
    feature_private_data: Mutex<Option<PrivateData>>,
    /// Opt-in coarse lock for callers that need multi-call atomicity.
    external_lock: Mutex<()>,
}

/// States in which per-port buffer delivery is accepted.
const BUFFER_STATES: [RequestState; 4] = [
    RequestState::Executing,
    RequestState::InputResourcePending,
    RequestState::OutputResourcePending,
    RequestState::OutputNotificationPending,
];

/// States in which metadata delivery is accepted.
const METADATA_STATES: [RequestState; 2] =
    [RequestState::Executing, RequestState::InputResourcePending];

impl FeatureRequestObject {
    pub fn new(config: FroConfig) -> Result<Self> {
        if config.request_outputs.is_empty() {
            bail!("Feature request needs at least one request in the batch");
        }
        for (idx, outputs) in config.request_outputs.iter().enumerate() {
            if outputs.is_empty() {
                bail!("Request {} declares no output ports", idx);
            }
        }
        if config.feature_name.is_empty() {
            bail!("Feature name must not be empty");
        }

        let identifier = format!(
            "FRO-URO:{}_{}:{}_{}",
            config.usecase_request.app_frame_number(),
            config.feature_name,
            config.instance_id,
            config.camera_id
        );
        let requests = config
            .request_outputs
            .into_iter()
            .enumerate()
            .map(|(idx, outputs)| RequestSlot::new(idx, outputs))
            .collect();

        info!("{}: created", identifier);

        Ok(FeatureRequestObject {
            usecase_request: Arc::downgrade(&config.usecase_request),
            feature_id: config.feature_id,
            camera_id: config.camera_id,
            instance_id: config.instance_id,
            identifier,
            requests,
            maxima: Mutex::new(None),
            cur_request: Mutex::new(0),
            graph_private_data: config.graph_private_data,
            feature_private_data: Mutex::new(None),
            external_lock: Mutex::new(()),
        })
    }

    fn slot(&self, request_index: usize) -> Result<&RequestSlot> {
        self.requests.get(request_index).ok_or_else(|| {
            anyhow!(FroError::OutOfBound(
                request_index as u64,
                self.requests.len() as u64
            ))
        })
    }

    fn check_state(&self, inner: &RequestInner, allowed: &[RequestState], what: &str) -> Result<()> {
        if !allowed.contains(&inner.state) {
            return Err(anyhow!(FroError::InvalidState(
                what.to_string(),
                format!("{:?}", inner.state)
            )))
            .with_context(|| format!("{} request:{}", self.identifier, inner.request_index));
        }
        Ok(())
    }

    /// Coarse whole-object lock. Individual operations stay consistent
    /// without it; hold the guard across calls that must observe one
    /// consistent snapshot.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.external_lock.lock().unwrap()
    }

    // ---- state ----

    pub fn get_state(&self, request_index: usize) -> Result<RequestState> {
        Ok(self.slot(request_index)?.inner.lock().unwrap().state)
    }

    pub fn set_state(&self, request_index: usize, to: RequestState) -> Result<()> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        transition(&mut inner.state, to, &self.identifier)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("{} request:{}", self.identifier, request_index))
    }

    // ---- configuration ----

    /// Records the topology maxima every stage of this request will be
    /// bounded by. Must precede any stage work.
    pub fn set_config_info(&self, maxima: DependencyTableMaxima) -> Result<()> {
        if !maxima.is_valid() {
            bail!(
                "{}: invalid dependency table maxima {:?}",
                self.identifier,
                maxima
            );
        }
        *self.maxima.lock().unwrap() = Some(maxima);
        debug!("{}: config info set {:?}", self.identifier, maxima);
        Ok(())
    }

    fn maxima(&self) -> Result<DependencyTableMaxima> {
        (*self.maxima.lock().unwrap()).ok_or_else(|| {
            anyhow!(FroError::InvalidState(
                "stage operation".to_string(),
                "config info not set".to_string()
            ))
        })
    }

    // ---- stage control ----

    /// Stages the descriptor of the next stage into the slot after the
    /// current one. The stage only becomes current once
    /// [`move_to_next_sequence`](Self::move_to_next_sequence) commits it.
    pub fn set_next_stage_info(
        &self,
        request_index: usize,
        stage_info: StageInfo,
        num_dependencies: usize,
        max_dependencies: usize,
    ) -> Result<i32> {
        let maxima = self.maxima()?;
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        inner.ensure_sequences(maxima.max_sequence);
        let staged = inner
            .stage_next_sequence(stage_info, &maxima, num_dependencies, max_dependencies)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("{} request:{}", self.identifier, request_index))?;
        debug!(
            "{} request:{}: staged sequence {} stage:{} stageSequence:{}",
            self.identifier, request_index, staged, stage_info.stage_id, stage_info.stage_sequence_id
        );
        Ok(staged)
    }

    pub fn move_to_next_sequence(&self, request_index: usize) -> Result<i32> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        let cur = inner
            .commit_next_sequence()
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("{} request:{}", self.identifier, request_index))?;
        debug!(
            "{} request:{}: moved to sequence {}",
            self.identifier, request_index, cur
        );
        Ok(cur)
    }

    pub fn get_cur_sequence_id(&self, request_index: usize) -> Result<i32> {
        Ok(self.slot(request_index)?.inner.lock().unwrap().cur_sequence_id)
    }

    pub fn get_next_sequence_id(&self, request_index: usize) -> Result<i32> {
        Ok(self.slot(request_index)?.inner.lock().unwrap().next_sequence_id)
    }

    pub fn get_stage_info(&self, request_index: usize, order: SequenceOrder) -> Result<StageInfo> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        Ok(inner.sequence(order).map_err(|e| anyhow!(e))?.stage_info)
    }

    // ---- port descriptors ----

    /// Declares ports on the addressed stage. Input-dependency ports feed
    /// the satisfaction counters; configuration ports only record their
    /// descriptor. Request-input ports are declared through
    /// [`set_request_input_info`](Self::set_request_input_info).
    pub fn set_port_descriptor(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        globals: &[GlobalId],
        dependency_index: usize,
    ) -> Result<()> {
        if op == PortOpType::RequestInput {
            return Err(anyhow!(FroError::InvalidArgument(
                "request-input ports are declared via request input info".to_string()
            )))
            .with_context(|| self.identifier.clone());
        }
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        self.check_state(&inner, &[RequestState::Executing], "set port descriptor")?;

        let seq = inner.sequence_mut(order).map_err(|e| anyhow!(e))?;
        for global in globals {
            let local = seq
                .map()
                .map(global, op.bucket())
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("{}: mapping port {}", self.identifier, global.port))?;
            let cfg = seq.config_mut(&local);
            match op {
                PortOpType::InputConfiguration => {
                    cfg.input_config[local.port].port = Some(*global);
                }
                PortOpType::OutputConfiguration => {
                    cfg.output_config[local.port].port = Some(*global);
                }
                PortOpType::InputDependency => {
                    let dep = cfg.dependency_mut(dependency_index).map_err(|e| anyhow!(e))?;
                    if local.port >= dep.entries.len() {
                        bail!(FroError::OutOfBound(
                            local.port as u64,
                            dep.entries.len() as u64
                        ));
                    }
                    dep.entries[local.port].port = Some(*global);
                    seq.account_dependency_declared();
                }
                PortOpType::RequestInput => unreachable!(),
            }
        }
        Ok(())
    }

    pub fn get_port_descriptors(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        dependency_index: usize,
    ) -> Result<Vec<GlobalId>> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        let seq = inner.sequence(order).map_err(|e| anyhow!(e))?;
        let mut ports = Vec::new();
        for cfg in seq.configs() {
            let entries = match op {
                PortOpType::InputConfiguration => &cfg.input_config,
                PortOpType::OutputConfiguration => &cfg.output_config,
                PortOpType::InputDependency => {
                    &cfg.dependency(dependency_index).map_err(|e| anyhow!(e))?.entries
                }
                PortOpType::RequestInput => &cfg.request_inputs,
            };
            ports.extend(entries.iter().filter_map(|e| e.port));
        }
        Ok(ports)
    }

    pub fn get_dependency_count(&self, request_index: usize, order: SequenceOrder) -> Result<usize> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        let seq = inner.sequence(order).map_err(|e| anyhow!(e))?;
        Ok(seq.configs().first().map(|c| c.num_dependencies()).unwrap_or(0))
    }

    // ---- buffer / metadata delivery ----

    /// Delivers a buffer to a port of the addressed stage. The first
    /// delivery to an input-dependency slot moves the satisfaction
    /// counters; repeats are silent no-ops.
    pub fn set_buffer_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        global: &GlobalId,
        handle: TargetBufferHandle,
        key: u64,
        status: PortBufferStatus,
        dependency_index: usize,
    ) -> Result<()> {
        if op == PortOpType::RequestInput {
            return Err(anyhow!(FroError::InvalidArgument(
                "buffer delivery is not supported on request-input ports".to_string()
            )))
            .with_context(|| self.identifier.clone());
        }
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        self.check_state(&inner, &BUFFER_STATES, "set buffer info")?;

        let seq = inner.sequence_mut(order).map_err(|e| anyhow!(e))?;
        let local = seq.map().map(global, op.bucket()).map_err(|e| anyhow!(e))?;
        let cfg = seq.config_mut(&local);
        match op {
            PortOpType::InputConfiguration => {
                cfg.input_config[local.port].set_buffer(handle, key, status);
            }
            PortOpType::OutputConfiguration => {
                cfg.output_config[local.port].set_buffer(handle, key, status);
            }
            PortOpType::InputDependency => {
                let dep = cfg.dependency_mut(dependency_index).map_err(|e| anyhow!(e))?;
                if local.port >= dep.entries.len() {
                    bail!(FroError::OutOfBound(
                        local.port as u64,
                        dep.entries.len() as u64
                    ));
                }
                // Only declared slots take part in the counter balance.
                if dep.entries[local.port].port.is_none() {
                    bail!(FroError::NoSuch(format!(
                        "input dependency port {} was never declared",
                        global.port
                    )));
                }
                let first = dep.entries[local.port].set_buffer(handle, key, status);
                if first {
                    if status.is_error() {
                        dep.buffer_error_present = true;
                    }
                    seq.account_buffer_arrival(status);
                    debug!(
                        "{} request:{}: dependency buffer on port {} ({:?}), outstanding:{}",
                        self.identifier,
                        request_index,
                        global.port,
                        status,
                        seq.outstanding()
                    );
                }
            }
            PortOpType::RequestInput => unreachable!(),
        }
        Ok(())
    }

    /// Delivers metadata; same write-once contract as buffer delivery.
    pub fn set_metadata_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        global: &GlobalId,
        handle: MetadataHandle,
        key: u64,
        dependency_index: usize,
    ) -> Result<()> {
        if op == PortOpType::RequestInput {
            return Err(anyhow!(FroError::InvalidArgument(
                "metadata delivery is not supported on request-input ports".to_string()
            )))
            .with_context(|| self.identifier.clone());
        }
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        self.check_state(&inner, &METADATA_STATES, "set metadata info")?;

        let seq = inner.sequence_mut(order).map_err(|e| anyhow!(e))?;
        let local = seq.map().map(global, op.bucket()).map_err(|e| anyhow!(e))?;
        let cfg = seq.config_mut(&local);
        match op {
            PortOpType::InputConfiguration => {
                cfg.input_config[local.port].set_metadata(handle, key);
            }
            PortOpType::OutputConfiguration => {
                cfg.output_config[local.port].set_metadata(handle, key);
            }
            PortOpType::InputDependency => {
                let dep = cfg.dependency_mut(dependency_index).map_err(|e| anyhow!(e))?;
                if local.port >= dep.entries.len() {
                    bail!(FroError::OutOfBound(
                        local.port as u64,
                        dep.entries.len() as u64
                    ));
                }
                if dep.entries[local.port].port.is_none() {
                    bail!(FroError::NoSuch(format!(
                        "input dependency port {} was never declared",
                        global.port
                    )));
                }
                if dep.entries[local.port].set_metadata(handle, key) {
                    seq.account_metadata_arrival();
                }
            }
            PortOpType::RequestInput => unreachable!(),
        }
        Ok(())
    }

    /// Overwrites the recorded delivery status of a port without touching
    /// the counters. An error status on a dependency set leaves a sticky
    /// marker.
    pub fn set_buffer_status(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        global: &GlobalId,
        dependency_index: usize,
        status: PortBufferStatus,
    ) -> Result<()> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        let seq = inner.sequence_mut(order).map_err(|e| anyhow!(e))?;
        let local = seq
            .lookup(global, op.bucket())
            .ok_or_else(|| anyhow!(FroError::NoSuch(format!("port {}", global.port))))?;
        let cfg = seq.config_mut(&local);
        let entry = match op {
            PortOpType::InputConfiguration => &mut cfg.input_config[local.port],
            PortOpType::OutputConfiguration => &mut cfg.output_config[local.port],
            PortOpType::InputDependency => {
                let dep = cfg.dependency_mut(dependency_index).map_err(|e| anyhow!(e))?;
                if local.port >= dep.entries.len() {
                    bail!(FroError::OutOfBound(
                        local.port as u64,
                        dep.entries.len() as u64
                    ));
                }
                if status.is_error() {
                    dep.buffer_error_present = true;
                }
                &mut dep.entries[local.port]
            }
            PortOpType::RequestInput => {
                bail!("{}: buffer status is not tracked on request-input ports", self.identifier)
            }
        };
        entry.buffer_status = Some(status);
        Ok(())
    }

    pub fn get_buffer_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        global: &GlobalId,
        dependency_index: usize,
    ) -> Result<(TargetBufferHandle, u64)> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        let seq = inner.sequence(order).map_err(|e| anyhow!(e))?;
        let local = seq
            .lookup(global, op.bucket())
            .ok_or_else(|| anyhow!(FroError::NoSuch(format!("port {}", global.port))))?;
        let cfg = seq.config(&local);
        let entry = match op {
            PortOpType::InputConfiguration => &cfg.input_config[local.port],
            PortOpType::OutputConfiguration => &cfg.output_config[local.port],
            PortOpType::InputDependency => {
                let dep = cfg.dependency(dependency_index).map_err(|e| anyhow!(e))?;
                dep.entries.get(local.port).ok_or_else(|| {
                    anyhow!(FroError::OutOfBound(
                        local.port as u64,
                        dep.entries.len() as u64
                    ))
                })?
            }
            PortOpType::RequestInput => {
                bail!("{}: use request input info accessors", self.identifier)
            }
        };
        match (entry.buffer, entry.key) {
            (Some(handle), Some(key)) => Ok((handle, key)),
            _ => Err(anyhow!(FroError::NoSuch(format!(
                "buffer on port {}",
                global.port
            )))),
        }
    }

    pub fn get_metadata_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        op: PortOpType,
        global: &GlobalId,
        dependency_index: usize,
    ) -> Result<MetadataHandle> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        let seq = inner.sequence(order).map_err(|e| anyhow!(e))?;
        let local = seq
            .lookup(global, op.bucket())
            .ok_or_else(|| anyhow!(FroError::NoSuch(format!("port {}", global.port))))?;
        let cfg = seq.config(&local);
        let entry = match op {
            PortOpType::InputConfiguration => &cfg.input_config[local.port],
            PortOpType::OutputConfiguration => &cfg.output_config[local.port],
            PortOpType::InputDependency => {
                let dep = cfg.dependency(dependency_index).map_err(|e| anyhow!(e))?;
                dep.entries.get(local.port).ok_or_else(|| {
                    anyhow!(FroError::OutOfBound(
                        local.port as u64,
                        dep.entries.len() as u64
                    ))
                })?
            }
            PortOpType::RequestInput => {
                bail!("{}: use request input info accessors", self.identifier)
            }
        };
        entry
            .metadata
            .ok_or_else(|| anyhow!(FroError::NoSuch(format!("metadata on port {}", global.port))))
    }

    // ---- request inputs ----

    /// Arms one request-input slot of the addressed stage with the port it
    /// serves and the caller's buffer and metadata.
    pub fn set_request_input_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        input_index: usize,
        global: GlobalId,
        buffer: TargetBufferHandle,
        metadata: Option<MetadataHandle>,
        key: u64,
    ) -> Result<()> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        self.check_state(&inner, &[RequestState::Executing], "set request input info")?;

        let seq = inner.sequence_mut(order).map_err(|e| anyhow!(e))?;
        let local = seq
            .map()
            .map(&global, PortOpType::RequestInput.bucket())
            .map_err(|e| anyhow!(e))?;
        let entry = seq
            .config_mut(&local)
            .request_input_mut(input_index)
            .map_err(|e| anyhow!(e))?;
        entry.port = Some(global);
        entry.buffer = Some(buffer);
        entry.metadata = metadata;
        entry.key = Some(key);
        Ok(())
    }

    /// Clears a request-input slot so it can be re-armed, unlike
    /// dependency slots which stay write-once for the life of the stage.
    pub fn reset_request_input_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        input_index: usize,
    ) -> Result<()> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        let seq = inner.sequence_mut(order).map_err(|e| anyhow!(e))?;
        // The slot may live in any session/pipeline pair, so clear it in
        // every table.
        for config in seq.configs_mut() {
            if let Ok(entry) = config.request_input_mut(input_index) {
                *entry = Default::default();
            }
        }
        Ok(())
    }

    pub fn get_request_input_info(
        &self,
        request_index: usize,
        order: SequenceOrder,
        input_index: usize,
    ) -> Result<(GlobalId, TargetBufferHandle, Option<MetadataHandle>, u64)> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        let seq = inner.sequence(order).map_err(|e| anyhow!(e))?;
        for cfg in seq.configs() {
            let entry = cfg.request_input(input_index).map_err(|e| anyhow!(e))?;
            if let (Some(port), Some(buffer), Some(key)) = (entry.port, entry.buffer, entry.key) {
                return Ok((port, buffer, entry.metadata, key));
            }
        }
        Err(anyhow!(FroError::NoSuch(format!(
            "request input {}",
            input_index
        ))))
    }

    pub fn get_num_request_inputs(&self, request_index: usize, order: SequenceOrder) -> Result<usize> {
        self.get_dependency_count(request_index, order)
    }

    // ---- satisfaction ----

    /// Classifies the input dependencies of the current stage. Outstanding
    /// deliveries dominate; once everything arrived the error count picks
    /// between clean, partial and total failure.
    pub fn input_dependency_status(&self, request_index: usize) -> DependencyStatus {
        let slot = match self.slot(request_index) {
            Ok(s) => s,
            Err(_) => return DependencyStatus::Unknown,
        };
        let inner = slot.inner.lock().unwrap();
        let seq = match inner.sequence(SequenceOrder::Current) {
            Ok(s) => s,
            Err(_) => return DependencyStatus::Unknown,
        };

        let total = seq.total_input_dependencies;
        let errors = seq.errors_seen();
        if seq.outstanding() > 0 {
            debug!(
                "{} request:{}: dependencies not satisfied, total:{} errors:{} received:{}",
                self.identifier,
                request_index,
                total,
                errors,
                seq.buffers_received()
            );
            DependencyStatus::NotSatisfied
        } else if errors == total && total > 0 {
            DependencyStatus::ErroredOut
        } else if errors > 0 {
            DependencyStatus::SatisfiedWithError
        } else {
            DependencyStatus::Satisfied
        }
    }

    // ---- output completion ----

    pub fn set_output_notified_for_port(&self, request_index: usize, global: &GlobalId) -> Result<()> {
        self.set_latch(request_index, OutputLatch::Notified, global)
    }

    pub fn set_release_acknowledged_for_port(
        &self,
        request_index: usize,
        global: &GlobalId,
    ) -> Result<()> {
        self.set_latch(request_index, OutputLatch::Released, global)
    }

    pub fn set_output_generated_for_port(&self, request_index: usize, global: &GlobalId) -> Result<()> {
        self.set_latch(request_index, OutputLatch::Generated, global)
    }

    fn set_latch(&self, request_index: usize, latch: OutputLatch, global: &GlobalId) -> Result<()> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        inner
            .set_output_latch(latch, global)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("{} request:{}", self.identifier, request_index))
    }

    pub fn are_outputs_notified(&self, request_index: usize) -> Result<bool> {
        Ok(self
            .slot(request_index)?
            .inner
            .lock()
            .unwrap()
            .all_latched(OutputLatch::Notified))
    }

    pub fn are_outputs_released(&self, request_index: usize) -> Result<bool> {
        Ok(self
            .slot(request_index)?
            .inner
            .lock()
            .unwrap()
            .all_latched(OutputLatch::Released))
    }

    pub fn are_outputs_generated(&self, request_index: usize) -> Result<bool> {
        Ok(self
            .slot(request_index)?
            .inner
            .lock()
            .unwrap()
            .all_latched(OutputLatch::Generated))
    }

    pub fn get_request_outputs(&self, request_index: usize) -> Result<Vec<GlobalId>> {
        Ok(self
            .slot(request_index)?
            .inner
            .lock()
            .unwrap()
            .outputs()
            .to_vec())
    }

    // ---- final results ----

    /// The buffer and metadata recorded for a declared output port,
    /// scanning every committed stage. Later stages win when several wrote
    /// the same port.
    pub fn get_final_buffer_metadata_info(
        &self,
        request_index: usize,
        global: &GlobalId,
    ) -> Result<(Option<TargetBufferHandle>, Option<MetadataHandle>)> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        if !inner.outputs().iter().any(|o| {
            o.session == global.session && o.pipeline == global.pipeline && o.port == global.port
        }) {
            bail!(FroError::NoSuch(format!(
                "output port {} not declared",
                global.port
            )));
        }
        let mut found = (None, None);
        for id in 0..inner.num_sequences() {
            let seq = match inner.sequence_at(id) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Some(local) = seq.lookup(global, PortOpType::OutputConfiguration.bucket()) {
                let entry = &seq.config(&local).output_config[local.port];
                if entry.buffer.is_some() || entry.metadata.is_some() {
                    found = (entry.buffer, entry.metadata);
                }
            }
        }
        Ok(found)
    }

    /// Declared external output identifiers of one request.
    pub fn get_final_global_identifiers(&self, request_index: usize) -> Result<Vec<GlobalId>> {
        use crate::types::PortDirectionType;
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        Ok(inner
            .outputs()
            .iter()
            .filter(|o| {
                matches!(
                    o.direction,
                    PortDirectionType::ExternalOutput | PortDirectionType::InternalOutput
                )
            })
            .copied()
            .collect())
    }

    // ---- result rendezvous ----

    pub fn wait_on_result(&self, request_index: usize, timeout: Duration) -> Result<()> {
        let slot = self.slot(request_index)?;
        slot.wait_on_result(timeout)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("{} request:{}", self.identifier, request_index))
    }

    pub fn notify_final_result_received(&self, request_index: usize) -> Result<()> {
        let slot = self.slot(request_index)?;
        slot.notify_result();
        debug!("{} request:{}: final result signalled", self.identifier, request_index);
        Ok(())
    }

    // ---- batch cursor ----

    pub fn cur_request_id(&self) -> usize {
        *self.cur_request.lock().unwrap()
    }

    /// Advances the processing cursor over the batch.
    pub fn move_to_next_request(&self) -> Result<usize> {
        let mut cur = self.cur_request.lock().unwrap();
        if *cur + 1 >= self.requests.len() {
            bail!(FroError::OutOfBound(
                (*cur + 1) as u64,
                self.requests.len() as u64
            ));
        }
        *cur += 1;
        Ok(*cur)
    }

    // ---- private data ----

    pub fn set_sequence_private_data(
        &self,
        request_index: usize,
        sequence_id: usize,
        data: PrivateData,
    ) -> Result<()> {
        let slot = self.slot(request_index)?;
        let mut inner = slot.inner.lock().unwrap();
        inner.sequence_at_mut(sequence_id).map_err(|e| anyhow!(e))?.private_data = Some(data);
        Ok(())
    }

    pub fn sequence_private_data(
        &self,
        request_index: usize,
        sequence_id: usize,
    ) -> Result<Option<PrivateData>> {
        let slot = self.slot(request_index)?;
        let inner = slot.inner.lock().unwrap();
        Ok(inner.sequence_at(sequence_id).map_err(|e| anyhow!(e))?.private_data.clone())
    }

    pub fn set_feature_private_data(&self, data: PrivateData) {
        *self.feature_private_data.lock().unwrap() = Some(data);
    }

    pub fn feature_private_data(&self) -> Option<PrivateData> {
        self.feature_private_data.lock().unwrap().clone()
    }

    pub fn graph_private_data(&self) -> Option<PrivateData> {
        self.graph_private_data.clone()
    }

    // ---- misc ----

    pub fn usecase_request(&self) -> Result<Arc<dyn UsecaseRequest>> {
        self.usecase_request.upgrade().ok_or_else(|| {
            anyhow!(FroError::InvalidState(
                "access usecase request".to_string(),
                "owner released".to_string()
            ))
        })
    }

    pub fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub fn camera_id(&self) -> u32 {
        self.camera_id
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn num_requests(&self) -> usize {
        self.requests.len()
    }

    /// Writes a structured snapshot of every request for debugging.
    /// Write failures are ignored; a broken sink must not fail the engine.
    pub fn dump(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "{}:", self.identifier);
        let _ = writeln!(out, "  numRequests: {}", self.requests.len());
        let _ = writeln!(out, "  curRequestId: {}", self.cur_request_id());
        for (idx, slot) in self.requests.iter().enumerate() {
            let inner = slot.inner.lock().unwrap();
            let _ = writeln!(
                out,
                "  request {}: state:{:?} curSeq:{} nextSeq:{}",
                idx, inner.state, inner.cur_sequence_id, inner.next_sequence_id
            );
            for id in 0..inner.num_sequences() {
                if let Ok(seq) = inner.sequence_at(id) {
                    let _ = writeln!(
                        out,
                        "    sequence {}: stage:{} total:{} outstanding:{} errors:{} metadataPending:{}",
                        id,
                        seq.stage_info.stage_id,
                        seq.total_input_dependencies,
                        seq.outstanding(),
                        seq.errors_seen(),
                        seq.metadata_to_satisfy
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortDirectionType;
    use crate::uro::InterFeatureData;
    use std::collections::HashMap;
    use std::thread;

    struct TestUsecase {
        frame: u64,
        store: Mutex<HashMap<(FeatureId, u32, u64), InterFeatureData>>,
    }

    impl TestUsecase {
        fn new(frame: u64) -> Arc<Self> {
            Arc::new(TestUsecase {
                frame,
                store: Mutex::new(HashMap::new()),
            })
        }
    }

    impl UsecaseRequest for TestUsecase {
        fn app_frame_number(&self) -> u64 {
            self.frame
        }

        fn app_settings(&self) -> Option<MetadataHandle> {
            None
        }

        fn set_inter_feature_private_data(
            &self,
            feature_id: FeatureId,
            camera_id: u32,
            key: u64,
            data: InterFeatureData,
        ) {
            self.store
                .lock()
                .unwrap()
                .insert((feature_id, camera_id, key), data);
        }

        fn get_inter_feature_private_data(
            &self,
            feature_id: FeatureId,
            camera_id: u32,
            key: u64,
        ) -> Option<InterFeatureData> {
            self.store
                .lock()
                .unwrap()
                .get(&(feature_id, camera_id, key))
                .cloned()
        }

        fn remove_inter_feature_private_data(&self, feature_id: FeatureId, camera_id: u32, key: u64) {
            self.store
                .lock()
                .unwrap()
                .remove(&(feature_id, camera_id, key));
        }
    }

    fn output_port(port: u8) -> GlobalId {
        let mut id = GlobalId::new(0, 0, port);
        id.direction = PortDirectionType::ExternalOutput;
        id
    }

    fn maxima() -> DependencyTableMaxima {
        DependencyTableMaxima {
            max_session: 2,
            max_pipeline: 2,
            max_port: 4,
            max_sequence: 3,
        }
    }

    fn build_fro(uro: &Arc<TestUsecase>, num_requests: usize) -> FeatureRequestObject {
        let outputs = (0..num_requests)
            .map(|_| vec![output_port(1), output_port(2)])
            .collect();
        FeatureRequestObject::new(FroConfig {
            usecase_request: uro.clone() as Arc<dyn UsecaseRequest>,
            feature_id: FeatureId(7),
            feature_name: "bayer2yuv".to_string(),
            camera_id: 0,
            instance_id: 1,
            request_outputs: outputs,
            graph_private_data: None,
        })
        .unwrap()
    }

    fn to_executing(fro: &FeatureRequestObject, idx: usize) {
        fro.set_state(idx, RequestState::ReadyToExecute).unwrap();
        fro.set_state(idx, RequestState::Executing).unwrap();
    }

    /// Stages one stage with `num_ports` input-dependency ports declared
    /// in set 0 and commits it.
    fn stage_with_dependencies(fro: &FeatureRequestObject, idx: usize, num_ports: u8) {
        fro.set_config_info(maxima()).unwrap();
        to_executing(fro, idx);
        let stage = StageInfo { stage_id: 0, stage_sequence_id: 0 };
        fro.set_next_stage_info(idx, stage, 1, 4).unwrap();
        let ports: Vec<GlobalId> = (0..num_ports).map(|p| GlobalId::new(0, 0, p)).collect();
        if !ports.is_empty() {
            fro.set_port_descriptor(idx, SequenceOrder::Next, PortOpType::InputDependency, &ports, 0)
                .unwrap();
        }
        fro.move_to_next_sequence(idx).unwrap();
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let uro = TestUsecase::new(1);
        assert!(FeatureRequestObject::new(FroConfig {
            usecase_request: uro.clone() as Arc<dyn UsecaseRequest>,
            feature_id: FeatureId(1),
            feature_name: "f".to_string(),
            camera_id: 0,
            instance_id: 0,
            request_outputs: vec![],
            graph_private_data: None,
        })
        .is_err());
        assert!(FeatureRequestObject::new(FroConfig {
            usecase_request: uro as Arc<dyn UsecaseRequest>,
            feature_id: FeatureId(1),
            feature_name: "f".to_string(),
            camera_id: 0,
            instance_id: 0,
            request_outputs: vec![vec![]],
            graph_private_data: None,
        })
        .is_err());
    }

    #[test]
    fn test_identifier_string() {
        let uro = TestUsecase::new(42);
        let fro = build_fro(&uro, 1);
        assert_eq!(fro.identifier(), "FRO-URO:42_bayer2yuv:1_0");
    }

    #[test]
    fn test_clean_dependency_satisfaction() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 2);
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::NotSatisfied);

        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &GlobalId::new(0, 0, 0),
            TargetBufferHandle(100),
            0,
            PortBufferStatus::Ok,
            0,
        )
        .unwrap();
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::NotSatisfied);

        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &GlobalId::new(0, 0, 1),
            TargetBufferHandle(101),
            0,
            PortBufferStatus::Ok,
            0,
        )
        .unwrap();
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::Satisfied);

        let (handle, _) = fro
            .get_buffer_info(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &GlobalId::new(0, 0, 0),
                0,
            )
            .unwrap();
        assert_eq!(handle, TargetBufferHandle(100));
    }

    #[test]
    fn test_partial_and_total_error_classification() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 2);

        // Request 0: one error, one success.
        stage_with_dependencies(&fro, 0, 2);
        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &GlobalId::new(0, 0, 0),
            TargetBufferHandle(1),
            0,
            PortBufferStatus::Error,
            0,
        )
        .unwrap();
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::NotSatisfied);
        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &GlobalId::new(0, 0, 1),
            TargetBufferHandle(2),
            0,
            PortBufferStatus::Ok,
            0,
        )
        .unwrap();
        assert_eq!(
            fro.input_dependency_status(0),
            DependencyStatus::SatisfiedWithError
        );

        // Request 1: every dependency errors out.
        to_executing(&fro, 1);
        let stage = StageInfo { stage_id: 0, stage_sequence_id: 0 };
        fro.set_next_stage_info(1, stage, 1, 4).unwrap();
        let ports = [GlobalId::new(0, 0, 0), GlobalId::new(0, 0, 1)];
        fro.set_port_descriptor(1, SequenceOrder::Next, PortOpType::InputDependency, &ports, 0)
            .unwrap();
        fro.move_to_next_sequence(1).unwrap();
        for port in &ports {
            fro.set_buffer_info(
                1,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                port,
                TargetBufferHandle(9),
                0,
                PortBufferStatus::Error,
                0,
            )
            .unwrap();
        }
        assert_eq!(fro.input_dependency_status(1), DependencyStatus::ErroredOut);
    }

    #[test]
    fn test_stage_without_dependencies_is_satisfied() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 0);
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::Satisfied);
    }

    #[test]
    fn test_duplicate_delivery_is_noop() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 1);
        let port = GlobalId::new(0, 0, 0);
        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &port,
            TargetBufferHandle(5),
            7,
            PortBufferStatus::Ok,
            0,
        )
        .unwrap();
        // A second delivery must not overwrite the handle nor move the
        // counters back.
        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &port,
            TargetBufferHandle(6),
            8,
            PortBufferStatus::Error,
            0,
        )
        .unwrap();
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::Satisfied);
        let (handle, key) = fro
            .get_buffer_info(0, SequenceOrder::Current, PortOpType::InputDependency, &port, 0)
            .unwrap();
        assert_eq!(handle, TargetBufferHandle(5));
        assert_eq!(key, 7);
    }

    #[test]
    fn test_delivery_on_undeclared_port_is_rejected() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 1);
        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &GlobalId::new(0, 0, 0),
            TargetBufferHandle(1),
            0,
            PortBufferStatus::Ok,
            0,
        )
        .unwrap();
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::Satisfied);

        // An errored delivery on a port the stage never declared must not
        // touch the counters.
        let stray = GlobalId::new(0, 0, 9);
        assert!(fro
            .set_buffer_info(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &stray,
                TargetBufferHandle(2),
                0,
                PortBufferStatus::Error,
                0,
            )
            .is_err());
        assert!(fro
            .set_metadata_info(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &stray,
                MetadataHandle(2),
                0,
                0,
            )
            .is_err());
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::Satisfied);
        let mut buf = Vec::new();
        fro.dump(&mut buf);
    }

    #[test]
    fn test_narrow_dependency_set_bounds() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        fro.set_config_info(maxima()).unwrap();
        to_executing(&fro, 0);
        let stage = StageInfo { stage_id: 0, stage_sequence_id: 0 };
        // One dependency set, one slot wide; the port bucket still holds
        // up to max_port entries.
        fro.set_next_stage_info(0, stage, 1, 1).unwrap();
        fro.set_port_descriptor(
            0,
            SequenceOrder::Next,
            PortOpType::InputDependency,
            &[GlobalId::new(0, 0, 0)],
            0,
        )
        .unwrap();
        fro.move_to_next_sequence(0).unwrap();

        // Delivery on a second port mints local index 1, past the set
        // width; every path must report it instead of indexing blindly.
        let wide = GlobalId::new(0, 0, 1);
        assert!(fro
            .set_buffer_info(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &wide,
                TargetBufferHandle(3),
                0,
                PortBufferStatus::Ok,
                0,
            )
            .is_err());
        assert!(fro
            .set_buffer_status(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &wide,
                0,
                PortBufferStatus::Error,
            )
            .is_err());
        assert!(fro
            .get_buffer_info(0, SequenceOrder::Current, PortOpType::InputDependency, &wide, 0)
            .is_err());
        assert!(fro
            .get_metadata_info(0, SequenceOrder::Current, PortOpType::InputDependency, &wide, 0)
            .is_err());
        assert_eq!(fro.input_dependency_status(0), DependencyStatus::NotSatisfied);
    }

    #[test]
    fn test_metadata_delivery() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 1);
        let port = GlobalId::new(0, 0, 0);
        fro.set_metadata_info(
            0,
            SequenceOrder::Current,
            PortOpType::InputDependency,
            &port,
            MetadataHandle(11),
            0,
            0,
        )
        .unwrap();
        assert_eq!(
            fro.get_metadata_info(0, SequenceOrder::Current, PortOpType::InputDependency, &port, 0)
                .unwrap(),
            MetadataHandle(11)
        );
    }

    #[test]
    fn test_delivery_rejected_in_wrong_state() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 1);
        // Move off the delivery states.
        fro.set_state(0, RequestState::ReadyToExecute).unwrap();
        let port = GlobalId::new(0, 0, 0);
        assert!(fro
            .set_buffer_info(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &port,
                TargetBufferHandle(1),
                0,
                PortBufferStatus::Ok,
                0,
            )
            .is_err());
        assert!(fro
            .set_metadata_info(
                0,
                SequenceOrder::Current,
                PortOpType::InputDependency,
                &port,
                MetadataHandle(1),
                0,
                0,
            )
            .is_err());
    }

    #[test]
    fn test_request_input_arm_and_reset() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 1);
        let port = GlobalId::new(0, 0, 3);
        fro.set_request_input_info(
            0,
            SequenceOrder::Current,
            0,
            port,
            TargetBufferHandle(77),
            Some(MetadataHandle(78)),
            5,
        )
        .unwrap();
        let (got_port, buffer, metadata, key) = fro
            .get_request_input_info(0, SequenceOrder::Current, 0)
            .unwrap();
        assert_eq!(got_port.port, port.port);
        assert_eq!(buffer, TargetBufferHandle(77));
        assert_eq!(metadata, Some(MetadataHandle(78)));
        assert_eq!(key, 5);
        assert_eq!(fro.get_num_request_inputs(0, SequenceOrder::Current).unwrap(), 1);

        fro.reset_request_input_info(0, SequenceOrder::Current, 0).unwrap();
        assert!(fro.get_request_input_info(0, SequenceOrder::Current, 0).is_err());
    }

    #[test]
    fn test_output_latches_and_aggregates() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        let p1 = output_port(1);
        let p2 = output_port(2);
        fro.set_output_notified_for_port(0, &p1).unwrap();
        assert!(!fro.are_outputs_notified(0).unwrap());
        assert!(fro.set_output_notified_for_port(0, &p1).is_err());
        fro.set_output_notified_for_port(0, &p2).unwrap();
        assert!(fro.are_outputs_notified(0).unwrap());

        assert!(!fro.are_outputs_released(0).unwrap());
        fro.set_release_acknowledged_for_port(0, &p1).unwrap();
        fro.set_release_acknowledged_for_port(0, &p2).unwrap();
        assert!(fro.are_outputs_released(0).unwrap());

        fro.set_output_generated_for_port(0, &p1).unwrap();
        fro.set_output_generated_for_port(0, &p2).unwrap();
        assert!(fro.are_outputs_generated(0).unwrap());
    }

    #[test]
    fn test_final_buffer_metadata_info() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 0);
        let out = output_port(1);
        fro.set_port_descriptor(0, SequenceOrder::Current, PortOpType::OutputConfiguration, &[out], 0)
            .unwrap();
        fro.set_buffer_info(
            0,
            SequenceOrder::Current,
            PortOpType::OutputConfiguration,
            &out,
            TargetBufferHandle(200),
            0,
            PortBufferStatus::Ok,
            0,
        )
        .unwrap();
        let (buffer, metadata) = fro.get_final_buffer_metadata_info(0, &out).unwrap();
        assert_eq!(buffer, Some(TargetBufferHandle(200)));
        assert_eq!(metadata, None);
        // Undeclared ports are rejected.
        assert!(fro
            .get_final_buffer_metadata_info(0, &GlobalId::new(0, 0, 9))
            .is_err());

        let finals = fro.get_final_global_identifiers(0).unwrap();
        assert_eq!(finals.len(), 2);
    }

    #[test]
    fn test_state_gate_on_port_declaration() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        fro.set_config_info(maxima()).unwrap();
        // Still Initialized; declaring ports needs Executing.
        let stage = StageInfo { stage_id: 0, stage_sequence_id: 0 };
        fro.set_next_stage_info(0, stage, 1, 4).unwrap();
        assert!(fro
            .set_port_descriptor(
                0,
                SequenceOrder::Next,
                PortOpType::InputDependency,
                &[GlobalId::new(0, 0, 0)],
                0,
            )
            .is_err());
    }

    #[test]
    fn test_stage_work_requires_config_info() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        let stage = StageInfo { stage_id: 0, stage_sequence_id: 0 };
        assert!(fro.set_next_stage_info(0, stage, 1, 4).is_err());
    }

    #[test]
    fn test_sequence_bound() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        fro.set_config_info(maxima()).unwrap();
        to_executing(&fro, 0);
        let stage = StageInfo { stage_id: 0, stage_sequence_id: 0 };
        for _ in 0..maxima().max_sequence {
            fro.set_next_stage_info(0, stage, 1, 4).unwrap();
            fro.move_to_next_sequence(0).unwrap();
        }
        assert!(fro.set_next_stage_info(0, stage, 1, 4).is_err());
        assert!(fro.move_to_next_sequence(0).is_err());
    }

    #[test]
    fn test_batch_cursor() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 3);
        assert_eq!(fro.cur_request_id(), 0);
        assert_eq!(fro.move_to_next_request().unwrap(), 1);
        assert_eq!(fro.move_to_next_request().unwrap(), 2);
        assert!(fro.move_to_next_request().is_err());
        assert_eq!(fro.cur_request_id(), 2);
    }

    #[test]
    fn test_request_index_bounds() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        assert!(fro.get_state(1).is_err());
        assert_eq!(fro.input_dependency_status(1), DependencyStatus::Unknown);
    }

    #[test]
    fn test_wait_and_notify() {
        let uro = TestUsecase::new(1);
        let fro = Arc::new(build_fro(&uro, 1));
        let waiter = fro.clone();
        let handle = thread::spawn(move || waiter.wait_on_result(0, Duration::from_secs(5)));
        fro.notify_final_result_received(0).unwrap();
        assert!(handle.join().unwrap().is_ok());
        assert!(fro.wait_on_result(0, Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_inter_feature_private_data() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        let usecase = fro.usecase_request().unwrap();
        usecase.set_inter_feature_private_data(FeatureId(7), 0, 1, Arc::new(99u32));
        let data = usecase
            .get_inter_feature_private_data(FeatureId(7), 0, 1)
            .unwrap();
        assert_eq!(*data.downcast::<u32>().unwrap(), 99);
        usecase.remove_inter_feature_private_data(FeatureId(7), 0, 1);
        assert!(usecase.get_inter_feature_private_data(FeatureId(7), 0, 1).is_none());
    }

    #[test]
    fn test_usecase_request_released() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        drop(uro);
        assert!(fro.usecase_request().is_err());
    }

    #[test]
    fn test_sequence_private_data() {
        let uro = TestUsecase::new(1);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 0);
        fro.set_sequence_private_data(0, 0, Arc::new("stage0")).unwrap();
        assert!(fro.sequence_private_data(0, 0).unwrap().is_some());
        assert!(fro.sequence_private_data(0, 1).is_err());
    }

    #[test]
    fn test_dump_snapshot() {
        let uro = TestUsecase::new(3);
        let fro = build_fro(&uro, 1);
        stage_with_dependencies(&fro, 0, 2);
        let mut buf = Vec::new();
        fro.dump(&mut buf);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("FRO-URO:3_bayer2yuv:1_0"));
        assert!(out.contains("state:Executing"));
        assert!(out.contains("total:2"));
    }
}
