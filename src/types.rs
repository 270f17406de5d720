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

//! Identifiers, handles and descriptor types shared across the request engine.

/// Unassigned slot in the identifier map.
pub const INVALID_INDEX: u8 = 0xFF;
/// Stage id of an uninitialized sequence slot.
pub const INVALID_STAGE_ID: u8 = 0xFF;
/// Sequence cursor value before any stage has been committed.
pub const INVALID_SEQUENCE_ID: i32 = -1;
/// Number of per-pipeline port buckets in the identifier map.
pub const OPS_TYPE_MAX: usize = 3;

/// Identity of a feature within the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeatureId(pub u32);

/// Opaque handle to an image buffer owned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetBufferHandle(pub u64);

/// Opaque handle to a metadata blob owned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PortDirectionType {
    #[default]
    ExternalInput = 0,
    InternalInput,
    ExternalOutput,
    InternalOutput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PortType {
    #[default]
    ImageBuffer = 0,
    MetaData,
}

/// Global port identifier: position in the graph topology plus
/// classification of the port itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GlobalId {
    pub session: u8,
    pub pipeline: u8,
    pub port: u8,
    pub direction: PortDirectionType,
    pub port_type: PortType,
}

impl GlobalId {
    pub fn new(session: u8, pipeline: u8, port: u8) -> Self {
        GlobalId {
            session,
            pipeline,
            port,
            ..Default::default()
        }
    }
}

/// Which table a per-port operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortOpType {
    RequestInput,
    InputDependency,
    InputConfiguration,
    OutputConfiguration,
}

impl PortOpType {
    /// Identifier-map bucket for this operation. Request inputs and input
    /// dependencies address the same ports and share a bucket.
    pub fn bucket(self) -> usize {
        match self {
            PortOpType::RequestInput | PortOpType::InputDependency => 0,
            PortOpType::InputConfiguration => 1,
            PortOpType::OutputConfiguration => 2,
        }
    }
}

/// Delivery status recorded on a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortBufferStatus {
    Ok,
    Error,
}

impl PortBufferStatus {
    pub fn is_error(self) -> bool {
        matches!(self, PortBufferStatus::Error)
    }
}

/// Selects which stage slot an accessor addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceOrder {
    Current,
    Next,
}

/// Stage identity within the feature descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageInfo {
    pub stage_id: u8,
    pub stage_sequence_id: u8,
}

impl Default for StageInfo {
    fn default() -> Self {
        StageInfo {
            stage_id: INVALID_STAGE_ID,
            stage_sequence_id: INVALID_STAGE_ID,
        }
    }
}

/// Topology maxima fixed at configuration time. They bound the identifier
/// map and the number of stage slots a request may hold.
#[derive(Clone, Copy, Debug, Default)]
pub struct DependencyTableMaxima {
    pub max_session: usize,
    pub max_pipeline: usize,
    pub max_port: usize,
    pub max_sequence: usize,
}

impl DependencyTableMaxima {
    pub fn is_valid(&self) -> bool {
        self.max_session > 0
            && self.max_pipeline > 0
            && self.max_port > 0
            && self.max_sequence > 0
    }
}

/// Aggregate classification of a stage's input dependencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Every dependency arrived without error.
    Satisfied,
    /// Every dependency arrived, some with errors.
    SatisfiedWithError,
    /// Every dependency arrived and all of them errored.
    ErroredOut,
    /// At least one dependency is still outstanding.
    NotSatisfied,
    /// The query could not be answered (bad request index).
    Unknown,
}
