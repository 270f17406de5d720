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

//! Dependency-resolution state engine for multi-stage feature requests.
//!
//! A feature executes a usecase request as a sequence of stages, each with
//! its own input dependencies, configuration ports and outputs. The
//! [`FeatureRequestObject`] tracks one batch of such requests: the life
//! cycle state of every request, which dependencies are still outstanding,
//! which outputs have been produced and acknowledged, and the rendezvous
//! with the thread waiting for the final result.

pub mod dependency;
pub mod error;
pub mod fro;
pub mod identifier_map;
pub mod request;
pub mod sequence;
pub mod state;
pub mod types;
pub mod uro;

pub use error::FroError;
pub use fro::{FeatureRequestObject, FroConfig, PrivateData};
pub use state::RequestState;
pub use types::{
    DependencyStatus, DependencyTableMaxima, FeatureId, GlobalId, MetadataHandle,
    PortBufferStatus, PortOpType, SequenceOrder, StageInfo, TargetBufferHandle,
};
pub use uro::{InterFeatureData, UsecaseRequest};
