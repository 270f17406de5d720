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

//! Translates global session/pipeline/port identifiers into dense local
//! indices. Each stage owns one map so the dependency tables can be indexed
//! directly, regardless of which global ids the graph hands out.

use crate::error::FroError;
use crate::types::{DependencyTableMaxima, GlobalId, INVALID_INDEX, OPS_TYPE_MAX};

/// Port bucket: global port ids in first-seen order.
#[derive(Clone, Debug)]
struct PortBucket {
    last_index: usize,
    ports: Vec<u8>,
}

impl PortBucket {
    fn new(max_port: usize) -> Self {
        PortBucket {
            last_index: 0,
            ports: vec![INVALID_INDEX; max_port],
        }
    }

    fn find(&self, port: u8) -> Option<usize> {
        self.ports[..self.last_index].iter().position(|&p| p == port)
    }

    fn assign(&mut self, port: u8) -> Result<usize, FroError> {
        if let Some(idx) = self.find(port) {
            return Ok(idx);
        }
        if self.last_index >= self.ports.len() {
            return Err(FroError::OutOfBound(
                self.last_index as u64,
                self.ports.len() as u64,
            ));
        }
        let idx = self.last_index;
        self.ports[idx] = port;
        self.last_index += 1;
        Ok(idx)
    }
}

#[derive(Clone, Debug)]
struct PipelineSlot {
    pipeline: u8,
    buckets: Vec<PortBucket>,
}

impl PipelineSlot {
    fn new(max_port: usize) -> Self {
        PipelineSlot {
            pipeline: INVALID_INDEX,
            buckets: vec![PortBucket::new(max_port); OPS_TYPE_MAX],
        }
    }
}

#[derive(Clone, Debug)]
struct SessionSlot {
    session: u8,
    last_pipeline: usize,
    pipelines: Vec<PipelineSlot>,
}

impl SessionSlot {
    fn new(maxima: &DependencyTableMaxima) -> Self {
        SessionSlot {
            session: INVALID_INDEX,
            last_pipeline: 0,
            pipelines: vec![PipelineSlot::new(maxima.max_port); maxima.max_pipeline],
        }
    }
}

/// Local indices a [`GlobalId`] resolves to within one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalIndex {
    pub session: usize,
    pub pipeline: usize,
    pub port: usize,
}

/// Three-level first-seen map bounded by the configured topology maxima.
#[derive(Clone, Debug)]
pub struct IdentifierMap {
    last_session: usize,
    sessions: Vec<SessionSlot>,
}

impl IdentifierMap {
    pub fn new(maxima: &DependencyTableMaxima) -> Self {
        IdentifierMap {
            last_session: 0,
            sessions: vec![SessionSlot::new(maxima); maxima.max_session],
        }
    }

    /// Resolves `global` in `bucket`, assigning fresh local indices for
    /// unseen session/pipeline/port values. Assignment order is the order
    /// of first sighting, so indices are stable for a given call sequence.
    pub fn map(&mut self, global: &GlobalId, bucket: usize) -> Result<LocalIndex, FroError> {
        if bucket >= OPS_TYPE_MAX {
            return Err(FroError::OutOfBound(bucket as u64, OPS_TYPE_MAX as u64));
        }

        let session_idx = match self.sessions[..self.last_session]
            .iter()
            .position(|s| s.session == global.session)
        {
            Some(idx) => idx,
            None => {
                if self.last_session >= self.sessions.len() {
                    return Err(FroError::OutOfBound(
                        self.last_session as u64,
                        self.sessions.len() as u64,
                    ));
                }
                let idx = self.last_session;
                self.sessions[idx].session = global.session;
                self.last_session += 1;
                idx
            }
        };

        let session = &mut self.sessions[session_idx];
        let pipeline_idx = match session.pipelines[..session.last_pipeline]
            .iter()
            .position(|p| p.pipeline == global.pipeline)
        {
            Some(idx) => idx,
            None => {
                if session.last_pipeline >= session.pipelines.len() {
                    return Err(FroError::OutOfBound(
                        session.last_pipeline as u64,
                        session.pipelines.len() as u64,
                    ));
                }
                let idx = session.last_pipeline;
                session.pipelines[idx].pipeline = global.pipeline;
                session.last_pipeline += 1;
                idx
            }
        };

        let port_idx = session.pipelines[pipeline_idx].buckets[bucket].assign(global.port)?;

        Ok(LocalIndex {
            session: session_idx,
            pipeline: pipeline_idx,
            port: port_idx,
        })
    }

    /// Read-side resolution: no assignment, `None` if any level is unseen.
    pub fn lookup(&self, global: &GlobalId, bucket: usize) -> Option<LocalIndex> {
        if bucket >= OPS_TYPE_MAX {
            return None;
        }
        let session_idx = self.sessions[..self.last_session]
            .iter()
            .position(|s| s.session == global.session)?;
        let session = &self.sessions[session_idx];
        let pipeline_idx = session.pipelines[..session.last_pipeline]
            .iter()
            .position(|p| p.pipeline == global.pipeline)?;
        let port_idx = session.pipelines[pipeline_idx].buckets[bucket].find(global.port)?;
        Some(LocalIndex {
            session: session_idx,
            pipeline: pipeline_idx,
            port: port_idx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maxima() -> DependencyTableMaxima {
        DependencyTableMaxima {
            max_session: 2,
            max_pipeline: 2,
            max_port: 3,
            max_sequence: 2,
        }
    }

    #[test]
    fn test_first_seen_assignment_is_dense() {
        let mut map = IdentifierMap::new(&maxima());
        // Global ids arrive out of order; local indices follow arrival order.
        let a = map.map(&GlobalId::new(7, 4, 9), 0).unwrap();
        let b = map.map(&GlobalId::new(7, 4, 2), 0).unwrap();
        let c = map.map(&GlobalId::new(3, 4, 9), 0).unwrap();
        assert_eq!(a, LocalIndex { session: 0, pipeline: 0, port: 0 });
        assert_eq!(b, LocalIndex { session: 0, pipeline: 0, port: 1 });
        assert_eq!(c, LocalIndex { session: 1, pipeline: 0, port: 0 });
    }

    #[test]
    fn test_repeat_mapping_is_stable() {
        let mut map = IdentifierMap::new(&maxima());
        let g = GlobalId::new(1, 1, 1);
        let first = map.map(&g, 1).unwrap();
        let second = map.map(&g, 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_buckets_are_independent() {
        let mut map = IdentifierMap::new(&maxima());
        let g = GlobalId::new(0, 0, 5);
        let in_cfg = map.map(&g, 1).unwrap();
        let out_cfg = map.map(&GlobalId::new(0, 0, 8), 2).unwrap();
        assert_eq!(in_cfg.port, 0);
        assert_eq!(out_cfg.port, 0);
    }

    #[test]
    fn test_bounds_enforced() {
        let mut map = IdentifierMap::new(&maxima());
        assert!(map.map(&GlobalId::new(0, 0, 0), 0).is_ok());
        assert!(map.map(&GlobalId::new(0, 0, 1), 0).is_ok());
        assert!(map.map(&GlobalId::new(0, 0, 2), 0).is_ok());
        // Fourth distinct port exceeds max_port = 3.
        assert!(map.map(&GlobalId::new(0, 0, 3), 0).is_err());
        // Third distinct session exceeds max_session = 2.
        assert!(map.map(&GlobalId::new(1, 0, 0), 0).is_ok());
        assert!(map.map(&GlobalId::new(2, 0, 0), 0).is_err());
    }

    #[test]
    fn test_lookup_does_not_assign() {
        let mut map = IdentifierMap::new(&maxima());
        let g = GlobalId::new(0, 0, 0);
        assert!(map.lookup(&g, 0).is_none());
        map.map(&g, 0).unwrap();
        assert_eq!(map.lookup(&g, 0), Some(LocalIndex { session: 0, pipeline: 0, port: 0 }));
        assert!(map.lookup(&GlobalId::new(0, 0, 1), 0).is_none());
    }
}
