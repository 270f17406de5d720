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

//! Request life cycle states and the legality table gating transitions.

use log::{debug, error, info};

use crate::error::FroError;

/// Life cycle state of one request in the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestState {
    /// Constructed, nothing scheduled yet.
    #[default]
    Initialized = 0,
    /// All inputs for the upcoming stage are available.
    ReadyToExecute,
    /// The stage is being processed.
    Executing,
    /// Blocked on upstream inputs.
    InputResourcePending,
    /// Inputs still pending but the stage has been handed to the scheduler.
    InputResourcePendingScheduled,
    /// Outputs produced, awaiting downstream consumption.
    OutputResourcePending,
    /// Outputs produced with errors, awaiting downstream consumption.
    OutputErrorResourcePending,
    /// Output buffers consumed, awaiting result notification.
    OutputNotificationPending,
    /// Error notification pending; acts as the error funnel.
    OutputErrorNotificationPending,
    /// All outputs notified and released.
    Complete,
    /// Sentinel; not a real state.
    InvalidMax,
}

pub const NUM_STATES: usize = 11;

const INIT: usize = RequestState::Initialized as usize;
const RTE: usize = RequestState::ReadyToExecute as usize;
const EXE: usize = RequestState::Executing as usize;
const IRP: usize = RequestState::InputResourcePending as usize;
const IRPS: usize = RequestState::InputResourcePendingScheduled as usize;
const ORP: usize = RequestState::OutputResourcePending as usize;
const OERP: usize = RequestState::OutputErrorResourcePending as usize;
const ONP: usize = RequestState::OutputNotificationPending as usize;
const OENP: usize = RequestState::OutputErrorNotificationPending as usize;
const COM: usize = RequestState::Complete as usize;
const MAX: usize = RequestState::InvalidMax as usize;

/// Legal transitions, indexed `[from][to]`. The error funnel
/// `OutputErrorNotificationPending` is reachable from every state and can
/// re-enter almost any state for retry; `OutputErrorResourcePending` is
/// only entered from the resource-pending states.
const TRANSITION_TABLE: [[bool; NUM_STATES]; NUM_STATES] = build_table();

const fn build_table() -> [[bool; NUM_STATES]; NUM_STATES] {
    let mut t = [[false; NUM_STATES]; NUM_STATES];

    t[INIT][RTE] = true;
    t[INIT][OENP] = true;
    t[INIT][MAX] = true;

    t[RTE][EXE] = true;
    t[RTE][OENP] = true;
    t[RTE][MAX] = true;

    t[EXE][RTE] = true;
    t[EXE][IRP] = true;
    t[EXE][ORP] = true;
    t[EXE][ONP] = true;
    t[EXE][OENP] = true;
    t[EXE][MAX] = true;

    t[IRP][IRPS] = true;
    t[IRP][OENP] = true;
    t[IRP][MAX] = true;

    t[IRPS][RTE] = true;
    t[IRPS][OERP] = true;
    t[IRPS][OENP] = true;
    t[IRPS][MAX] = true;

    t[ORP][OERP] = true;
    t[ORP][ONP] = true;
    t[ORP][OENP] = true;
    t[ORP][MAX] = true;

    t[OERP][ONP] = true;
    t[OERP][OENP] = true;
    t[OERP][MAX] = true;

    t[ONP][EXE] = true;
    t[ONP][OENP] = true;
    t[ONP][COM] = true;
    t[ONP][MAX] = true;

    let mut to = 0;
    while to < NUM_STATES {
        if to != OERP {
            t[OENP][to] = true;
            t[MAX][to] = true;
        }
        to += 1;
    }

    t[COM][OENP] = true;
    t[COM][MAX] = true;

    t
}

impl RequestState {
    pub fn is_transition_valid(self, to: RequestState) -> bool {
        TRANSITION_TABLE[self as usize][to as usize]
    }
}

/// Applies a checked transition to `state`, leaving it untouched when the
/// table forbids the move. Rejections out of `Complete` are expected late
/// notifications and log softer than other rejections.
pub fn transition(state: &mut RequestState, to: RequestState, who: &str) -> Result<(), FroError> {
    let from = *state;
    if from.is_transition_valid(to) {
        debug!("{}: state {:?} -> {:?}", who, from, to);
        *state = to;
        Ok(())
    } else {
        if from == RequestState::Complete {
            info!("{}: ignoring state change {:?} -> {:?} on completed request", who, from, to);
        } else {
            error!("{}: invalid state change {:?} -> {:?}", who, from, to);
        }
        Err(FroError::InvalidState(
            format!("transition to {:?}", to),
            format!("{:?}", from),
        ))
    }
}
