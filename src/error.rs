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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FroError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Operation {0} not allowed in state {1}")]
    InvalidState(String, String),
    #[error("Index :{0} out of bound :{1}")]
    OutOfBound(u64, u64),
    #[error("No such entry: {0}")]
    NoSuch(String),
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),
    #[error("Failed to allocate {0}")]
    NoMemory(String),
    #[error("Wait on result timed out after {0} ms")]
    WaitTimeout(u128),
}
