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

//! The usecase-level request a feature request object serves. The engine
//! only needs a narrow view of it, so the owner implements this trait and
//! hands the object in behind an `Arc`.

use std::any::Any;
use std::sync::Arc;

use crate::types::FeatureId;

/// Opaque payload exchanged between features through the usecase request.
pub type InterFeatureData = Arc<dyn Any + Send + Sync>;

pub trait UsecaseRequest: Send + Sync {
    /// Frame number the application attached to this request.
    fn app_frame_number(&self) -> u64;

    /// Application capture settings, if any were attached.
    fn app_settings(&self) -> Option<crate::types::MetadataHandle>;

    /// Stash a payload other features of the same usecase can pick up.
    fn set_inter_feature_private_data(
        &self,
        feature_id: FeatureId,
        camera_id: u32,
        key: u64,
        data: InterFeatureData,
    );

    fn get_inter_feature_private_data(
        &self,
        feature_id: FeatureId,
        camera_id: u32,
        key: u64,
    ) -> Option<InterFeatureData>;

    fn remove_inter_feature_private_data(&self, feature_id: FeatureId, camera_id: u32, key: u64);
}
