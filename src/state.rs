// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::service::PhiService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PhiService>,
}

impl AppState {
    pub fn new(service: PhiService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
