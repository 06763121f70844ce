// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Template registry.
//!
//! Maps each workflow type to its template. Built once at startup and shared
//! read-only (behind an `Arc`) by every worker.

use std::collections::HashMap;

use swiffer_protocol::WorkflowType;
use tracing::info;

use crate::error::ConfigError;
use crate::template::WorkflowTemplate;

/// Immutable workflow type → template table.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<WorkflowType, WorkflowTemplate>,
}

impl TemplateRegistry {
    /// Build a registry. Fails when two templates declare the same workflow type.
    pub fn new(templates: impl IntoIterator<Item = WorkflowTemplate>) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();
        for template in templates {
            let workflow_type = template.workflow_type().clone();
            if map.contains_key(&workflow_type) {
                return Err(ConfigError::DuplicateWorkflowType(workflow_type));
            }
            info!(workflow_type = %workflow_type, "Registered workflow template");
            map.insert(workflow_type, template);
        }
        Ok(Self { templates: map })
    }

    /// The template registered for a workflow type.
    pub fn resolve(&self, workflow_type: &WorkflowType) -> Option<&WorkflowTemplate> {
        self.templates.get(workflow_type)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Registered workflow types, sorted.
    pub fn workflow_types(&self) -> Vec<&WorkflowType> {
        let mut types: Vec<_> = self.templates.keys().collect();
        types.sort();
        types
    }
}
