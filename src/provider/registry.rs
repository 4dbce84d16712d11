//! Service Registry
//!
//! Collects every service's resources, data sources and ID templates once
//! and provides lookup functions for the servers.

use super::{DataSource, Resource};
use crate::resourceids::{self, IdTemplate};
use std::sync::{Arc, OnceLock};

/// What one Azure service contributes to the provider
pub struct ServiceRegistration {
    pub name: &'static str,
    pub resources: Vec<Arc<dyn Resource>>,
    pub data_sources: Vec<Arc<dyn DataSource>>,
    /// Typed ID templates, used to normalise arbitrary IDs
    pub id_templates: Vec<IdTemplate>,
}

/// Global registry built on first access
static REGISTRY: OnceLock<Vec<ServiceRegistration>> = OnceLock::new();

pub fn registrations() -> &'static [ServiceRegistration] {
    REGISTRY.get_or_init(crate::services::registrations)
}

/// Every known ID template, shared IDs included
pub fn id_templates() -> Vec<IdTemplate> {
    let mut templates = vec![
        IdTemplate::of::<resourceids::SubscriptionId>(),
        IdTemplate::of::<resourceids::ResourceGroupId>(),
        IdTemplate::of::<resourceids::SubnetId>(),
        IdTemplate::of::<resourceids::UserAssignedIdentityId>(),
        IdTemplate::of::<resourceids::StorageAccountId>(),
        IdTemplate::of::<resourceids::LogicAppWorkflowId>(),
        IdTemplate::of::<resourceids::EventHubId>(),
        IdTemplate::of::<resourceids::LogAnalyticsWorkspaceId>(),
    ];
    for registration in registrations() {
        templates.extend(registration.id_templates.iter().copied());
    }
    templates
}

/// Get all resource type names
pub fn resource_type_names() -> Vec<&'static str> {
    registrations()
        .iter()
        .flat_map(|r| r.resources.iter().map(|res| res.type_name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_loads_successfully() {
        assert!(!registrations().is_empty(), "Registry should have services");
    }

    #[test]
    fn test_type_names_are_unique() {
        let names = resource_type_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.contains(&"azurerm_analysis_services_server"));
    }

    #[test]
    fn test_id_templates_include_service_ids() {
        let templates = id_templates();
        assert!(templates.iter().any(|t| t.id_type == "Resource Group"));
        assert!(templates.iter().any(|t| t.id_type == "Server"));
    }
}
