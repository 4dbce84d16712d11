use crate::resourceids::{resource_id, Segment};

resource_id! {
    /// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.KeyVault/managedHSMs/{managedHSMName}`
    pub struct ManagedHsmId("Managed HSM") {
        subscription_id,
        resource_group_name,
        managed_hsm_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.KeyVault"),
        Segment::fixed("managedHSMs"),
        Segment::user("managedHSMName", "managedHSMValue"),
    ];
}

resource_id! {
    /// A soft-deleted HSM, addressed by location rather than resource group
    pub struct DeletedManagedHsmId("Deleted Managed HSM") {
        subscription_id,
        location_name,
        deleted_managed_hsm_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.KeyVault"),
        Segment::fixed("locations"),
        Segment::user("locationName", "locationValue"),
        Segment::fixed("deletedManagedHSMs"),
        Segment::user("deletedManagedHSMName", "deletedManagedHSMValue"),
    ];
}

impl ManagedHsmId {
    pub fn deleted(&self, location: &str) -> DeletedManagedHsmId {
        DeletedManagedHsmId::new(self.subscription_id.as_str(), location, self.managed_hsm_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::ResourceId;

    #[test]
    fn test_deleted_id() {
        let id = ManagedHsmId::new("sub", "rg", "hsm1");
        assert_eq!(
            id.deleted("westeurope").id(),
            "/subscriptions/sub/providers/Microsoft.KeyVault/locations/westeurope/deletedManagedHSMs/hsm1"
        );
    }
}
