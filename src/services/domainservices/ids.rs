use crate::resourceids::{resource_id, Segment};

resource_id! {
    /// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.AAD/domainServices/{domainServiceName}`
    pub struct DomainServiceId("Domain Service") {
        subscription_id,
        resource_group_name,
        domain_service_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.AAD"),
        Segment::fixed("domainServices"),
        Segment::user("domainServiceName", "domainServiceValue"),
    ];
}

resource_id! {
    /// Replica sets are not ARM resources; the ID nests the API-assigned replica set ID under the domain service
    pub struct DomainServiceReplicaSetId("Domain Service Replica Set") {
        subscription_id,
        resource_group_name,
        domain_service_name,
        replica_set_id,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.AAD"),
        Segment::fixed("domainServices"),
        Segment::user("domainServiceName", "domainServiceValue"),
        Segment::fixed("replicaSets"),
        Segment::user("replicaSetId", "replicaSetIdValue"),
    ];
}

impl DomainServiceReplicaSetId {
    pub fn domain_service(&self) -> DomainServiceId {
        DomainServiceId::new(
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.domain_service_name.as_str(),
        )
    }
}

impl DomainServiceId {
    pub fn replica_set(&self, replica_set_id: &str) -> DomainServiceReplicaSetId {
        DomainServiceReplicaSetId::new(
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.domain_service_name.as_str(),
            replica_set_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::ResourceId;

    #[test]
    fn test_replica_set_id() {
        let service = DomainServiceId::new("sub", "rg", "example.com");
        let replica = service.replica_set("00000000-1111-2222-3333-444444444444");
        assert_eq!(
            replica.id(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AAD/domainServices/example.com/replicaSets/00000000-1111-2222-3333-444444444444"
        );
        assert_eq!(DomainServiceReplicaSetId::parse(&replica.id()).unwrap().domain_service(), service);
    }
}
