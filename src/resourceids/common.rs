//! Resource IDs shared across services

use super::Segment;

resource_id! {
    /// `/subscriptions/{subscriptionId}`
    pub struct SubscriptionId("Subscription") {
        subscription_id,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
    ];
}

resource_id! {
    /// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
    pub struct ResourceGroupId("Resource Group") {
        subscription_id,
        resource_group_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
    ];
}

resource_id! {
    pub struct SubnetId("Subnet") {
        subscription_id,
        resource_group_name,
        virtual_network_name,
        subnet_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.Network"),
        Segment::fixed("virtualNetworks"),
        Segment::user("virtualNetworkName", "virtualNetworkValue"),
        Segment::fixed("subnets"),
        Segment::user("subnetName", "subnetValue"),
    ];
}

resource_id! {
    pub struct UserAssignedIdentityId("User Assigned Identity") {
        subscription_id,
        resource_group_name,
        user_assigned_identity_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.ManagedIdentity"),
        Segment::fixed("userAssignedIdentities"),
        Segment::user("userAssignedIdentityName", "userAssignedIdentityValue"),
    ];
}

resource_id! {
    pub struct StorageAccountId("Storage Account") {
        subscription_id,
        resource_group_name,
        storage_account_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.Storage"),
        Segment::fixed("storageAccounts"),
        Segment::user("storageAccountName", "storageAccountValue"),
    ];
}

resource_id! {
    pub struct LogicAppWorkflowId("Workflow") {
        subscription_id,
        resource_group_name,
        workflow_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.Logic"),
        Segment::fixed("workflows"),
        Segment::user("workflowName", "workflowValue"),
    ];
}

resource_id! {
    pub struct EventHubId("Eventhub") {
        subscription_id,
        resource_group_name,
        namespace_name,
        eventhub_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.EventHub"),
        Segment::fixed("namespaces"),
        Segment::user("namespaceName", "namespaceValue"),
        Segment::fixed("eventhubs"),
        Segment::user("eventhubName", "eventhubValue"),
    ];
}

resource_id! {
    pub struct LogAnalyticsWorkspaceId("Workspace") {
        subscription_id,
        resource_group_name,
        workspace_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.OperationalInsights"),
        Segment::fixed("workspaces"),
        Segment::user("workspaceName", "workspaceValue"),
    ];
}
