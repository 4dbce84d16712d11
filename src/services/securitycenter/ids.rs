use crate::resourceids::{resource_id, Segment};

resource_id! {
    /// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Security/automations/{automationName}`
    pub struct AutomationId("Automation") {
        subscription_id,
        resource_group_name,
        automation_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.Security"),
        Segment::fixed("automations"),
        Segment::user("automationName", "automationValue"),
    ];
}
