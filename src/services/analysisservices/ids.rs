use crate::resourceids::{resource_id, Segment};

resource_id! {
    /// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.AnalysisServices/servers/{serverName}`
    pub struct ServerId("Server") {
        subscription_id,
        resource_group_name,
        server_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.AnalysisServices"),
        Segment::fixed("servers"),
        Segment::user("serverName", "serverValue"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::ResourceId;

    #[test]
    fn test_server_id() {
        let input = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AnalysisServices/servers/srv";
        let id = ServerId::parse(input).unwrap();
        assert_eq!(id, ServerId::new("sub", "rg", "srv"));
        assert_eq!(id.id(), input);

        assert!(ServerId::parse(&input.to_lowercase()).is_err());
        assert_eq!(ServerId::parse_insensitively(&input.to_uppercase()).unwrap().server_name, "SRV");
    }
}
