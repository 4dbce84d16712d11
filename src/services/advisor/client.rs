//! Advisor recommendations API (`2023-01-01`)

use crate::azure::{ArmClient, ArmError};
use crate::resourceids::{ResourceId, SubscriptionId};
use serde::Deserialize;

pub const API_VERSION: &str = "2023-01-01";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortDescription {
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationProperties {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub impacted_field: Option<String>,
    #[serde(default)]
    pub impacted_value: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub recommendation_type_id: Option<String>,
    #[serde(default)]
    pub short_description: Option<ShortDescription>,
    #[serde(default)]
    pub suppression_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<RecommendationProperties>,
}

pub struct RecommendationsClient<'a> {
    client: &'a ArmClient,
}

impl<'a> RecommendationsClient<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    /// Every recommendation in the subscription matching the OData `filter`
    pub async fn list(&self, subscription: &SubscriptionId, filter: Option<&str>) -> Result<Vec<Recommendation>, ArmError> {
        let path = format!("{}/providers/Microsoft.Advisor/recommendations", subscription.id());
        let query: Vec<(&str, &str)> = filter.map(|f| ("$filter", f)).into_iter().collect();
        self.client.list(&path, API_VERSION, &query).await
    }
}
