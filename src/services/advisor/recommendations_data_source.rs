use super::client::{Recommendation, RecommendationsClient};
use crate::provider::{DataSource, ProviderContext};
use crate::resourceids::SubscriptionId;
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const CATEGORIES: &[&str] = &[
    "HighAvailability",
    "Security",
    "Performance",
    "Cost",
    "OperationalExcellence",
];

pub struct AdvisorRecommendationsDataSource;

/// OData filter: categories OR-ed, resource groups OR-ed, the two groups AND-ed.
/// Each group is parenthesised since `and` binds tighter than `or`.
pub fn build_filter(categories: &[String], resource_groups: &[String]) -> Option<String> {
    let mut clauses = Vec::new();

    if !categories.is_empty() {
        let terms: Vec<String> = categories.iter().map(|c| format!("Category eq '{c}'")).collect();
        clauses.push(format!("({})", terms.join(" or ")));
    }

    if !resource_groups.is_empty() {
        let terms: Vec<String> = resource_groups
            .iter()
            .map(|g| format!("ResourceGroup eq '{g}'"))
            .collect();
        clauses.push(format!("({})", terms.join(" or ")));
    }

    (!clauses.is_empty()).then(|| clauses.join(" and "))
}

fn flatten_recommendation(recommendation: &Recommendation) -> Value {
    let properties = recommendation.properties.clone().unwrap_or_default();
    let description = properties
        .short_description
        .and_then(|d| d.problem)
        .unwrap_or_default();

    json!({
        "category": properties.category.unwrap_or_default(),
        "description": description,
        "impact": properties.impact.unwrap_or_default(),
        "recommendation_name": recommendation.name.clone().unwrap_or_default(),
        "recommendation_type_id": properties.recommendation_type_id.unwrap_or_default(),
        "resource_name": properties.impacted_value.unwrap_or_default(),
        "resource_type": properties.impacted_field.unwrap_or_default(),
        "suppression_names": properties.suppression_ids,
        "updated_time": properties.last_updated.unwrap_or_default(),
    })
}

#[async_trait]
impl DataSource for AdvisorRecommendationsDataSource {
    fn type_name(&self) -> &'static str {
        "azurerm_advisor_recommendations"
    }

    fn schema(&self) -> Schema {
        let computed = || Attribute::computed(ValueType::String);

        Schema::new()
            .attr(
                "filter_by_category",
                Attribute::optional(ValueType::Set)
                    .elem_type(ValueType::String)
                    .validate(validation::each(validation::string_in_slice(CATEGORIES, true))),
            )
            .attr(
                "filter_by_resource_groups",
                Attribute::optional(ValueType::Set)
                    .elem_type(ValueType::String)
                    .validate(validation::each(validation::string_is_not_empty())),
            )
            .attr(
                "recommendations",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr("category", computed())
                        .attr("description", computed())
                        .attr("impact", computed())
                        .attr("recommendation_name", computed())
                        .attr("recommendation_type_id", computed())
                        .attr("resource_name", computed())
                        .attr("resource_type", computed())
                        .attr(
                            "suppression_names",
                            Attribute::computed(ValueType::Set).elem_type(ValueType::String),
                        )
                        .attr("updated_time", computed()),
                ),
            )
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = RecommendationsClient::new(&ctx.client);
        let subscription = SubscriptionId::new(ctx.subscription_id());

        let filter = build_filter(
            &data.get_string_list("filter_by_category"),
            &data.get_string_list("filter_by_resource_groups"),
        );
        tracing::debug!("Listing Advisor recommendations with filter {:?}", filter);

        let recommendations = client
            .list(&subscription, filter.as_deref())
            .await
            .with_context(|| format!("retrieving Advisor Recommendations for {subscription}"))?;

        let flattened: Vec<Value> = recommendations.iter().map(flatten_recommendation).collect();
        data.set("recommendations", flattened)?;
        data.set_id(format!(
            "advisor/recommendations/{}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.fZ")
        ));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_filter() {
        assert_eq!(build_filter(&[], &[]), None);
        assert_eq!(
            build_filter(&strings(&["Cost", "Security"]), &[]).as_deref(),
            Some("(Category eq 'Cost' or Category eq 'Security')")
        );
        assert_eq!(
            build_filter(&strings(&["Cost"]), &strings(&["rg1", "rg2"])).as_deref(),
            Some("(Category eq 'Cost') and (ResourceGroup eq 'rg1' or ResourceGroup eq 'rg2')")
        );
        assert_eq!(
            build_filter(&strings(&["Cost", "Security"]), &strings(&["rg1"])).as_deref(),
            Some("(Category eq 'Cost' or Category eq 'Security') and (ResourceGroup eq 'rg1')")
        );
    }

    #[test]
    fn test_flatten_recommendation() {
        let recommendation: Recommendation = serde_json::from_value(json!({
            "name": "rec1",
            "properties": {
                "category": "Cost",
                "impact": "High",
                "impactedField": "Microsoft.Compute/virtualMachines",
                "impactedValue": "vm1",
                "shortDescription": { "problem": "Right-size underutilized VMs" },
                "suppressionIds": ["00000000-0000-0000-0000-000000000000"]
            }
        }))
        .unwrap();

        let flat = flatten_recommendation(&recommendation);
        assert_eq!(flat["recommendation_name"], json!("rec1"));
        assert_eq!(flat["description"], json!("Right-size underutilized VMs"));
        assert_eq!(flat["resource_type"], json!("Microsoft.Compute/virtualMachines"));
        assert_eq!(flat["updated_time"], json!(""));
    }
}
