//! Property-based tests for decoding polymorphic automation actions

use azurerm_provider::services::securitycenter::client::{AutomationAction, LogicAppAction};
use proptest::prelude::*;
use serde_json::{json, Value};

/// `word` with each ASCII letter's case picked by `mask`
fn recase(word: &str, mask: &[bool]) -> String {
    word.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
        .collect()
}

proptest! {
    #[test]
    fn test_discriminator_matches_any_casing(mask in prop::collection::vec(any::<bool>(), 1..8), id in "[a-z0-9]{1,12}") {
        let raw = json!({ "actionType": recase("logicapp", &mask), "logicAppResourceId": id, "uri": "https://example.com" });

        let action: AutomationAction = serde_json::from_value(raw).unwrap();
        prop_assert_eq!(
            &action,
            &AutomationAction::LogicApp(LogicAppAction {
                logic_app_resource_id: Some(id.clone()),
                uri: Some("https://example.com".to_string()),
            })
        );

        // encoding always writes the canonical discriminator
        let encoded = serde_json::to_value(&action).unwrap();
        prop_assert_eq!(&encoded["actionType"], &json!("LogicApp"));
    }

    #[test]
    fn test_unknown_kinds_round_trip(
        kind in "[A-Za-z]{1,16}".prop_filter("known action type", |k| {
            !["logicapp", "eventhub", "workspace"].contains(&k.to_ascii_lowercase().as_str())
        }),
        fields in prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 0..4),
    ) {
        let mut raw = serde_json::Map::new();
        for (key, value) in fields {
            raw.insert(key, Value::String(value));
        }
        raw.insert("actionType".to_string(), Value::String(kind.clone()));
        let raw = Value::Object(raw);

        let action: AutomationAction = serde_json::from_value(raw.clone()).unwrap();
        prop_assert_eq!(action.action_type(), Some(kind.as_str()));
        prop_assert_eq!(serde_json::to_value(&action).unwrap(), raw);
    }
}

#[test]
fn test_missing_discriminator_is_kept_verbatim() {
    let raw = json!({ "channel": "sec" });
    let action: AutomationAction = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(action, AutomationAction::Unknown(raw.clone()));
    assert_eq!(action.action_type(), None);
    assert_eq!(serde_json::to_value(&action).unwrap(), raw);
}
