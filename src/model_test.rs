#[cfg(test)]
mod tests {
    use crate::kinds::{ConfigMap, Deployment, Endpoint, Pod};
    use crate::model::*;
    use crate::Error;
    use k8s_openapi::api::core::v1::ConfigMap as ConfigMapResource;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn attributes(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("not a map: {}", other),
        }
    }

    #[test]
    fn test_attributes_round_trip_without_injected_fields() {
        let input = attributes(json!({"metadata": {"name": "web"}, "spec": {"containers": []}}));
        let pod: Model<Pod> = Model::new(input.clone());

        assert_eq!(pod.attributes(), &input);
        assert!(!pod.attributes().contains_key("kind"));
        assert!(!pod.attributes().contains_key("apiVersion"));
    }

    #[test]
    fn test_from_json_and_yaml() {
        let from_json: Model<Pod> = Model::from_json(r#"{"metadata": {"name": "web"}}"#).unwrap();
        let from_yaml: Model<Pod> = Model::from_yaml("metadata:\n  name: web\n").unwrap();

        assert_eq!(from_json, from_yaml);
        assert_eq!(from_yaml.name(), Some("web"));
    }

    #[test]
    fn test_malformed_input_is_parse_error() {
        let err = Model::<Pod>::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.starts_with("Failed to parse JSON")));
        assert!(err.is_configuration());

        let err = Model::<Pod>::from_yaml("a: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.starts_with("Failed to parse YAML")));

        assert!(matches!(
            Model::<Pod>::from_value(json!("scalar")).unwrap_err(),
            Error::Parse(_)
        ));
    }

    #[test]
    fn test_null_and_empty_list_are_empty_models() {
        assert!(Model::<Pod>::from_value(Value::Null).unwrap().attributes().is_empty());
        assert!(Model::<Pod>::from_value(json!([])).unwrap().attributes().is_empty());
    }

    #[test]
    fn test_metadata_is_defensive() {
        let pod: Model<Pod> = Model::from_value(json!({
            "metadata": {"name": "web", "generation": 3, "namespace": ""}
        }))
        .unwrap();

        assert_eq!(pod.metadata("name"), Some("web"));
        assert_eq!(pod.metadata("generation"), None);
        assert_eq!(pod.metadata("namespace"), None);
        assert_eq!(pod.metadata("missing"), None);

        let broken: Model<Pod> = Model::from_value(json!({"metadata": "oops"})).unwrap();
        assert_eq!(broken.name(), None);
    }

    #[test]
    fn test_schema_injects_kind_and_api_version_first() {
        let deployment: Model<Deployment> =
            Model::from_value(json!({"metadata": {"name": "web"}})).unwrap();

        let schema = deployment.schema_value();
        let keys: Vec<_> = schema.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["kind", "apiVersion", "metadata"]);
        assert_eq!(schema["kind"], "Deployment");
        assert_eq!(schema["apiVersion"], "apps/v1");

        let text = deployment.schema().unwrap();
        assert!(text.starts_with("{\n  \"kind\": \"Deployment\""));
    }

    #[test]
    fn test_plural_kind() {
        let endpoints: Model<Endpoint> = Model::default();
        assert_eq!(endpoints.schema_value()["kind"], "Endpoints");
        assert_eq!(Endpoint::kind_name(), "Endpoints");
    }

    #[test]
    fn test_core_kinds_have_no_api_version_override() {
        assert_eq!(Pod::api_version_override(), None);
        assert_eq!(Deployment::api_version_override(), Some("apps/v1"));
        assert_eq!(Model::<Pod>::api_version(), DEFAULT_API_VERSION);
    }

    #[test]
    fn test_schema_normalizes_empty_arrays_in_metadata_and_spec() {
        let pod: Model<Pod> = Model::from_value(json!({
            "metadata": {"labels": [], "annotations": {"nested": []}},
            "spec": [],
            "status": {"conditions": []},
            "data": []
        }))
        .unwrap();

        let schema = pod.schema_value();
        assert_eq!(schema["metadata"]["labels"], json!({}));
        assert_eq!(schema["metadata"]["annotations"]["nested"], json!({}));
        assert_eq!(schema["spec"], json!({}));
        assert_eq!(schema["status"]["conditions"], json!([]));
        assert_eq!(schema["data"], json!([]));
        assert_eq!(pod.attributes()["metadata"]["labels"], json!([]));
    }

    #[test]
    fn test_schema_keeps_non_empty_lists() {
        let pod: Model<Pod> = Model::from_value(json!({
            "spec": {"containers": [{"name": "app", "ports": []}]}
        }))
        .unwrap();

        let schema = pod.schema_value();
        assert_eq!(schema["spec"]["containers"][0]["name"], "app");
        assert_eq!(schema["spec"]["containers"][0]["ports"], json!({}));
    }

    #[test]
    fn test_update_model_is_copy_on_write() {
        let original: Model<Pod> = Model::from_value(json!({"metadata": {"name": "web"}})).unwrap();
        let before = original.attributes().clone();

        let updated = original.update_model(|mut attributes| {
            attributes.insert("spec".to_string(), json!({"replicas": 2}));
            attributes
        });

        assert_eq!(original.attributes(), &before);
        assert_ne!(updated.attributes(), original.attributes());
        assert_eq!(updated.attributes()["spec"]["replicas"], 2);
    }

    #[test]
    fn test_explorer_edits_a_copy() {
        let pod: Model<Pod> = Model::from_value(json!({"metadata": {"name": "test"}})).unwrap();
        let before = pod.attributes().clone();

        let mut explorer = pod.explore();
        {
            let mut metadata = explorer.enter("metadata").unwrap();
            metadata.set("name", "test2");
            metadata.set("namespace", "shop");
        }

        assert_eq!(pod.attributes(), &before);
        assert_eq!(pod.name(), Some("test"));
        assert_eq!(explorer.model().name(), Some("test2"));
        assert_eq!(explorer.into_model().metadata("namespace"), Some("shop"));
    }

    #[test]
    fn test_explorer_null_removes_key() {
        let pod: Model<Pod> = Model::from_value(json!({"metadata": {"name": "web"}})).unwrap();
        let mut explorer = pod.explore();

        explorer.enter("metadata").unwrap().set("name", Value::Null);

        let edited = explorer.into_model();
        assert!(!edited.attributes()["metadata"].as_object().unwrap().contains_key("name"));
        assert_eq!(pod.name(), Some("web"));
    }

    #[test]
    fn test_explorer_paths() {
        let pod: Model<Pod> = Model::default();
        let mut explorer = pod.explore();

        explorer.set_path(&["metadata", "labels", "app"], "web").unwrap();
        assert_eq!(explorer.get_path(&["metadata", "labels", "app"]), Some(&json!("web")));
        assert!(explorer.contains("metadata"));
        assert!(explorer.enter("missing").is_none());

        explorer.set_path(&["metadata", "labels", "app"], Value::Null).unwrap();
        assert_eq!(explorer.get_path(&["metadata", "labels", "app"]), None);
        assert_eq!(explorer.delete_path(&["metadata", "labels"]), Some(json!({})));

        assert!(matches!(
            explorer.set_path(&[], "x").unwrap_err(),
            Error::InvalidRequest(_)
        ));
        assert!(pod.attributes().is_empty());
    }

    #[test]
    fn test_explorer_set_path_replaces_scalars() {
        let pod: Model<Pod> = Model::from_value(json!({"spec": "scalar"})).unwrap();
        let mut explorer = pod.explore();
        explorer.set_path(&["spec", "replicas"], 3).unwrap();

        assert_eq!(explorer.model().attributes()["spec"], json!({"replicas": 3}));
        assert_eq!(pod.attributes()["spec"], "scalar");
    }

    #[test]
    fn test_typed_resource_conversions() {
        let mut resource = ConfigMapResource::default();
        resource.metadata.name = Some("settings".to_string());
        resource.data = Some([("mode".to_string(), "fast".to_string())].into());

        let model: Model<ConfigMap> = Model::from_resource(&resource).unwrap();
        assert_eq!(model.name(), Some("settings"));
        assert_eq!(model.attributes()["data"]["mode"], "fast");

        let back: ConfigMapResource = model.to_resource().unwrap();
        assert_eq!(back, resource);
        assert_eq!(model.object_meta().unwrap().name.as_deref(), Some("settings"));
    }

    #[test]
    fn test_into_model_promotions() {
        let from_value: Model<Pod> = json!({"metadata": {"name": "a"}}).into_model().unwrap();
        let from_map: Model<Pod> = attributes(json!({"metadata": {"name": "a"}})).into_model().unwrap();
        assert_eq!(from_value, from_map);
        assert!(IntoModel::<Pod>::into_model(json!(1)).is_err());
    }

    fn arb_tree() -> impl Strategy<Value = Value> {
        let leaf = "[a-z0-9 ]{0,8}".prop_map(Value::String);
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop::collection::btree_map("[a-zA-Z]{1,6}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect()))
        })
    }

    fn arb_attributes() -> impl Strategy<Value = Attributes> {
        prop::collection::btree_map("[a-zA-Z]{1,6}", arb_tree(), 0..6)
            .prop_map(|map| map.into_iter().collect())
    }

    proptest! {
        #[test]
        fn test_reconstruction_round_trips(input in arb_attributes()) {
            let model: Model<Pod> = Model::new(input.clone());
            let rebuilt: Model<Pod> = Model::new(model.attributes().clone());
            prop_assert_eq!(rebuilt.attributes(), &input);
            prop_assert_eq!(Model::<Pod>::from_value(model.to_value()).unwrap().into_attributes(), input);
        }

        #[test]
        fn test_update_model_leaves_original(input in arb_attributes(), key in "[A-Z]{3}") {
            let model: Model<Pod> = Model::new(input.clone());
            let updated = model.update_model(|mut attributes| {
                attributes.insert(key.clone(), Value::String("CHANGED".to_string()));
                attributes
            });
            prop_assert_eq!(model.attributes(), &input);
            prop_assert_ne!(updated.attributes(), model.attributes());
        }
    }
}
