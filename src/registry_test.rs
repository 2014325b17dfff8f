#[cfg(test)]
mod tests {
    use crate::kinds::{ConfigMap, Deployment, Namespace, Pod};
    use crate::model::Kind;
    use crate::registry::*;
    use crate::Error;

    struct Nameless;

    impl Kind for Nameless {
        const KIND: &'static str = "Nameless";
        const RESOURCE: &'static str = "";
    }

    struct Versionless;

    impl Kind for Versionless {
        const KIND: &'static str = "Versionless";
        const API_VERSION: &'static str = "";
        const RESOURCE: &'static str = "versionless";
    }

    struct Widget;

    impl Kind for Widget {
        const KIND: &'static str = "Widget";
        const API_VERSION: &'static str = "example.com/v1";
        const RESOURCE: &'static str = "widgets";
    }

    #[test]
    fn test_default_registry_holds_builtin_kinds() {
        let registry = RepositoryRegistry::new();

        assert_eq!(registry.len(), 30);
        assert!(registry.get("pods").unwrap().is_for::<Pod>());
        assert!(registry.get("configMaps").unwrap().is_for::<ConfigMap>());
        assert!(registry.get("deployments").unwrap().is_for::<Deployment>());
        assert!(!registry.get("namespaces").unwrap().is_namespaced());
        assert!(registry.get("namespaces").unwrap().is_for::<Namespace>());
        assert_eq!(registry.get("deployments").unwrap().api_version(), "apps/v1");
    }

    #[test]
    fn test_default_entries_are_valid() {
        let registry = RepositoryRegistry::new();
        for name in registry.names() {
            registry.get(name).unwrap().validate().unwrap();
        }
    }

    #[test]
    fn test_insert_new_entry_increments_count() {
        let mut registry = RepositoryRegistry::new();
        let before = registry.len();

        let replaced = registry.insert("widgets", RepositoryEntry::of::<Widget>()).unwrap();

        assert!(replaced.is_none());
        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.get("widgets").unwrap().resource(), "widgets");
    }

    #[test]
    fn test_insert_overrides_existing_entry() {
        let mut registry = RepositoryRegistry::new();
        let before = registry.len();

        let replaced = registry
            .insert("pods", RepositoryEntry::of::<Widget>())
            .unwrap()
            .unwrap();

        assert!(replaced.is_for::<Pod>());
        assert_eq!(registry.len(), before);
        assert!(registry.get("pods").unwrap().is_for::<Widget>());
    }

    #[test]
    fn test_remove_decrements_count() {
        let mut registry = RepositoryRegistry::new();
        let before = registry.len();

        assert!(registry.remove("pods").is_some());
        assert!(registry.remove("pods").is_none());
        assert_eq!(registry.len(), before - 1);
        assert!(!registry.contains("pods"));
    }

    #[test]
    fn test_rejects_entry_without_resource() {
        let mut registry = RepositoryRegistry::empty();
        let err = registry
            .insert("nameless", RepositoryEntry::of::<Nameless>())
            .unwrap_err();

        assert!(matches!(err, Error::Logic(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rejects_entry_without_api_version() {
        let mut registry = RepositoryRegistry::empty();
        let err = registry
            .insert("versionless", RepositoryEntry::of::<Versionless>())
            .unwrap_err();
        assert!(matches!(err, Error::Logic(_)));
    }

    #[test]
    fn test_rejects_resource_with_path_separator() {
        let mut registry = RepositoryRegistry::empty();
        let entry = RepositoryEntry::of::<Widget>().with_resource("widgets/status");
        assert!(matches!(
            registry.insert("widgets", entry).unwrap_err(),
            Error::Logic(_)
        ));
    }

    #[test]
    fn test_rejects_blank_name() {
        let mut registry = RepositoryRegistry::empty();
        assert!(registry.insert("  ", RepositoryEntry::of::<Widget>()).is_err());
    }

    #[test]
    fn test_entry_overrides_location() {
        let entry = RepositoryEntry::of::<Widget>()
            .with_resource("gadgets")
            .with_namespaced(false);

        assert_eq!(entry.resource(), "gadgets");
        assert!(!entry.is_namespaced());
        assert_eq!(entry.kind(), "Widget");
    }
}
