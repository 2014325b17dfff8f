#[cfg(test)]
mod tests {
    use crate::client::{ApiRequest, ClientBuilder};
    use crate::kubeconfig::*;
    use crate::materialize::TempDirMaterializer;
    use crate::test_support::RecordingTransport;
    use crate::{ClientOptions, Error};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::json;
    use std::fs;

    fn kubeconfig(server: &str, cluster_extra: &str, user_extra: &str) -> String {
        format!(
            r#"
apiVersion: v1
kind: Config
current-context: dev
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
      namespace: shop
clusters:
  - name: dev-cluster
    cluster:
      server: {server}
{cluster_extra}
users:
  - name: dev-user
    user:
      token: abc
{user_extra}
"#
        )
    }

    fn options_of(content: &str) -> crate::Result<ClientOptions> {
        let dir = tempfile::tempdir().unwrap();
        let materializer = TempDirMaterializer::new(dir.path()).unwrap();
        Kubeconfig::parse(content, KubeconfigFormat::Yaml)?.client_options(&materializer)
    }

    fn message(err: Error) -> String {
        match err {
            Error::Configuration(message) => message,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_resolves_current_context() {
        let options = options_of(&kubeconfig("http://localhost:8080", "", "")).unwrap();

        assert_eq!(options.master.as_deref(), Some("http://localhost:8080"));
        assert_eq!(options.namespace.as_deref(), Some("shop"));
        assert_eq!(options.token.as_deref(), Some("abc"));
        assert_eq!(options.verify, None);
        assert_eq!(options.ca_cert, None);
    }

    #[test]
    fn test_https_without_ca_disables_verification() {
        let options = options_of(&kubeconfig("https://k8s.example.com", "", "")).unwrap();
        assert_eq!(options.verify, Some(false));
    }

    #[test]
    fn test_certificate_data_is_materialized() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = TempDirMaterializer::new(dir.path()).unwrap();
        let content = kubeconfig(
            "https://k8s.example.com",
            &format!("      certificate-authority-data: {}", STANDARD.encode("CA PEM")),
            &format!(
                "      client-certificate-data: {}\n      client-key-data: {}",
                STANDARD.encode("CERT PEM"),
                STANDARD.encode("KEY PEM")
            ),
        );

        let options = Kubeconfig::parse(&content, KubeconfigFormat::Yaml)
            .unwrap()
            .client_options(&materializer)
            .unwrap();

        assert_eq!(options.verify, None);
        let ca = options.ca_cert.unwrap();
        assert!(ca.contains("kubernetes-client-ca-cert.pem-"));
        assert_eq!(fs::read_to_string(&ca).unwrap(), "CA PEM");
        assert_eq!(fs::read_to_string(options.client_cert.unwrap()).unwrap(), "CERT PEM");
        assert_eq!(fs::read_to_string(options.client_key.unwrap()).unwrap(), "KEY PEM");
    }

    #[test]
    fn test_invalid_base64_is_configuration_error() {
        let content = kubeconfig(
            "https://k8s.example.com",
            "      certificate-authority-data: '***'",
            "",
        );
        assert!(matches!(options_of(&content).unwrap_err(), Error::Configuration(_)));
    }

    #[test]
    fn test_file_references_and_insecure_flag() {
        let content = kubeconfig(
            "https://k8s.example.com",
            "      certificate-authority: /etc/ca.pem\n      insecure-skip-tls-verify: true",
            "      client-certificate: /etc/cert.pem\n      client-key: /etc/key.pem",
        );
        let options = options_of(&content).unwrap();

        assert_eq!(options.ca_cert.as_deref(), Some("/etc/ca.pem"));
        assert_eq!(options.client_cert.as_deref(), Some("/etc/cert.pem"));
        assert_eq!(options.client_key.as_deref(), Some("/etc/key.pem"));
        assert_eq!(options.verify, Some(false));
    }

    #[test]
    fn test_token_file_used_when_no_token() {
        let content = r#"
current-context: dev
contexts: [{name: dev, context: {cluster: c, user: u}}]
clusters: [{name: c, cluster: {server: "http://x"}}]
users: [{name: u, user: {tokenFile: /var/run/token}}]
"#;
        let options = options_of(content).unwrap();
        assert_eq!(options.token.as_deref(), Some("/var/run/token"));
        assert_eq!(options.namespace, None);
    }

    #[test]
    fn test_json_and_value_formats() {
        let value = json!({
            "current-context": "dev",
            "contexts": [{"name": "dev", "context": {"cluster": "c", "user": "u"}}],
            "clusters": [{"name": "c", "cluster": {"server": "http://x"}}],
            "users": [{"name": "u", "user": {}}]
        });

        let from_json = Kubeconfig::parse(&value.to_string(), KubeconfigFormat::Json).unwrap();
        let from_value = Kubeconfig::from_value(value).unwrap();
        assert_eq!(from_json, from_value);
        assert_eq!(from_value.clusters["c"].server.as_deref(), Some("http://x"));
    }

    #[test]
    fn test_parse_errors() {
        let err = Kubeconfig::parse("a: [unclosed", KubeconfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.starts_with("Failed to parse YAML encoded KubeConfig")));

        let err = Kubeconfig::parse("{", KubeconfigFormat::Json).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.starts_with("Failed to parse JSON encoded KubeConfig")));

        assert!(Kubeconfig::from_value(json!(["list"])).unwrap_err().is_configuration());
    }

    #[test]
    fn test_malformed_entries_are_ignored() {
        let content = r#"
current-context: dev
contexts:
  - just-a-string
  - name: dev
  - name: dev
    context: {cluster: c, user: u}
clusters: [{name: c, cluster: {server: "http://x"}}, {cluster: {server: "http://y"}}]
users: [{name: u, user: {}}]
"#;
        let config = Kubeconfig::parse(content, KubeconfigFormat::Yaml).unwrap();
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.clusters.len(), 1);
        assert!(options_of(content).is_ok());
    }

    #[test]
    fn test_structure_errors() {
        let cases = [
            ("current-context: a", "KubeConfig parse error - No contexts are defined."),
            (
                "contexts: [{name: a, context: {cluster: c}}]",
                "KubeConfig parse error - Missing current context attribute.",
            ),
            (
                "current-context: [x]\ncontexts: [{name: a, context: {cluster: c}}]",
                "KubeConfig parse error - The current context is invalid.",
            ),
            (
                "current-context: b\ncontexts: [{name: a, context: {cluster: c}}]",
                "KubeConfig parse error - The current context \"b\" is undefined.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {user: u}}]",
                "KubeConfig parse error - The current context is missing the cluster attribute.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {cluster: c, user: u}}]",
                "KubeConfig parse error - No clusters are defined.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {cluster: c, user: u}}]\n\
                 clusters: [{name: d, cluster: {server: s}}]",
                "KubeConfig parse error - The cluster \"c\" is undefined.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {cluster: c}}]\n\
                 clusters: [{name: c, cluster: {server: s}}]",
                "KubeConfig parse error - The current context is missing the user attribute.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {cluster: c, user: u}}]\n\
                 clusters: [{name: c, cluster: {server: s}}]",
                "KubeConfig parse error - No users are defined.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {cluster: c, user: u}}]\n\
                 clusters: [{name: c, cluster: {server: s}}]\nusers: [{name: v, user: {}}]",
                "KubeConfig parse error - The user \"u\" is undefined.",
            ),
            (
                "current-context: a\ncontexts: [{name: a, context: {cluster: c, user: u}}]\n\
                 clusters: [{name: c, cluster: {}}]\nusers: [{name: u, user: {}}]",
                "KubeConfig parse error - The cluster \"c\" is missing the server attribute.",
            ),
        ];

        for (content, expected) in cases {
            assert_eq!(message(options_of(content).unwrap_err()), expected, "{}", content);
        }
    }

    #[test]
    fn test_read_missing_file() {
        let err = Kubeconfig::read("/definitely/not/a/kubeconfig").unwrap_err();
        assert!(message(err).starts_with("KubeConfig file does not exist at path"));
    }

    #[test]
    fn test_client_from_kubeconfig_with_overrides() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), kubeconfig("http://localhost:8080", "", "")).unwrap();
        let transport = RecordingTransport::new();

        let client = ClientBuilder::new()
            .with_kubeconfig(Kubeconfig::read(file.path()).unwrap())
            .with_options(ClientOptions::default().with_namespace("override"))
            .with_transport(transport.clone())
            .build()
            .unwrap();

        client.send_json(ApiRequest::get("/pods")).unwrap();

        let request = transport.last();
        assert_eq!(
            request.uri,
            "http://localhost:8080/api/v1/namespaces/override/pods"
        );
        assert_eq!(
            request.headers.get("authorization").unwrap().to_str().unwrap(),
            "Bearer abc"
        );
    }
}
