// crates/wormproxy/tests/resolver_test.rs

mod common;

use common::FakeTransport;
use std::sync::Arc;
use wormcore::ProxyError;
use wormproxy::{
    expand_template, parse_template, GraphReference, Location, ProxyConfig, Resolver, Url,
};

const INDEX: &str = "https://index.test/hairworm.txt";

fn config() -> ProxyConfig {
    ProxyConfig::default()
        .with_index_url(INDEX)
        .with_extensions(["a", "b", "c"])
}

fn resolver(transport: FakeTransport) -> (Resolver, Arc<FakeTransport>) {
    let transport = Arc::new(transport);
    let resolver = Resolver::new(transport.clone(), Arc::new(config()));
    (resolver, transport)
}

#[tokio::test]
async fn test_absolute_url_returned_unchanged() {
    let url = "https://graphs.test/lib/sum.ghx";
    let (resolver, _) = resolver(FakeTransport::new().with(url, "{}"));

    let locator = resolver.resolve(&GraphReference::new(url)).await.unwrap();

    assert_eq!(
        locator.location(),
        &Location::Remote(Url::parse(url).unwrap())
    );
    assert!(locator.is_for(&GraphReference::new(url)));
    assert!(!locator.is_for(&GraphReference::new("https://graphs.test/other.ghx")));
}

#[tokio::test]
async fn test_unreachable_absolute_url() {
    let (resolver, _) = resolver(FakeTransport::new());

    let err = resolver
        .resolve(&GraphReference::new("https://graphs.test/missing.ghx"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyError::NotReachable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_bare_name_picks_first_reachable_extension() {
    let transport = FakeTransport::new()
        .with(INDEX, "https://x/{name}.GHEXTENSION\n")
        .with("https://x/foo.b", "{}")
        .with("https://x/foo.c", "{}");
    let (resolver, transport) = resolver(transport);

    let locator = resolver.resolve(&GraphReference::new("foo")).await.unwrap();

    assert_eq!(locator.url().unwrap().as_str(), "https://x/foo.b");
    // Probed in priority order and stopped at the first hit
    let probes: Vec<String> = transport
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("HEAD "))
        .collect();
    assert_eq!(probes, vec!["HEAD https://x/foo.a", "HEAD https://x/foo.b"]);
}

#[tokio::test]
async fn test_no_candidate_reachable() {
    let transport = FakeTransport::new().with(INDEX, "https://x/{name}.GHEXTENSION");
    let (resolver, _) = resolver(transport);

    let err = resolver.resolve(&GraphReference::new("foo")).await.unwrap_err();

    match err {
        ProxyError::ResourceNotFound { reference, tried } => {
            assert_eq!(reference, "foo");
            assert_eq!(tried.len(), 3);
        }
        other => panic!("expected ResourceNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_index_unavailable() {
    let (resolver, _) = resolver(FakeTransport::new());

    let err = resolver.resolve(&GraphReference::new("foo")).await.unwrap_err();

    assert!(
        matches!(err, ProxyError::ResolutionServiceUnavailable(_)),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_offline_short_circuits_before_any_probe() {
    let transport = FakeTransport::new()
        .with(INDEX, "https://x/{name}.GHEXTENSION")
        .with("https://x/foo.a", "{}");
    transport.set_online(false);
    let (resolver, transport) = resolver(transport);

    for reference in ["foo", "https://x/foo.a"] {
        let err = resolver
            .resolve(&GraphReference::new(reference))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NetworkUnavailable), "got {:?}", err);
    }
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_json_index_document() {
    let transport = FakeTransport::new()
        .with(INDEX, r#"{"template": "https://x/graphs/{name}"}"#)
        .with("https://x/graphs/foo.c", "{}");
    let (resolver, _) = resolver(transport);

    let locator = resolver.resolve(&GraphReference::new("foo")).await.unwrap();

    assert_eq!(locator.url().unwrap().as_str(), "https://x/graphs/foo.c");
}

#[tokio::test]
async fn test_local_path_skips_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.ghx");
    std::fs::write(&path, "{}").unwrap();
    let transport = FakeTransport::new();
    transport.set_online(false);
    let (resolver, _) = resolver(transport);

    let reference = GraphReference::new(path.to_str().unwrap());
    let locator = resolver.resolve(&reference).await.unwrap();
    assert_eq!(locator.location(), &Location::Local(path.clone()));

    let missing = GraphReference::new(dir.path().join("nope.ghx").to_str().unwrap());
    let err = resolver.resolve(&missing).await.unwrap_err();
    assert!(matches!(err, ProxyError::NotReachable(_)));
}

#[tokio::test]
async fn test_empty_reference_rejected() {
    let (resolver, transport) = resolver(FakeTransport::new());

    let err = resolver.resolve(&GraphReference::new("   ")).await.unwrap_err();

    assert!(matches!(err, ProxyError::ResourceNotFound { .. }));
    assert!(transport.calls().is_empty());
}

#[test]
fn test_parse_template_skips_comments() {
    let body = b"# hairworm index\n\n  https://x/{name}.GHEXTENSION  \nhttps://ignored\n";
    assert_eq!(
        parse_template(body).as_deref(),
        Some("https://x/{name}.GHEXTENSION")
    );
    assert_eq!(parse_template(b"\n# only comments\n"), None);
    assert_eq!(parse_template(br#"{"other": 1}"#), None);
}

#[test]
fn test_expand_template_order() {
    let candidates = expand_template("https://x/{name}.GHEXTENSION", "foo", &config());
    assert_eq!(
        candidates,
        vec!["https://x/foo.a", "https://x/foo.b", "https://x/foo.c"]
    );
}
