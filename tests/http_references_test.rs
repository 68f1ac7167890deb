//! Reference modules served over HTTP

use std::sync::Arc;

use quill::{
    EngineConfig, Error, ModelType, ModuleId, ModuleImage, ProcessImage, ServiceRegistry,
    TemplateEngine, TypeSchema,
};
use serde::Serialize;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Serialize)]
struct Invoice {
    #[serde(rename = "Number")]
    number: String,
    #[serde(rename = "Total")]
    total: f64,
}

fn invoice() -> Invoice {
    Invoice {
        number: "INV-7".to_string(),
        total: 12.5,
    }
}

fn billing_model() -> ModelType {
    ModelType::new("billing::Invoice", "billing")
}

fn billing_module() -> Vec<u8> {
    let mut image = ModuleImage::new("billing");
    image.define(TypeSchema::with_members(
        "billing.Invoice",
        [("Number", "string"), ("Total", "float")],
    ));
    image.to_bytes().unwrap()
}

fn engine_for(server: &MockServer) -> TemplateEngine {
    let config = EngineConfig {
        user_agent: "quill-tests".to_string(),
        ..EngineConfig::default()
    }
    .with_base_url(Url::parse(&server.uri()).unwrap());

    TemplateEngine::new(config, Arc::new(ProcessImage::new()), ServiceRegistry::new()).unwrap()
}

#[tokio::test]
async fn test_model_module_fetched_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_framework/_bin/billing"))
        .and(header("user-agent", "quill-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(billing_module()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine_for(&mock_server);
    let template = engine
        .compile_as::<Invoice>("@Model.Number: @Model.Total", billing_model())
        .await
        .unwrap();

    assert_eq!(template.render(&invoice()).await.unwrap(), "INV-7: 12.5");
}

#[tokio::test]
async fn test_served_schema_drives_diagnostics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_framework/_bin/billing"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(billing_module()))
        .mount(&mock_server)
        .await;

    let err = engine_for(&mock_server)
        .compile_as::<Invoice>("@Model.Customer", billing_model())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Compilation { .. }), "{err}");
    assert!(err.to_string().contains("no member 'Customer'"));
}

#[tokio::test]
async fn test_missing_remote_module_aborts_compile() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_framework/_bin/billing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = engine_for(&mock_server)
        .compile_as::<Invoice>("@Model.Total", billing_model())
        .await
        .unwrap_err();

    match err {
        Error::ReferenceResolution { module, reason, .. } => {
            assert_eq!(module, ModuleId::new("billing"));
            assert!(reason.contains("404"), "{reason}");
        }
        other => panic!("expected reference resolution error, got {other}"),
    }
}

#[tokio::test]
async fn test_garbage_module_is_a_compile_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_framework/_bin/billing"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x7fELF not metadata".to_vec()))
        .mount(&mock_server)
        .await;

    let err = engine_for(&mock_server)
        .compile_as::<Invoice>("@Model.Total", billing_model())
        .await
        .unwrap_err();

    match err {
        Error::Compilation { diagnostics } => {
            assert!(diagnostics.iter().any(|d| d.message.contains("module 'billing'")));
        }
        other => panic!("expected compilation error, got {other}"),
    }
}

#[tokio::test]
async fn test_module_identifiers_are_url_encoded() {
    let mock_server = MockServer::start().await;

    let mut image = ModuleImage::new("billing v2");
    image.define(TypeSchema::opaque("billing.Invoice"));

    Mock::given(method("GET"))
        .and(path("/_framework/_bin/billing+v2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image.to_bytes().unwrap()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let template = engine_for(&mock_server)
        .compile_as::<Invoice>(
            "#@Model.Number",
            ModelType::new("billing::Invoice", "billing v2"),
        )
        .await
        .unwrap();
    assert_eq!(template.render(&invoice()).await.unwrap(), "#INV-7");
}
