use aemet_clima::{
    AemetClima, AemetError, ApiStatus, ArcGisGeocoder, ClientConfig, RemoteClient, RemoteError,
    ReqwestTransport, SiteCatalog,
};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .api_key("integration-key")
        .base_url(format!("{}/opendata/api/", server.uri()))
        .rate_limit_cooldown(Duration::from_millis(10))
        .max_attempts(2)
        .build()
}

fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new(Duration::from_secs(5)).expect("Failed to build transport"))
}

async fn mount_envelope(server: &MockServer, resource: &str, key: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/opendata/api/{}", resource)))
        .and(query_param("api_key", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "descripcion": "exito",
            "estado": 200,
            "datos": format!("{}/sh/{}/datos", server.uri(), key),
            "metadatos": format!("{}/sh/{}/metadatos", server.uri(), key),
        })))
        .mount(server)
        .await;
}

async fn mount_json(server: &MockServer, at: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(at.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Two-stage exchange over real HTTP: envelope, then data and metadata.
#[tokio::test]
async fn test_two_stage_call_over_http() {
    init_logger();
    let server = MockServer::start().await;
    mount_envelope(&server, "valores/climatologicos/inventarioestaciones/todasestaciones/", "inv").await;
    mount_json(&server, "/sh/inv/datos", json!([{"indicativo": "1111X", "latitud": "432829N"}])).await;
    mount_json(&server, "/sh/inv/metadatos", json!({"unidad_generadora": "AEMET"})).await;

    let client = RemoteClient::with_transport(config(&server), transport());
    let payload = client
        .call("valores/climatologicos/inventarioestaciones/todasestaciones/")
        .await
        .expect("Call should succeed");

    assert_eq!(payload.status, ApiStatus::Ok);
    assert_eq!(payload.data.len(), 1);
    assert_eq!(payload.data[0]["indicativo"], json!("1111X"));
    assert_eq!(payload.metadata["unidad_generadora"], json!("AEMET"));
}

/// A rate-limited envelope is retried until the attempt cap.
#[tokio::test]
async fn test_rate_limit_cap_over_http() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opendata/api/limited"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "descripcion": "Límite de peticiones o caudal por minuto excedido para este usuario.",
            "estado": 429
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = RemoteClient::with_transport(config(&server), transport());
    let result = client.call("limited").await;

    match result {
        Err(RemoteError::RateLimitExceeded { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("Expected RateLimitExceeded, got: {:?}", other.map(|p| p.status)),
    }
}

/// Full facade flow: inventory, geocoding and daily observations.
#[tokio::test]
async fn test_facade_end_to_end() {
    init_logger();
    let server = MockServer::start().await;
    mount_envelope(&server, "valores/climatologicos/inventarioestaciones/todasestaciones/", "inv").await;
    mount_json(
        &server,
        "/sh/inv/datos",
        json!([{
            "latitud": "432829N",
            "provincia": "CANTABRIA",
            "altitud": "52",
            "indicativo": "1111X",
            "nombre": "SANTANDER I,CMT",
            "indsinop": "08023",
            "longitud": "034800W"
        }]),
    )
    .await;
    mount_json(&server, "/sh/inv/metadatos", json!({"campos": []})).await;
    mount_json(
        &server,
        "/geocode",
        json!({"address": {"City": "Santander", "Subregion": "Cantabria", "Region": "Cantabria"}}),
    )
    .await;

    mount_envelope(
        &server,
        "valores/climatologicos/diarios/datos/fechaini/2020-01-01T00:00:00UTC/fechafin/2020-01-02T00:00:00UTC/estacion/1111X",
        "obs",
    )
    .await;
    mount_json(
        &server,
        "/sh/obs/datos",
        json!([
            {"fecha": "2020-01-01", "indicativo": "1111X", "nombre": "SANTANDER I,CMT", "provincia": "CANTABRIA", "tmed": "11,4", "prec": "Ip"},
            {"fecha": "2020-01-02", "indicativo": "1111X", "nombre": "SANTANDER I,CMT", "provincia": "CANTABRIA", "tmed": "12,0", "prec": "Acum"}
        ]),
    )
    .await;
    mount_json(&server, "/sh/obs/metadatos", json!({"periodicidad": "1 vez al día"})).await;

    let transport = transport();
    let geocoder = Arc::new(ArcGisGeocoder::with_url(
        transport.clone(),
        format!("{}/geocode", server.uri()),
    ));
    let mut client = AemetClima::from_parts(config(&server), transport, geocoder, SiteCatalog::default());

    let near = client
        .near_sites()
        .latitude(43.47)
        .longitude(-3.80)
        .n_near(1)
        .call()
        .await
        .expect("Near sites should resolve");
    assert_eq!(near.codes(), vec!["1111X"]);
    assert_eq!(near.sites[0].site.city.as_deref(), Some("Santander"));

    let observations = client
        .daily_clima()
        .sites(&near)
        .start(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        .end(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap())
        .call()
        .await
        .expect("Observations should be fetched");

    assert_eq!(observations.height(), 2);
    let precipitation = observations.frame.column("precipitation").unwrap().f64().unwrap();
    assert_eq!(precipitation.get(0), Some(0.05));
    assert_eq!(precipitation.get(1), None);
}

/// A rejected key surfaces as an authentication error.
#[tokio::test]
async fn test_unauthorized_over_http() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opendata/api/valores/climatologicos/inventarioestaciones/todasestaciones/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "descripcion": "API key invalido",
            "estado": 401
        })))
        .mount(&server)
        .await;

    let transport = transport();
    let geocoder = Arc::new(ArcGisGeocoder::new(transport.clone()));
    let mut client = AemetClima::from_parts(config(&server), transport, geocoder, SiteCatalog::default());

    let result = client.sites_info(true).await;
    assert!(matches!(
        result,
        Err(AemetError::Remote(RemoteError::Authentication { .. }))
    ));
}
