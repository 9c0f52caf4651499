//! In-memory doubles for the HTTP transport and the geocoder.

use crate::config::ClientConfig;
use crate::error::AemetError;
use crate::remote::error::RemoteError;
use crate::remote::transport::{HttpResponse, HttpTransport};
use crate::sites::catalog::Site;
use crate::sites::geocoder::{AdminRegion, ReverseGeocoder};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE_URL: &str = "http://aemet.test/api/";

pub fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .api_key("test-key")
        .base_url(BASE_URL)
        .rate_limit_cooldown(Duration::from_millis(1))
        .max_attempts(3)
        .build()
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// Answers GETs from per-URL queues. The last queued answer repeats forever.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(HttpResponse {
                status,
                body: body.into(),
            });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).count()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, RemoteError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(url).ok_or_else(|| {
            RemoteError::NetworkRequest(url.to_string(), format!("no route for {}", url).into())
        })?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| RemoteError::NetworkRequest(url.to_string(), "empty route".into()))
    }
}

pub fn envelope(status: u16, data_url: &str, metadata_url: &str) -> String {
    json!({
        "descripcion": "exito",
        "estado": status,
        "datos": data_url,
        "metadatos": metadata_url,
    })
    .to_string()
}

/// Routes `path` through the full two-stage exchange.
pub fn serve(transport: &FakeTransport, path: &str, data: &Value, metadata: &Value) {
    let key = path.trim_end_matches('/');
    let data_url = format!("http://files.test/{}/datos", key);
    let metadata_url = format!("http://files.test/{}/metadatos", key);
    transport.route(
        &format!("{}{}", BASE_URL, path),
        200,
        envelope(200, &data_url, &metadata_url),
    );
    transport.route(&data_url, 200, data.to_string());
    transport.route(&metadata_url, 200, metadata.to_string());
}

pub fn station_json(code: &str, latitude: &str, longitude: &str) -> Value {
    json!({
        "latitud": latitude,
        "provincia": "CANTABRIA",
        "altitud": "52",
        "indicativo": code,
        "nombre": format!("STATION {}", code),
        "indsinop": "08023",
        "longitud": longitude,
    })
}

pub fn site(code: &str, latitude: f64, longitude: f64) -> Site {
    Site {
        site: code.to_string(),
        name: Some(format!("STATION {}", code)),
        synoptic_indicator: None,
        latitude,
        longitude,
        altitude: None,
        district: None,
        city: None,
        subregion: None,
        region: None,
        subregion_aemet: None,
    }
}

/// Geocoder that names the city after the coordinates and counts lookups.
#[derive(Default)]
pub struct FakeGeocoder {
    calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseGeocoder for FakeGeocoder {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<AdminRegion, AemetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AdminRegion {
            district: None,
            city: Some(format!("City {:.3},{:.3}", latitude, longitude)),
            subregion: Some("Cantabria".to_string()),
            region: Some("Cantabria".to_string()),
        })
    }
}
