//! Canonical field tables.

use super::{FieldKind, FieldOrigin, FieldSpec};

const fn provider(name: &'static str, provider_id: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        provider_id: Some(provider_id),
        kind,
        origin: FieldOrigin::Provider,
    }
}

/// Filled in locally; AEMET never sends these keys.
const fn geocoded(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        provider_id: None,
        kind: FieldKind::Text,
        origin: FieldOrigin::Geocoded,
    }
}

/// Station inventory columns, in output order.
pub static SITE_FIELDS: &[FieldSpec] = &[
    provider("site", "indicativo", FieldKind::Text),
    provider("name", "nombre", FieldKind::Text),
    provider("synoptic_indicator", "indsinop", FieldKind::Text),
    provider("latitude", "latitud", FieldKind::Coordinate),
    provider("longitude", "longitud", FieldKind::Coordinate),
    provider("altitude", "altitud", FieldKind::Float),
    geocoded("district"),
    geocoded("city"),
    geocoded("subregion"),
    geocoded("region"),
    provider("subregion_aemet", "provincia", FieldKind::Text),
];

/// Daily climatology columns, in output order.
pub static OBSERVATION_FIELDS: &[FieldSpec] = &[
    provider("date", "fecha", FieldKind::Date),
    provider("site", "indicativo", FieldKind::Text),
    provider("altitude", "altitud", FieldKind::Float),
    provider("temp_avg", "tmed", FieldKind::Float),
    provider("precipitation", "prec", FieldKind::Float),
    provider("temp_min", "tmin", FieldKind::Float),
    provider("temp_max", "tmax", FieldKind::Float),
    provider("hr_temp_min", "horatmin", FieldKind::Hour),
    provider("hr_temp_max", "horatmax", FieldKind::Hour),
    provider("wnd_dir", "dir", FieldKind::Float),
    provider("wnd_spd", "velmedia", FieldKind::Float),
    provider("wnd_gst", "racha", FieldKind::Float),
    provider("hr_wnd_gst", "horaracha", FieldKind::Hour),
    provider("press_max", "presMax", FieldKind::Float),
    provider("hr_press_max", "horaPresMax", FieldKind::Hour),
    provider("press_min", "presMin", FieldKind::Float),
    provider("hr_press_min", "horaPresMin", FieldKind::Hour),
    provider("hr_sun", "sol", FieldKind::Float),
];

/// Provider columns AEMET repeats on every observation row.
pub static REDUNDANT_OBSERVATION_FIELDS: &[&str] = &["nombre", "provincia"];
