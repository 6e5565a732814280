//! HTML/JS for the embedded map page and the scripts the host injects
//! into it. The page runs in the WebView's own context; it only talks
//! back through `SafeZoneHost.postMessage`.

use super::selection::MarkerSlot;
use serde::Serialize;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const INITIAL_ZOOM: u8 = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSettings {
    pub tile_url: String,
    pub geocoder_url: String,
    pub center: (f64, f64),
    pub language: String,
    pub fallback_name: String,
    pub my_location_label: String,
}

/// Escape a value for inclusion inside an inline `<script>` block.
fn js_literal<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".into())
        .replace("</", "<\\/")
}

const PAGE_SCRIPT: &str = r#"
const cfg = __SETTINGS__;
const map = L.map('map').setView(cfg.center, __ZOOM__);
L.tileLayer(cfg.tileUrl, {
    attribution: '&copy; OpenStreetMap contributors',
    maxZoom: 19,
}).addTo(map);

const slots = { pending: null, my_location: null };
// Tap counter restarts with every load; `page` tells loads apart.
const page = Date.now().toString(36) + Math.random().toString(36).slice(2, 8);
let seq = 0;

function post(message) {
    if (window.SafeZoneHost) {
        window.SafeZoneHost.postMessage(JSON.stringify(Object.assign({ page }, message)));
    }
}

async function placeName(lat, lng) {
    try {
        const url = `${cfg.geocoderUrl}?format=jsonv2&lat=${lat}&lon=${lng}`;
        const res = await fetch(url, { headers: { 'Accept-Language': cfg.language } });
        const data = await res.json();
        return (data && (data.name || data.display_name)) || cfg.fallbackName;
    } catch (err) {
        return cfg.fallbackName;
    }
}

function removeMarker(slot) {
    if (slots[slot]) {
        map.removeLayer(slots[slot]);
        slots[slot] = null;
    }
}

window.safeZone = { removeMarker };

map.on('click', async (e) => {
    const lat = e.latlng.lat;
    const lng = e.latlng.lng;
    const mine = ++seq;
    post({ loading: true, seq: mine });
    removeMarker('pending');
    const marker = L.marker([lat, lng]).addTo(map);
    slots.pending = marker;
    const name = await placeName(lat, lng);
    marker.bindPopup(name).openPopup();
    post({ lat, lng, name, loading: false, seq: mine });
});

if (navigator.geolocation) {
    navigator.geolocation.getCurrentPosition(async (pos) => {
        const lat = pos.coords.latitude;
        const lng = pos.coords.longitude;
        if (!slots.my_location) {
            slots.my_location = L.circleMarker([lat, lng], {
                radius: 8, color: '#fff', weight: 2, fillColor: '#2563eb', fillOpacity: 0.9,
            }).addTo(map).bindTooltip(cfg.myLocationLabel);
        }
        map.setView([lat, lng], __ZOOM__);
        const name = await placeName(lat, lng);
        post({ lat, lng, name, source: 'device' });
    }, (err) => {
        if (err.code === err.PERMISSION_DENIED) {
            post({ permissionDenied: true });
        }
    });
}
"#;

/// Full page for the map WebView. Deterministic for a given settings
/// value, so the host can skip reloading when it did not change.
pub fn render_page(settings: &SurfaceSettings) -> String {
    let script = PAGE_SCRIPT
        .replace("__SETTINGS__", &js_literal(settings))
        .replace("__ZOOM__", &INITIAL_ZOOM.to_string());
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0" />
<link rel="stylesheet" href="{LEAFLET_CSS}" />
<style>html, body, #map {{ height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script src="{LEAFLET_JS}"></script>
<script>{script}</script>
</body>
</html>"#
    )
}

/// Fire-and-forget; a slot with no marker is a no-op on the page.
pub fn remove_marker_script(slot: MarkerSlot) -> String {
    format!(
        "window.safeZone && window.safeZone.removeMarker({});true;",
        js_literal(&slot.as_str())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SurfaceSettings {
        SurfaceSettings {
            tile_url: "https://tiles.example/{z}/{x}/{y}.png".into(),
            geocoder_url: "https://geo.example/reverse".into(),
            center: (-25.9692, 32.5732),
            language: "pt".into(),
            fallback_name: "Local Desconhecido".into(),
            my_location_label: "Minha localização".into(),
        }
    }

    #[test]
    fn page_embeds_settings_and_channel_hooks() {
        let html = render_page(&settings());
        assert!(html.contains("leaflet@1.9.4"));
        assert!(html.contains(r#""tileUrl":"https://tiles.example/{z}/{x}/{y}.png""#));
        assert!(html.contains(r#""fallbackName":"Local Desconhecido""#));
        assert!(html.contains("SafeZoneHost.postMessage"));
        assert!(html.contains("seq: mine"));
        assert!(html.contains("Object.assign({ page }, message)"));
        assert!(!html.contains("__SETTINGS__"));
        assert!(!html.contains("__ZOOM__"));
    }

    #[test]
    fn page_is_deterministic() {
        assert_eq!(render_page(&settings()), render_page(&settings()));
    }

    #[test]
    fn script_breakout_is_escaped() {
        let mut s = settings();
        s.fallback_name = "</script><script>alert(1)".into();
        let html = render_page(&s);
        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains(r"<\/script>"));
    }

    #[test]
    fn removal_script_targets_slot() {
        assert_eq!(
            remove_marker_script(MarkerSlot::Pending),
            r#"window.safeZone && window.safeZone.removeMarker("pending");true;"#
        );
    }
}
