pub mod channel;
pub mod controls;
pub mod selection;
pub mod surface;

use crate::state::AppState;
use crate::ui::{
    node, Button as UiButton, Column as UiColumn, MapSurface as UiMapSurface,
    Progress as UiProgress, Row as UiRow, Text as UiText, DANGER_COLOR,
};
use controls::controls_view;
use rust_i18n::t;
use serde_json::Value;
use surface::SurfaceSettings;

pub fn surface_settings(state: &AppState) -> SurfaceSettings {
    SurfaceSettings {
        tile_url: state.map_settings.tile_url.clone(),
        geocoder_url: state.map_settings.geocoder_url.clone(),
        center: state.map_settings.center,
        language: state.locale.clone(),
        fallback_name: t!("map.fallback_name").to_string(),
        my_location_label: t!("map.my_location").to_string(),
    }
}

pub fn render_map_screen(state: &AppState) -> Value {
    let selection = &state.map;
    let view = controls_view(selection);
    let html = surface::render_page(&surface_settings(state));

    let mut children = vec![node(UiMapSurface::new(&html))];

    if view.show_spinner {
        let resolving = t!("map.resolving");
        children.push(node(
            UiProgress::new()
                .text(&resolving)
                .content_description("map_resolving"),
        ));
    }

    if let Some(pick) = selection.pick() {
        let title = format!("📍 {}", pick.name);
        let lat = format!("Lat: {}", pick.latitude);
        let lng = format!("Long: {}", pick.longitude);
        children.push(node(UiColumn::new(vec![
            node(UiText::new(&title).size(16.0).content_description("pick_name")),
            node(UiText::new(&lat).size(14.0)),
            node(UiText::new(&lng).size(14.0)),
        ])
        .padding(8)
        .content_description("pick_details")));
    }

    if state.location_denied {
        let denied = t!("map.permission_denied");
        children.push(node(UiText::new(&denied).size(12.0).color(DANGER_COLOR)));
    }

    let cancel = t!("map.cancel");
    let mark = t!("map.mark");
    children.push(node(UiRow::new(vec![
        node(UiButton::new(&cancel, "map_cancel").id("map_cancel_btn")),
        node(
            UiButton::new(&mark, "map_mark")
                .id("map_mark_btn")
                .enabled(view.mark_enabled)
                .color(view.mark_color),
        ),
    ])));

    node(UiColumn::new(children).content_description("map_screen"))
}
