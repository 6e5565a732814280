use super::selection::{MarkerSlot, Phase, SelectionState};
use super::surface;
use crate::state::ZoneVariant;
use crate::ui::{MUTED_COLOR, PRIMARY_COLOR};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("mark_without_pick")]
    NoPick,
}

/// Parameters a zone list screen reads to prefill its creation form.
/// Everything is string encoded, as route params are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneParams {
    #[serde(rename = "modalIsOpen")]
    pub modal_is_open: String,
    pub lat: String,
    pub lng: String,
    pub name: String,
}

impl ZoneParams {
    pub fn opens_modal(&self) -> bool {
        self.modal_is_open == "true"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub pathname: String,
    pub params: ZoneParams,
}

/// What the Cancel/Mark row should look like for the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlsView {
    pub mark_enabled: bool,
    pub mark_color: &'static str,
    pub show_spinner: bool,
}

pub fn controls_view(selection: &SelectionState) -> ControlsView {
    let mark_enabled = selection.phase() == Phase::Ready;
    ControlsView {
        mark_enabled,
        mark_color: if mark_enabled { PRIMARY_COLOR } else { MUTED_COLOR },
        show_spinner: selection.is_loading(),
    }
}

/// "Mark": only legal once a pick is resolved.
pub fn confirm(selection: &SelectionState) -> Result<NavigationRequest, MapError> {
    let pick = selection.pick().ok_or(MapError::NoPick)?;
    Ok(navigation_for(selection.variant, pick.latitude, pick.longitude, &pick.name))
}

pub fn navigation_for(variant: ZoneVariant, lat: f64, lng: f64, name: &str) -> NavigationRequest {
    NavigationRequest {
        pathname: variant.pathname().to_string(),
        params: ZoneParams {
            modal_is_open: "true".into(),
            lat: lat.to_string(),
            lng: lng.to_string(),
            name: name.to_string(),
        },
    }
}

/// "Cancel": drops the pick and returns the script that clears the
/// pending marker on the surface. The script is sent even when the host
/// holds no handle, since a tap may still be resolving.
pub fn cancel(selection: &mut SelectionState) -> Vec<String> {
    selection.clear_pick();
    vec![surface::remove_marker_script(MarkerSlot::Pending)]
}
