use crate::features::map::controls::ZoneParams;
use crate::features::storage::media_display_name;
use crate::state::{AppState, ZoneVariant};
use crate::ui::{
    maybe_push_back, node, push_error, Button as UiButton, Card as UiCard, Checkbox as UiCheckbox,
    Column as UiColumn, Modal as UiModal, Row as UiRow, Text as UiText, TextInput as UiTextInput,
    DANGER_COLOR, PRIMARY_COLOR, SAFE_COLOR,
};
use chrono::NaiveDateTime;
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntry {
    pub name: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub uri: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

impl MediaAttachment {
    /// Picker results sometimes come without a name; derive one from the uri.
    pub fn normalized(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = media_display_name(&self.uri);
        }
        self
    }
}

/// Record handed to the save callback. Nothing is enforced beyond a
/// non-empty description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub id: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub description: String,
    pub characteristics: BTreeMap<String, bool>,
    pub media: Vec<MediaAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaForm {
    pub location: String,
    pub date: String,
    pub time: String,
    pub description: String,
    pub characteristics: BTreeMap<String, bool>,
    pub media: Vec<MediaAttachment>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("form_not_open")]
    NotOpen,
    #[error("missing_description")]
    MissingDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneListState {
    pub entries: Vec<ZoneEntry>,
    pub records: Vec<AreaRecord>,
    pub form: Option<AreaForm>,
}

const SEED_ENTRIES: [(&str, u8); 4] = [
    ("Bairro Malhampsene", 70),
    ("Bairro Liberdade", 50),
    ("Bairro C700", 60),
    ("Bairro Fomento", 70),
];

impl ZoneListState {
    pub fn seeded() -> Self {
        Self {
            entries: SEED_ENTRIES
                .iter()
                .map(|(name, level)| ZoneEntry {
                    name: (*name).to_string(),
                    level: *level,
                })
                .collect(),
            records: Vec::new(),
            form: None,
        }
    }
}

/// Characteristic flag keys offered for each variant.
pub fn characteristic_keys(variant: ZoneVariant) -> &'static [&'static str] {
    match variant {
        ZoneVariant::Safe => &["goodLighting", "policePresence", "publicTransport"],
        ZoneVariant::Danger => &["poorLighting", "noPolicePresence", "houses"],
    }
}

fn characteristic_label(key: &str) -> String {
    let label = match key {
        "goodLighting" => t!("zones.characteristics.good_lighting"),
        "policePresence" => t!("zones.characteristics.police_presence"),
        "publicTransport" => t!("zones.characteristics.public_transport"),
        "poorLighting" => t!("zones.characteristics.poor_lighting"),
        "noPolicePresence" => t!("zones.characteristics.no_police_presence"),
        "houses" => t!("zones.characteristics.abandoned_houses"),
        other => return other.to_string(),
    };
    label.to_string()
}

fn level_label(variant: ZoneVariant, level: u8) -> String {
    let label = match variant {
        ZoneVariant::Safe => t!("zones.level_safe", level = level),
        ZoneVariant::Danger => t!("zones.level_danger", level = level),
    };
    label.to_string()
}

impl AreaForm {
    pub fn new(variant: ZoneVariant, location: &str, now: NaiveDateTime) -> Self {
        Self {
            location: location.to_string(),
            date: now.format("%d/%m/%Y").to_string(),
            time: now.format("%H:%M").to_string(),
            description: String::new(),
            characteristics: characteristic_keys(variant)
                .iter()
                .map(|key| ((*key).to_string(), false))
                .collect(),
            media: Vec::new(),
            lat: None,
            lng: None,
        }
    }

    pub fn apply_bindings(&mut self, bindings: &HashMap<String, String>) {
        if let Some(v) = bindings.get("area_location") {
            self.location = v.clone();
        }
        if let Some(v) = bindings.get("area_date").filter(|v| !v.trim().is_empty()) {
            self.date = v.clone();
        }
        if let Some(v) = bindings.get("area_time").filter(|v| !v.trim().is_empty()) {
            self.time = v.clone();
        }
        if let Some(v) = bindings.get("area_description") {
            self.description = v.clone();
        }
    }

    /// Flip a flag; keys that do not belong to the form's variant are ignored.
    pub fn toggle(&mut self, key: &str) -> Option<bool> {
        let flag = self.characteristics.get_mut(key)?;
        *flag = !*flag;
        Some(*flag)
    }

    pub fn add_media(&mut self, media: Vec<MediaAttachment>) {
        self.media
            .extend(media.into_iter().map(MediaAttachment::normalized));
    }
}

/// Open the create-area form. With navigation params that request it,
/// the location is prefilled from the picked place.
pub fn open_form(
    list: &mut ZoneListState,
    variant: ZoneVariant,
    params: Option<&ZoneParams>,
    now: NaiveDateTime,
) {
    let mut form = AreaForm::new(variant, params.map(|p| p.name.as_str()).unwrap_or(""), now);
    if let Some(p) = params {
        form.lat = Some(p.lat.clone());
        form.lng = Some(p.lng.clone());
    }
    list.form = Some(form);
}

pub fn close_form(list: &mut ZoneListState) {
    list.form = None;
}

pub fn save_form(list: &mut ZoneListState, variant: ZoneVariant) -> Result<AreaRecord, FormError> {
    let form = list.form.as_ref().ok_or(FormError::NotOpen)?;
    if form.description.trim().is_empty() {
        return Err(FormError::MissingDescription);
    }
    let form = list.form.take().ok_or(FormError::NotOpen)?;
    let record = AreaRecord {
        id: uuid::Uuid::new_v4().to_string(),
        location: form.location,
        date: form.date,
        time: form.time,
        description: form.description,
        characteristics: form.characteristics,
        media: form.media,
    };
    info!(variant = variant.as_str(), location = %record.location, "area record saved");
    list.records.push(record.clone());
    Ok(record)
}

fn accent(variant: ZoneVariant) -> &'static str {
    match variant {
        ZoneVariant::Safe => SAFE_COLOR,
        ZoneVariant::Danger => DANGER_COLOR,
    }
}

pub fn render_zone_screen(state: &AppState, variant: ZoneVariant) -> Value {
    let list = state.zone_list(variant);
    let title = match variant {
        ZoneVariant::Safe => t!("zones.safe_title"),
        ZoneVariant::Danger => t!("zones.danger_title"),
    };
    let location_heading = t!("zones.location_heading");

    let mut children = vec![
        node(UiText::new(&title).size(22.0).color(PRIMARY_COLOR)),
        node(UiText::new(&location_heading).size(18.0)),
    ];

    for entry in &list.entries {
        let level = level_label(variant, entry.level);
        children.push(node(
            UiCard::new(vec![
                node(UiText::new(&entry.name).size(16.0)),
                node(UiText::new(&level).size(14.0).color(accent(variant))),
            ])
            .icon("📍")
            .padding(8),
        ));
    }

    if !list.records.is_empty() {
        let reports = t!("zones.reports_heading");
        children.push(node(UiText::new(&reports).size(18.0)));
        for record in &list.records {
            let when = format!("{} {}", record.date, record.time);
            children.push(node(
                UiCard::new(vec![
                    node(UiText::new(&record.location).size(16.0)),
                    node(UiText::new(&when).size(12.0)),
                    node(UiText::new(&record.description).size(14.0)),
                ])
                .padding(8),
            ));
        }
    }

    let add = t!("zones.add");
    children.push(node(
        UiButton::new(&add, variant.open_map_action())
            .id("zone_fab")
            .color(accent(variant)),
    ));

    if let Some(form) = &list.form {
        children.push(render_area_form(form, variant));
    }

    push_error(&mut children, state);
    maybe_push_back(&mut children, state);
    node(UiColumn::new(children).padding(16))
}

fn render_area_form(form: &AreaForm, variant: ZoneVariant) -> Value {
    let title = match variant {
        ZoneVariant::Safe => t!("zones.form.title_safe"),
        ZoneVariant::Danger => t!("zones.form.title_danger"),
    };
    let location_label = t!("zones.location_heading");
    let location_hint = t!("zones.form.location_hint");
    let date_label = t!("zones.form.date");
    let time_label = t!("zones.form.time");
    let description_label = t!("zones.form.description");
    let description_hint = t!("zones.form.description_hint");
    let characteristics_label = t!("zones.form.characteristics");
    let media_label = t!("zones.form.media");
    let save = t!("zones.form.save");

    let mut children = vec![
        node(UiText::new(&location_label).size(16.0)),
        node(
            UiTextInput::new("area_location")
                .text(&form.location)
                .hint(&location_hint),
        ),
        node(UiRow::new(vec![
            node(UiColumn::new(vec![
                node(UiText::new(&date_label).size(16.0)),
                node(UiTextInput::new("area_date").text(&form.date)),
            ])),
            node(UiColumn::new(vec![
                node(UiText::new(&time_label).size(16.0)),
                node(UiTextInput::new("area_time").text(&form.time)),
            ])),
        ])),
        node(UiText::new(&description_label).size(16.0)),
        node(
            UiTextInput::new("area_description")
                .text(&form.description)
                .hint(&description_hint)
                .multiline(true),
        ),
        node(UiText::new(&characteristics_label).size(16.0)),
    ];

    let toggles: Vec<(String, String, bool)> = characteristic_keys(variant)
        .iter()
        .map(|key| {
            (
                characteristic_label(key),
                format!("area_form_toggle:{key}"),
                form.characteristics.get(*key).copied().unwrap_or(false),
            )
        })
        .collect();
    for (label, action, checked) in &toggles {
        children.push(node(
            UiCheckbox::new(label, action)
                .checked(*checked)
                .action(action),
        ));
    }

    children.push(node(
        UiButton::new(&media_label, "area_form_media")
            .id("area_media_btn")
            .requires_media_picker(true),
    ));
    for media in &form.media {
        children.push(node(UiText::new(&media.name).size(12.0)));
    }
    children.push(node(
        UiButton::new(&save, "area_form_save")
            .id("area_save_btn")
            .color(PRIMARY_COLOR),
    ));

    node(UiModal::new(&title, children, "area_form_close"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .unwrap()
    }

    fn params(name: &str) -> ZoneParams {
        ZoneParams {
            modal_is_open: "true".into(),
            lat: "-25.9".into(),
            lng: "32.6".into(),
            name: name.into(),
        }
    }

    #[test]
    fn seeded_lists_have_four_neighbourhoods() {
        let list = ZoneListState::seeded();
        assert_eq!(list.entries.len(), 4);
        assert_eq!(list.entries[0].name, "Bairro Malhampsene");
        assert_eq!(list.entries[1].level, 50);
        assert!(list.form.is_none());
    }

    #[test]
    fn form_prefills_from_pick_params() {
        let mut list = ZoneListState::seeded();
        open_form(&mut list, ZoneVariant::Safe, Some(&params("Matola")), now());
        let form = list.form.as_ref().unwrap();
        assert_eq!(form.location, "Matola");
        assert_eq!(form.date, "07/03/2025");
        assert_eq!(form.time, "09:05");
        assert_eq!(form.lat.as_deref(), Some("-25.9"));
        assert_eq!(
            form.characteristics.keys().cloned().collect::<Vec<_>>(),
            vec!["goodLighting", "policePresence", "publicTransport"]
        );
    }

    #[test]
    fn toggle_only_known_keys() {
        let mut form = AreaForm::new(ZoneVariant::Danger, "", now());
        assert_eq!(form.toggle("houses"), Some(true));
        assert_eq!(form.toggle("houses"), Some(false));
        assert_eq!(form.toggle("goodLighting"), None);
    }

    #[test]
    fn save_requires_description() {
        let mut list = ZoneListState::seeded();
        assert_eq!(save_form(&mut list, ZoneVariant::Safe), Err(FormError::NotOpen));

        open_form(&mut list, ZoneVariant::Safe, None, now());
        list.form.as_mut().unwrap().description = "   ".into();
        assert_eq!(
            save_form(&mut list, ZoneVariant::Safe),
            Err(FormError::MissingDescription)
        );
        assert!(list.form.is_some());
    }

    #[test]
    fn save_appends_record_and_closes_form() {
        let mut list = ZoneListState::seeded();
        open_form(&mut list, ZoneVariant::Danger, Some(&params("Baixa")), now());
        let mut bindings = HashMap::new();
        bindings.insert("area_description".to_string(), "Rua escura".to_string());
        bindings.insert("area_time".to_string(), "21:30".to_string());
        let form = list.form.as_mut().unwrap();
        form.apply_bindings(&bindings);
        form.toggle("poorLighting");
        form.add_media(vec![MediaAttachment {
            uri: "file:///cache/rua.jpg".into(),
            name: String::new(),
            mime_type: "image/jpeg".into(),
        }]);

        let record = save_form(&mut list, ZoneVariant::Danger).unwrap();
        assert!(list.form.is_none());
        assert_eq!(list.records, vec![record.clone()]);
        assert_eq!(record.location, "Baixa");
        assert_eq!(record.time, "21:30");
        assert_eq!(record.characteristics.get("poorLighting"), Some(&true));
        assert_eq!(record.media[0].name, "rua.jpg");
        assert!(!record.id.is_empty());
    }

    #[test]
    fn media_append_keeps_order() {
        let mut form = AreaForm::new(ZoneVariant::Safe, "", now());
        let item = |n: &str| MediaAttachment {
            uri: format!("file:///m/{n}"),
            name: n.into(),
            mime_type: String::new(),
        };
        form.add_media(vec![item("a.jpg")]);
        form.add_media(vec![item("b.mp4"), item("c.png")]);
        let names: Vec<_> = form.media.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.mp4", "c.png"]);
    }
}
