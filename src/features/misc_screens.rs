use crate::features::auth::AuthContext;
use crate::state::{AlertState, AppState};
use crate::ui::{
    node, push_error, Alert as UiAlert, Button as UiButton, Card as UiCard, Column as UiColumn,
    Row as UiRow, Text as UiText, DANGER_COLOR, PRIMARY_COLOR,
};
use rust_i18n::t;
use serde_json::{json, Value};

fn home_card(title: &str, icon: &str, action: &str) -> Value {
    node(
        UiCard::new(vec![node(UiText::new(title).size(16.0).color(PRIMARY_COLOR))])
            .title(title)
            .icon(icon)
            .action(action)
            .padding(16),
    )
}

pub fn render_home_screen(state: &AppState, auth: &AuthContext) -> Value {
    let greeting = match auth.user() {
        Some(user) if !user.name.is_empty() => {
            let name = user.name.as_str();
            t!("home.greeting", name = name).to_string()
        }
        _ => t!("home.greeting_anonymous").to_string(),
    };
    let safe = t!("home.cards.safe_zone");
    let danger = t!("home.cards.danger_zone");
    let map = t!("home.cards.map");
    let community = t!("home.cards.community");
    let logout = t!("home.logout");

    let mut children = vec![
        node(UiText::new(&greeting).size(22.0).content_description("home_greeting")),
        node(UiRow::new(vec![
            home_card(&safe, "map_pin", "safe_zone_screen"),
            home_card(&danger, "alert_triangle", "dangerous_zone_screen"),
        ])),
        node(UiRow::new(vec![
            home_card(&map, "map", "map_screen_safe"),
            home_card(&community, "users", "noop"),
        ])),
    ];
    push_error(&mut children, state);
    children.push(node(
        UiButton::new(&logout, "logout")
            .id("logout_btn")
            .color(DANGER_COLOR),
    ));
    node(UiColumn::new(children).padding(20).content_description("home"))
}

pub fn render_alert(alert: &AlertState) -> Value {
    node(UiAlert::new(&alert.title, &alert.message))
}

/// Fallback tree for failures that happen before any screen can render.
pub fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message, "content_description": "error_text" }
        ]
    })
}
