use crate::config::CoreConfig;
use crate::features::map::controls::NavigationRequest;
use crate::features::map::selection::SelectionState;
use crate::features::zones::ZoneListState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Screen {
    Onboard,
    SignIn,
    SignUp,
    SendEmail,
    ConfirmOtp,
    ForgotPassword,
    Home,
    SafeZone,
    DangerousZone,
    Map,
}

impl Screen {
    /// Screens behind the authentication guard.
    pub fn is_protected(self) -> bool {
        matches!(
            self,
            Screen::Home | Screen::SafeZone | Screen::DangerousZone | Screen::Map
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZoneVariant {
    Safe,
    Danger,
}

impl ZoneVariant {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "safe" => Some(ZoneVariant::Safe),
            "danger" => Some(ZoneVariant::Danger),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneVariant::Safe => "safe",
            ZoneVariant::Danger => "danger",
        }
    }

    pub fn pathname(self) -> &'static str {
        match self {
            ZoneVariant::Safe => "/safeZone",
            ZoneVariant::Danger => "/dangerousZone",
        }
    }

    pub fn screen(self) -> Screen {
        match self {
            ZoneVariant::Safe => Screen::SafeZone,
            ZoneVariant::Danger => Screen::DangerousZone,
        }
    }

    pub fn open_map_action(self) -> &'static str {
        match self {
            ZoneVariant::Safe => "map_screen_safe",
            ZoneVariant::Danger => "map_screen_danger",
        }
    }
}

/// What happens when the user dismisses the current alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertFollowUp {
    Stay,
    Back,
    Push(Screen),
    ResetOtp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertState {
    pub title: String,
    pub message: String,
    pub follow_up: AlertFollowUp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapSettings {
    pub tile_url: String,
    pub geocoder_url: String,
    pub center: (f64, f64),
}

impl MapSettings {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            tile_url: config.tile_url.clone(),
            geocoder_url: config.geocoder_url.clone(),
            center: config.default_center,
        }
    }
}

/// Field values and inline errors of the authentication screens.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthFormState {
    pub email: String,
    pub name: String,
    pub phone: String,
    /// Validation messages keyed by input bind key.
    pub field_errors: BTreeMap<String, String>,
    pub sign_in_error: Option<String>,
    pub otp_email: Option<String>,
    /// Bumped whenever the OTP input must be cleared.
    pub otp_generation: u32,
    pub otp_verified: bool,
}

/// One-shot outputs attached to the next response and then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub surface_scripts: Vec<String>,
    pub navigation: Option<NavigationRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    pub nav_stack: Vec<Screen>,
    pub locale: String,
    pub last_error: Option<String>,
    pub alert: Option<AlertState>,
    pub auth_form: AuthFormState,
    pub map: SelectionState,
    pub map_settings: MapSettings,
    pub location_denied: bool,
    pub safe_zone: ZoneListState,
    pub dangerous_zone: ZoneListState,
    #[serde(skip)]
    pub effects: Effects,
}

impl AppState {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            nav_stack: vec![Screen::Onboard],
            locale: config.locale.clone(),
            last_error: None,
            alert: None,
            auth_form: AuthFormState::default(),
            map: SelectionState::new(ZoneVariant::Safe),
            map_settings: MapSettings::from_config(config),
            location_denied: false,
            safe_zone: ZoneListState::seeded(),
            dangerous_zone: ZoneListState::seeded(),
            effects: Effects::default(),
        }
    }

    pub fn ensure_navigation(&mut self) {
        if self.nav_stack.is_empty() {
            self.nav_stack.push(Screen::Onboard);
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.nav_stack.last().copied().unwrap_or(Screen::Onboard)
    }

    pub fn nav_depth(&self) -> usize {
        let depth = self.nav_stack.len();
        if depth == 0 { 1 } else { depth }
    }

    pub fn push_screen(&mut self, screen: Screen) {
        self.ensure_navigation();
        if self.current_screen() != screen {
            self.nav_stack.push(screen);
        }
    }

    pub fn pop_screen(&mut self) {
        self.ensure_navigation();
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
        }
    }

    pub fn reset_navigation(&mut self, root: Screen) {
        self.nav_stack.clear();
        self.nav_stack.push(root);
    }

    /// Pop back to an existing instance of `screen`, or push it.
    pub fn navigate_to(&mut self, screen: Screen) {
        self.ensure_navigation();
        match self.nav_stack.iter().rposition(|s| *s == screen) {
            Some(idx) => self.nav_stack.truncate(idx + 1),
            None => self.nav_stack.push(screen),
        }
    }

    pub fn zone_list(&self, variant: ZoneVariant) -> &ZoneListState {
        match variant {
            ZoneVariant::Safe => &self.safe_zone,
            ZoneVariant::Danger => &self.dangerous_zone,
        }
    }

    pub fn zone_list_mut(&mut self, variant: ZoneVariant) -> &mut ZoneListState {
        match variant {
            ZoneVariant::Safe => &mut self.safe_zone,
            ZoneVariant::Danger => &mut self.dangerous_zone,
        }
    }

    pub fn show_alert(&mut self, title: &str, message: &str, follow_up: AlertFollowUp) {
        self.alert = Some(AlertState {
            title: title.to_string(),
            message: message.to_string(),
            follow_up,
        });
    }

    pub fn take_effects(&mut self) -> Effects {
        std::mem::take(&mut self.effects)
    }

    /// Drop per-session screen state; navigation and settings survive.
    pub fn reset_runtime(&mut self) {
        self.last_error = None;
        self.alert = None;
        self.auth_form = AuthFormState::default();
        self.map = SelectionState::new(ZoneVariant::Safe);
        self.location_denied = false;
        self.safe_zone = ZoneListState::seeded();
        self.dangerous_zone = ZoneListState::seeded();
        self.effects = Effects::default();
    }
}
