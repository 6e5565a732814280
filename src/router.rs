use crate::config::{CoreConfig, RawConfig};
use crate::error::CoreError;
use crate::features::auth::screens::{
    handle_confirm_otp, handle_forgot_password, handle_resend_otp, handle_send_email,
    handle_sign_in, handle_sign_up, render_confirm_otp_screen, render_forgot_password_screen,
    render_onboard_screen, render_send_email_screen, render_sign_in_screen,
    render_sign_up_screen, reset_otp,
};
use crate::features::auth::{AuthClient, AuthContext, SessionStore, SqliteStore};
use crate::features::map::controls::{cancel, confirm};
use crate::features::map::render_map_screen;
use crate::features::map::selection::{ApplyOutcome, SelectionState};
use crate::features::misc_screens::{error_ui, render_alert, render_home_screen};
use crate::features::zones::{
    close_form, open_form, render_zone_screen, save_form, FormError, MediaAttachment,
};
use crate::i18n::update_locale;
use crate::logging::init_logging;
use crate::state::{AlertFollowUp, AppState, Screen, ZoneVariant};
use chrono::{DateTime, Local, Utc};
use rust_i18n::t;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

static CORE: Mutex<Option<Core>> = Mutex::new(None);

#[derive(Debug, Default, Deserialize)]
pub struct Command {
    pub action: String,
    pub bindings: Option<HashMap<String, String>>,
    pub payload: Option<String>,
    pub variant: Option<String>,
    pub media: Option<Vec<MediaAttachment>>,
    pub config: Option<RawConfig>,
    pub snapshot: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug)]
enum Action {
    Reset,
    Back,
    Noop,
    Snapshot,
    Restore { snapshot: String },
    SetLocale { locale: String },
    DismissAlert,
    CheckSession,
    Logout,
    SignInScreen,
    SignUpScreen,
    SendEmailScreen,
    ForgotPasswordScreen,
    SignInSubmit { bindings: HashMap<String, String> },
    SignUpSubmit { bindings: HashMap<String, String> },
    SendEmailSubmit { bindings: HashMap<String, String> },
    ConfirmOtpSubmit { bindings: HashMap<String, String> },
    ConfirmOtpResend,
    ForgotPasswordSubmit { bindings: HashMap<String, String> },
    ZoneScreen(ZoneVariant),
    MapScreen(ZoneVariant),
    MapMessage { payload: String },
    MapCancel,
    MapMark,
    AreaFormOpen { variant: Option<ZoneVariant> },
    AreaFormToggle {
        key: String,
        bindings: HashMap<String, String>,
    },
    AreaFormMedia {
        media: Vec<MediaAttachment>,
        bindings: HashMap<String, String>,
    },
    AreaFormSave { bindings: HashMap<String, String> },
    AreaFormClose,
}

fn parse_action(command: Command) -> Result<Action, CoreError> {
    let Command {
        action,
        bindings,
        payload,
        variant,
        media,
        snapshot,
        locale,
        ..
    } = command;
    let bindings = bindings.unwrap_or_default();
    let variant = variant.as_deref().and_then(ZoneVariant::parse);

    if let Some(key) = action.strip_prefix("area_form_toggle:") {
        return Ok(Action::AreaFormToggle {
            key: key.to_string(),
            bindings,
        });
    }

    match action.as_str() {
        "reset" => Ok(Action::Reset),
        "back" => Ok(Action::Back),
        "noop" => Ok(Action::Noop),
        "snapshot" => Ok(Action::Snapshot),
        "restore_state" => Ok(Action::Restore {
            snapshot: snapshot.ok_or(CoreError::Missing("snapshot"))?,
        }),
        "set_locale" => Ok(Action::SetLocale {
            locale: locale.ok_or(CoreError::Missing("locale"))?,
        }),
        "dismiss_alert" => Ok(Action::DismissAlert),
        "check_session" => Ok(Action::CheckSession),
        "logout" => Ok(Action::Logout),
        "sign_in_screen" => Ok(Action::SignInScreen),
        "sign_up_screen" => Ok(Action::SignUpScreen),
        "send_email_screen" => Ok(Action::SendEmailScreen),
        "forgot_password_screen" => Ok(Action::ForgotPasswordScreen),
        "sign_in_submit" => Ok(Action::SignInSubmit { bindings }),
        "sign_up_submit" => Ok(Action::SignUpSubmit { bindings }),
        "send_email_submit" => Ok(Action::SendEmailSubmit { bindings }),
        "confirm_otp_submit" => Ok(Action::ConfirmOtpSubmit { bindings }),
        "confirm_otp_resend" => Ok(Action::ConfirmOtpResend),
        "forgot_password_submit" => Ok(Action::ForgotPasswordSubmit { bindings }),
        "safe_zone_screen" => Ok(Action::ZoneScreen(ZoneVariant::Safe)),
        "dangerous_zone_screen" => Ok(Action::ZoneScreen(ZoneVariant::Danger)),
        "map_screen_safe" => Ok(Action::MapScreen(ZoneVariant::Safe)),
        "map_screen_danger" => Ok(Action::MapScreen(ZoneVariant::Danger)),
        "map_screen" => Ok(Action::MapScreen(
            variant.ok_or(CoreError::Missing("variant"))?,
        )),
        "map_message" => Ok(Action::MapMessage {
            payload: payload.ok_or(CoreError::Missing("payload"))?,
        }),
        "map_cancel" => Ok(Action::MapCancel),
        "map_mark" => Ok(Action::MapMark),
        "area_form_open" => Ok(Action::AreaFormOpen { variant }),
        "area_form_media" => Ok(Action::AreaFormMedia {
            media: media.unwrap_or_default(),
            bindings,
        }),
        "area_form_save" => Ok(Action::AreaFormSave { bindings }),
        "area_form_close" => Ok(Action::AreaFormClose),
        other => Err(CoreError::UnknownAction(other.to_string())),
    }
}

/// Everything one running app instance owns. Handlers receive its parts
/// explicitly.
pub struct Core {
    config: CoreConfig,
    state: AppState,
    auth: AuthContext,
    client: AuthClient,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("config", &self.config)
            .field("screen", &self.state.current_screen())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Core {
    pub fn init(config: CoreConfig) -> Result<Self, CoreError> {
        let store = SqliteStore::open(&config.session_db_path())?;
        let client = AuthClient::http(&config.api_base_url)?;
        info!(api = %config.api_base_url, data_dir = %config.data_dir.display(), "core init");
        Ok(Self::with_parts(config, Box::new(store), client, Utc::now()))
    }

    pub fn with_parts(
        config: CoreConfig,
        store: Box<dyn SessionStore>,
        client: AuthClient,
        now: DateTime<Utc>,
    ) -> Self {
        let auth = AuthContext::init(store, now);
        let mut state = AppState::new(&config);
        update_locale(&mut state, &config.locale);
        if auth.is_authenticated() {
            state.reset_navigation(Screen::Home);
        }
        Self {
            config,
            state,
            auth,
            client,
        }
    }

    pub fn teardown(self) -> Result<(), CoreError> {
        info!("core teardown");
        self.auth.teardown()?;
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn handle(&mut self, command: Command) -> Value {
        self.state.ensure_navigation();
        self.state.last_error = None;

        let action = match parse_action(command) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "rejected command");
                self.state.last_error = Some(e.code());
                return self.render();
            }
        };
        debug!(?action, "dispatch");

        match self.apply(action) {
            Ok(Some(direct)) => return direct,
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "action failed");
                self.state.last_error = Some(e.code());
            }
        }
        self.enforce_guard();
        self.render()
    }

    /// Returns `Some` for actions that answer with something other than
    /// the current screen.
    fn apply(&mut self, action: Action) -> Result<Option<Value>, CoreError> {
        let state = &mut self.state;
        match action {
            Action::Noop => {}
            Action::Reset => {
                state.reset_runtime();
                let root = if self.auth.is_authenticated() {
                    Screen::Home
                } else {
                    Screen::Onboard
                };
                state.reset_navigation(root);
            }
            Action::Back => {
                if state.current_screen() == Screen::Map {
                    state.map.clear_pick();
                }
                state.pop_screen();
            }
            Action::Snapshot => {
                let snapshot = serde_json::to_string(&*state)?;
                return Ok(Some(json!({
                    "type": "Snapshot",
                    "snapshot": snapshot
                })));
            }
            Action::Restore { snapshot } => {
                let mut restored: AppState = serde_json::from_str(&snapshot)?;
                restored.ensure_navigation();
                let locale = restored.locale.clone();
                *state = restored;
                update_locale(state, &locale);
            }
            Action::SetLocale { locale } => {
                update_locale(state, &locale);
                // The page embeds locale text, so the host reloads it.
                state.map.restart_sequence();
            }
            Action::DismissAlert => self.dismiss_alert(),
            Action::CheckSession => {
                if !self.auth.check_status(Utc::now())? {
                    state.reset_navigation(Screen::Onboard);
                }
            }
            Action::Logout => {
                self.auth.logout()?;
                state.reset_runtime();
                state.reset_navigation(Screen::Onboard);
            }
            Action::SignInScreen => {
                state.auth_form.field_errors.clear();
                state.auth_form.sign_in_error = None;
                state.push_screen(Screen::SignIn);
            }
            Action::SignUpScreen => {
                state.auth_form.field_errors.clear();
                state.push_screen(Screen::SignUp);
            }
            Action::SendEmailScreen => {
                state.auth_form.field_errors.clear();
                state.push_screen(Screen::SendEmail);
            }
            Action::ForgotPasswordScreen => {
                state.auth_form.field_errors.clear();
                state.push_screen(Screen::ForgotPassword);
            }
            Action::SignInSubmit { bindings } => {
                handle_sign_in(state, &mut self.auth, &self.client, &bindings)?;
            }
            Action::SignUpSubmit { bindings } => handle_sign_up(state, &self.client, &bindings),
            Action::SendEmailSubmit { bindings } => {
                handle_send_email(state, &self.client, &bindings)
            }
            Action::ConfirmOtpSubmit { bindings } => {
                handle_confirm_otp(state, &mut self.auth, &self.client, &bindings)?;
            }
            Action::ConfirmOtpResend => handle_resend_otp(state, &self.client),
            Action::ForgotPasswordSubmit { bindings } => handle_forgot_password(state, &bindings),
            Action::ZoneScreen(variant) => state.navigate_to(variant.screen()),
            Action::MapScreen(variant) => {
                state.map = SelectionState::new(variant);
                state.location_denied = false;
                state.push_screen(Screen::Map);
            }
            Action::MapMessage { payload } => match state.map.apply_raw(&payload) {
                Ok(ApplyOutcome::Applied(ops)) => debug!(ops = ops.len(), "channel message applied"),
                Ok(ApplyOutcome::Stale { seq, latest }) => {
                    debug!(seq, latest, "stale channel message ignored")
                }
                Ok(ApplyOutcome::PermissionDenied) => {
                    state.location_denied = true;
                    state.show_alert(
                        &t!("alerts.permission_denied_title"),
                        &t!("alerts.permission_denied_message"),
                        AlertFollowUp::Stay,
                    );
                }
                Err(e) => debug!(error = %e, "skipping channel message"),
            },
            Action::MapCancel => {
                let scripts = cancel(&mut state.map);
                state.effects.surface_scripts.extend(scripts);
                if state.current_screen() == Screen::Map {
                    state.pop_screen();
                }
            }
            Action::MapMark => {
                let navigation = confirm(&state.map)?;
                let variant = state.map.variant;
                info!(pathname = %navigation.pathname, name = %navigation.params.name, "area marked");
                if state.current_screen() == Screen::Map {
                    state.pop_screen();
                }
                state.navigate_to(variant.screen());
                if navigation.params.opens_modal() {
                    open_form(
                        state.zone_list_mut(variant),
                        variant,
                        Some(&navigation.params),
                        Local::now().naive_local(),
                    );
                }
                state.map = SelectionState::new(variant);
                state.effects.navigation = Some(navigation);
            }
            Action::AreaFormOpen { variant } => {
                let variant = form_variant(state, variant)?;
                state.navigate_to(variant.screen());
                open_form(
                    state.zone_list_mut(variant),
                    variant,
                    None,
                    Local::now().naive_local(),
                );
            }
            Action::AreaFormToggle { key, bindings } => {
                let variant = form_variant(state, None)?;
                if let Some(form) = state.zone_list_mut(variant).form.as_mut() {
                    form.apply_bindings(&bindings);
                    if form.toggle(&key).is_none() {
                        debug!(%key, "ignoring unknown characteristic");
                    }
                }
            }
            Action::AreaFormMedia { media, bindings } => {
                let variant = form_variant(state, None)?;
                if let Some(form) = state.zone_list_mut(variant).form.as_mut() {
                    form.apply_bindings(&bindings);
                    form.add_media(media);
                }
            }
            Action::AreaFormSave { bindings } => {
                let variant = form_variant(state, None)?;
                let list = state.zone_list_mut(variant);
                if let Some(form) = list.form.as_mut() {
                    form.apply_bindings(&bindings);
                }
                match save_form(list, variant) {
                    Ok(record) => debug!(id = %record.id, "area saved"),
                    Err(FormError::MissingDescription) => state.show_alert(
                        &t!("alerts.error_title"),
                        &t!("zones.form.missing_description"),
                        AlertFollowUp::Stay,
                    ),
                    Err(e) => state.last_error = Some(e.to_string()),
                }
            }
            Action::AreaFormClose => {
                let variant = form_variant(state, None)?;
                close_form(state.zone_list_mut(variant));
            }
        }
        Ok(None)
    }

    fn dismiss_alert(&mut self) {
        let Some(alert) = self.state.alert.take() else {
            return;
        };
        match alert.follow_up {
            AlertFollowUp::Stay => {}
            AlertFollowUp::Back => self.state.pop_screen(),
            AlertFollowUp::Push(Screen::Home) => self.state.reset_navigation(Screen::Home),
            AlertFollowUp::Push(screen) => self.state.push_screen(screen),
            AlertFollowUp::ResetOtp => reset_otp(&mut self.state),
        }
    }

    /// Protected screens require a session; signed-in users skip the
    /// account screens.
    fn enforce_guard(&mut self) {
        let screen = self.state.current_screen();
        let authenticated = self.auth.is_authenticated();
        if screen.is_protected() && !authenticated {
            debug!(?screen, "guard: not authenticated");
            self.state.reset_navigation(Screen::Onboard);
        } else if !screen.is_protected() && authenticated && self.state.alert.is_none() {
            debug!(?screen, "guard: already authenticated");
            self.state.reset_navigation(Screen::Home);
        }
    }

    fn render_screen(&self) -> Value {
        let state = &self.state;
        match state.current_screen() {
            Screen::Onboard => render_onboard_screen(state),
            Screen::SignIn => render_sign_in_screen(state),
            Screen::SignUp => render_sign_up_screen(state),
            Screen::SendEmail => render_send_email_screen(state),
            Screen::ConfirmOtp => render_confirm_otp_screen(state),
            Screen::ForgotPassword => render_forgot_password_screen(state),
            Screen::Home => render_home_screen(state, &self.auth),
            Screen::SafeZone => render_zone_screen(state, ZoneVariant::Safe),
            Screen::DangerousZone => render_zone_screen(state, ZoneVariant::Danger),
            Screen::Map => render_map_screen(state),
        }
    }

    /// Current screen plus the one-shot alert, scripts and navigation.
    pub fn render(&mut self) -> Value {
        let mut ui = self.render_screen();
        let effects = self.state.take_effects();
        if let Value::Object(map) = &mut ui {
            if let Some(alert) = &self.state.alert {
                map.insert("alert".into(), render_alert(alert));
            }
            if !effects.surface_scripts.is_empty() {
                map.insert("surface_scripts".into(), json!(effects.surface_scripts));
            }
            if let Some(navigation) = effects.navigation {
                map.insert(
                    "navigation".into(),
                    serde_json::to_value(navigation).unwrap_or(Value::Null),
                );
            }
        }
        ui
    }
}

/// Area form actions target the zone screen on top, unless the command
/// names a variant.
fn form_variant(state: &AppState, explicit: Option<ZoneVariant>) -> Result<ZoneVariant, CoreError> {
    if let Some(v) = explicit {
        return Ok(v);
    }
    match state.current_screen() {
        Screen::SafeZone => Ok(ZoneVariant::Safe),
        Screen::DangerousZone => Ok(ZoneVariant::Danger),
        _ => Err(CoreError::Missing("variant")),
    }
}

fn lock_core() -> MutexGuard<'static, Option<Core>> {
    match CORE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("core mutex poisoned; continuing with inner state");
            poisoned.into_inner()
        }
    }
}

/// Run one JSON command against the process-wide core and return the
/// JSON answer.
pub fn dispatch(input: &str) -> String {
    dispatch_value(input).to_string()
}

fn dispatch_value(input: &str) -> Value {
    let mut guard = lock_core();
    let command: Command = match serde_json::from_str(input) {
        Ok(command) => command,
        Err(e) => {
            let err = CoreError::from(e);
            warn!(error = %err, "malformed command");
            return match guard.as_mut() {
                Some(core) => {
                    core.state.last_error = Some(err.code());
                    core.render()
                }
                None => error_ui(&err.code()),
            };
        }
    };

    match command.action.as_str() {
        "init" => {
            init_logging();
            if let Some(previous) = guard.take() {
                if let Err(e) = previous.teardown() {
                    error!(error = %e, "teardown of previous core failed");
                }
            }
            let config = CoreConfig::resolve(command.config.unwrap_or_default());
            match Core::init(config) {
                Ok(mut core) => {
                    let ui = core.render();
                    *guard = Some(core);
                    ui
                }
                Err(e) => {
                    error!(error = %e, "core init failed");
                    error_ui(&e.code())
                }
            }
        }
        "teardown" => match guard.take() {
            Some(core) => match core.teardown() {
                Ok(()) => json!({ "type": "Teardown" }),
                Err(e) => error_ui(&e.code()),
            },
            None => json!({ "type": "Teardown" }),
        },
        _ => match guard.as_mut() {
            Some(core) => core.handle(command),
            None => error_ui(&CoreError::NotInitialized.code()),
        },
    }
}
