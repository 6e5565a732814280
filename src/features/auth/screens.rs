use super::client::{AuthClient, SignUpRequest};
use super::session::AuthContext;
use super::store::StoreError;
use super::validation::{self, FieldError};
use crate::state::{AlertFollowUp, AppState, Screen};
use crate::ui::{
    maybe_push_back, node, push_error, Button as UiButton, Column as UiColumn, Text as UiText,
    TextInput as UiTextInput, DANGER_COLOR, MUTED_COLOR, PRIMARY_COLOR,
};
use rust_i18n::t;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

fn binding<'a>(bindings: &'a HashMap<String, String>, key: &str) -> &'a str {
    bindings.get(key).map(String::as_str).unwrap_or("")
}

fn record(state: &mut AppState, key: &str, result: Result<(), FieldError>) {
    if let Err(e) = result {
        state
            .auth_form
            .field_errors
            .insert(key.to_string(), e.message());
    }
}

fn input<'a>(state: &'a AppState, key: &'a str, hint: &'a str) -> UiTextInput<'a> {
    let mut field = UiTextInput::new(key).hint(hint);
    if let Some(err) = state.auth_form.field_errors.get(key) {
        field = field.error(err);
    }
    field
}

pub fn render_onboard_screen(state: &AppState) -> Value {
    let brand = t!("auth.brand");
    let login = t!("auth.onboard.login");
    let create = t!("auth.onboard.create_account");
    let tagline = t!("auth.onboard.tagline");
    let mut children = vec![
        node(UiText::new(&brand).size(28.0).color(PRIMARY_COLOR)),
        node(
            UiButton::new(&login, "sign_in_screen")
                .id("onboard_login_btn")
                .color(PRIMARY_COLOR),
        ),
        node(UiButton::new(&create, "sign_up_screen").id("onboard_create_btn")),
        node(UiText::new(&tagline).size(14.0).color(MUTED_COLOR)),
    ];
    push_error(&mut children, state);
    node(UiColumn::new(children).padding(32).content_description("onboard"))
}

pub fn render_sign_in_screen(state: &AppState) -> Value {
    let title = t!("auth.sign_in.title");
    let email_hint = t!("auth.fields.email");
    let password_hint = t!("auth.fields.password");
    let forgot = t!("auth.sign_in.forgot");
    let submit = t!("auth.sign_in.submit");
    let no_account = t!("auth.sign_in.no_account");
    let verify = t!("auth.sign_in.verify_email");

    let mut children = vec![
        node(UiText::new(&title).size(24.0)),
        node(input(state, "sign_in_email", &email_hint).text(&state.auth_form.email)),
        node(input(state, "sign_in_password", &password_hint).secure(true)),
    ];
    if let Some(err) = &state.auth_form.sign_in_error {
        children.push(node(
            UiText::new(err)
                .size(14.0)
                .color(DANGER_COLOR)
                .content_description("sign_in_error"),
        ));
    }
    children.push(node(UiButton::new(&forgot, "forgot_password_screen").id("forgot_btn")));
    children.push(node(
        UiButton::new(&submit, "sign_in_submit")
            .id("sign_in_submit_btn")
            .color(PRIMARY_COLOR),
    ));
    children.push(node(UiButton::new(&no_account, "sign_up_screen").id("to_sign_up_btn")));
    children.push(node(UiButton::new(&verify, "send_email_screen").id("to_send_email_btn")));
    push_error(&mut children, state);
    maybe_push_back(&mut children, state);
    node(UiColumn::new(children).padding(24).content_description("sign_in"))
}

pub fn render_sign_up_screen(state: &AppState) -> Value {
    let title = t!("auth.sign_up.title");
    let name_hint = t!("auth.fields.name");
    let email_hint = t!("auth.fields.email");
    let phone_hint = t!("auth.fields.phone");
    let password_hint = t!("auth.fields.password");
    let confirm_hint = t!("auth.fields.confirm_password");
    let submit = t!("auth.sign_up.submit");
    let have_account = t!("auth.sign_up.have_account");

    let form = &state.auth_form;
    let mut children = vec![
        node(UiText::new(&title).size(20.0)),
        node(input(state, "sign_up_name", &name_hint).text(&form.name)),
        node(input(state, "sign_up_email", &email_hint).text(&form.email)),
        node(input(state, "sign_up_phone", &phone_hint).text(&form.phone)),
        node(input(state, "sign_up_password", &password_hint).secure(true)),
        node(input(state, "sign_up_confirm_password", &confirm_hint).secure(true)),
        node(
            UiButton::new(&submit, "sign_up_submit")
                .id("sign_up_submit_btn")
                .color(PRIMARY_COLOR),
        ),
        node(UiButton::new(&have_account, "sign_in_screen").id("to_sign_in_btn")),
    ];
    push_error(&mut children, state);
    maybe_push_back(&mut children, state);
    node(UiColumn::new(children).padding(24).content_description("sign_up"))
}

pub fn render_send_email_screen(state: &AppState) -> Value {
    let title = t!("auth.send_email.title");
    let subtitle = t!("auth.send_email.subtitle");
    let email_hint = t!("auth.fields.email");
    let submit = t!("auth.common.continue");

    let mut children = vec![
        node(UiText::new(&title).size(20.0)),
        node(UiText::new(&subtitle).size(14.0)),
        node(input(state, "send_email_email", &email_hint).text(&state.auth_form.email)),
        node(
            UiButton::new(&submit, "send_email_submit")
                .id("send_email_submit_btn")
                .color(PRIMARY_COLOR),
        ),
    ];
    push_error(&mut children, state);
    maybe_push_back(&mut children, state);
    node(UiColumn::new(children).padding(24).content_description("send_email"))
}

pub fn render_confirm_otp_screen(state: &AppState) -> Value {
    let title = t!("auth.confirm_otp.title");
    let instructions = t!("auth.confirm_otp.instructions");
    let submit = t!("auth.common.continue");
    let resend = t!("auth.confirm_otp.resend");
    // A new generation tells the host to drop whatever was typed.
    let otp_key = format!("otp_input_{}", state.auth_form.otp_generation);

    let mut children = vec![
        node(UiText::new(&title).size(20.0)),
        node(
            UiColumn::new(vec![node(
                input(state, "otp_code", "0000").text(""),
            )])
            .content_description(&otp_key),
        ),
        node(UiText::new(&instructions).size(14.0)),
        node(
            UiButton::new(&submit, "confirm_otp_submit")
                .id("confirm_otp_submit_btn")
                .color(PRIMARY_COLOR),
        ),
        node(UiButton::new(&resend, "confirm_otp_resend").id("confirm_otp_resend_btn")),
    ];
    push_error(&mut children, state);
    maybe_push_back(&mut children, state);
    node(UiColumn::new(children).padding(24).content_description("confirm_otp"))
}

pub fn render_forgot_password_screen(state: &AppState) -> Value {
    let title = t!("auth.forgot_password.title");
    let description = t!("auth.forgot_password.description");
    let email_hint = t!("auth.fields.email");
    let submit = t!("auth.forgot_password.submit");

    let mut children = vec![
        node(UiText::new(&title).size(20.0)),
        node(UiText::new(&description).size(14.0)),
        node(input(state, "forgot_email", &email_hint)),
        node(
            UiButton::new(&submit, "forgot_password_submit")
                .id("forgot_password_submit_btn")
                .color(PRIMARY_COLOR),
        ),
    ];
    push_error(&mut children, state);
    maybe_push_back(&mut children, state);
    node(UiColumn::new(children).padding(24).content_description("forgot_password"))
}

/// Validate credentials, call the backend, and log in on success. Failures
/// stay inline on the screen.
pub fn handle_sign_in(
    state: &mut AppState,
    auth: &mut AuthContext,
    client: &AuthClient,
    bindings: &HashMap<String, String>,
) -> Result<(), StoreError> {
    let email = binding(bindings, "sign_in_email").trim().to_string();
    let password = binding(bindings, "sign_in_password").to_string();
    state.auth_form.field_errors.clear();
    state.auth_form.sign_in_error = None;
    state.auth_form.email = email.clone();
    auth.clear_error();

    record(state, "sign_in_email", validation::email(&email));
    if password.is_empty() {
        record(state, "sign_in_password", Err(FieldError::PasswordRequired));
    }
    if !state.auth_form.field_errors.is_empty() {
        return Ok(());
    }

    auth.set_loading(true);
    let result = client.sign_in(&email, &password);
    auth.set_loading(false);
    match result {
        Ok(payload) => {
            info!(user = %payload.user.email, "signed in");
            auth.login(payload.user, payload.session)?;
            state.auth_form = Default::default();
            state.reset_navigation(Screen::Home);
        }
        Err(e) => {
            warn!(error = %e, "sign in failed");
            let message = e.user_message(&t!("auth.errors.sign_in_failed"));
            auth.set_error(Some(message.clone()));
            state.auth_form.sign_in_error = Some(message);
        }
    }
    Ok(())
}

pub fn handle_sign_up(state: &mut AppState, client: &AuthClient, bindings: &HashMap<String, String>) {
    let name = binding(bindings, "sign_up_name").trim().to_string();
    let email = binding(bindings, "sign_up_email").trim().to_string();
    let phone = binding(bindings, "sign_up_phone").trim().to_string();
    let password = binding(bindings, "sign_up_password");
    let confirm = binding(bindings, "sign_up_confirm_password");
    state.auth_form.field_errors.clear();
    state.auth_form.name = name.clone();
    state.auth_form.email = email.clone();
    state.auth_form.phone = phone.clone();

    record(state, "sign_up_name", validation::name(&name));
    record(state, "sign_up_email", validation::email(&email));
    record(state, "sign_up_phone", validation::phone(&phone));
    record(state, "sign_up_password", validation::password(password));
    record(
        state,
        "sign_up_confirm_password",
        validation::confirmation(password, confirm),
    );
    if !state.auth_form.field_errors.is_empty() {
        return;
    }

    let request = SignUpRequest {
        name: &name,
        email: &email,
        phone: &phone,
        password,
    };
    match client.sign_up(&request) {
        Ok(_) => {
            info!(%email, "account created");
            state.show_alert(
                &t!("alerts.success_title"),
                &t!("auth.sign_up.success"),
                AlertFollowUp::Push(Screen::SignIn),
            );
        }
        Err(e) => {
            warn!(error = %e, "sign up failed");
            let message = e.user_message(&t!("auth.errors.sign_up_failed"));
            state.show_alert(&t!("alerts.error_title"), &message, AlertFollowUp::Stay);
        }
    }
}

pub fn handle_send_email(
    state: &mut AppState,
    client: &AuthClient,
    bindings: &HashMap<String, String>,
) {
    let email = binding(bindings, "send_email_email").trim().to_string();
    state.auth_form.field_errors.clear();
    state.auth_form.email = email.clone();
    record(state, "send_email_email", validation::email(&email));
    if !state.auth_form.field_errors.is_empty() {
        return;
    }

    match client.send_verification_otp(&email) {
        Ok(()) => {
            state.auth_form.otp_email = Some(email);
            state.auth_form.otp_generation += 1;
            state.auth_form.otp_verified = false;
            state.push_screen(Screen::ConfirmOtp);
        }
        Err(e) => {
            warn!(error = %e, "verification code request failed");
            let message = e.user_message(&t!("auth.errors.send_email_failed"));
            state.show_alert(&t!("alerts.error_title"), &message, AlertFollowUp::Stay);
        }
    }
}

/// Verify the emailed code. A valid code logs the user in; a rejected one
/// raises an alert that clears the input when dismissed.
pub fn handle_confirm_otp(
    state: &mut AppState,
    auth: &mut AuthContext,
    client: &AuthClient,
    bindings: &HashMap<String, String>,
) -> Result<(), StoreError> {
    let code = binding(bindings, "otp_code").trim().to_string();
    state.auth_form.field_errors.clear();
    record(state, "otp_code", validation::otp(&code));
    if !state.auth_form.field_errors.is_empty() {
        return Ok(());
    }

    let Some(email) = state.auth_form.otp_email.clone() else {
        state.push_screen(Screen::SendEmail);
        return Ok(());
    };

    auth.set_loading(true);
    let result = client.verify_email(&email, &code);
    auth.set_loading(false);
    match result {
        Ok(payload) => {
            auth.login(payload.user, payload.session)?;
            state.auth_form.otp_verified = true;
            state.show_alert(
                &t!("auth.confirm_otp.success_title"),
                &t!("auth.confirm_otp.success_message"),
                AlertFollowUp::Push(Screen::Home),
            );
        }
        Err(e) => {
            warn!(error = %e, "otp verification failed");
            let message = e.user_message(&t!("auth.errors.otp_invalid"));
            state.show_alert(&t!("alerts.error_title"), &message, AlertFollowUp::ResetOtp);
        }
    }
    Ok(())
}

pub fn handle_resend_otp(state: &mut AppState, client: &AuthClient) {
    let Some(email) = state.auth_form.otp_email.clone() else {
        state.push_screen(Screen::SendEmail);
        return;
    };
    match client.send_verification_otp(&email) {
        Ok(()) => reset_otp(state),
        Err(e) => {
            warn!(error = %e, "verification code resend failed");
            let message = e.user_message(&t!("auth.errors.send_email_failed"));
            state.show_alert(&t!("alerts.error_title"), &message, AlertFollowUp::ResetOtp);
        }
    }
}

pub fn reset_otp(state: &mut AppState) {
    state.auth_form.otp_generation += 1;
    state.auth_form.field_errors.remove("otp_code");
}

/// No recovery endpoint exists yet; a valid address is acknowledged locally.
pub fn handle_forgot_password(state: &mut AppState, bindings: &HashMap<String, String>) {
    let email = binding(bindings, "forgot_email").trim().to_string();
    state.auth_form.field_errors.clear();
    record(state, "forgot_email", validation::email(&email));
    if !state.auth_form.field_errors.is_empty() {
        return;
    }
    state.show_alert(
        &t!("alerts.success_title"),
        &t!("auth.forgot_password.success"),
        AlertFollowUp::Back,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::features::auth::client::mock::{auth_body, MockTransport};
    use crate::features::auth::client::AuthError;
    use crate::features::auth::store::SqliteStore;
    use chrono::Utc;
    use serde_json::json;

    fn setup(responses: Vec<Result<Value, AuthError>>) -> (AppState, AuthContext, AuthClient) {
        rust_i18n::set_locale("pt");
        let mut state = AppState::new(&CoreConfig::default());
        state.push_screen(Screen::SignIn);
        let auth = AuthContext::init(Box::new(SqliteStore::in_memory().unwrap()), Utc::now());
        let (transport, _) = MockTransport::with(responses);
        (state, auth, AuthClient::new(Box::new(transport)))
    }

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sign_in_success_logs_in_and_goes_home() {
        let (mut state, mut auth, client) = setup(vec![Ok(auth_body("2099-01-01T00:00:00Z"))]);
        let b = bindings(&[("sign_in_email", "ana@example.org"), ("sign_in_password", "x")]);
        handle_sign_in(&mut state, &mut auth, &client, &b).unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(state.nav_stack, vec![Screen::Home]);
        assert!(!auth.is_loading());
    }

    #[test]
    fn sign_in_failure_shows_server_message_inline() {
        let (mut state, mut auth, client) = setup(vec![Err(AuthError::Server {
            status: 401,
            message: Some("Invalid email or password".into()),
        })]);
        let b = bindings(&[("sign_in_email", "ana@example.org"), ("sign_in_password", "x")]);
        handle_sign_in(&mut state, &mut auth, &client, &b).unwrap();
        assert!(!auth.is_authenticated());
        assert_eq!(
            state.auth_form.sign_in_error.as_deref(),
            Some("Invalid email or password")
        );
        assert_eq!(state.current_screen(), Screen::SignIn);
    }

    #[test]
    fn sign_in_network_failure_uses_fallback() {
        let (mut state, mut auth, client) =
            setup(vec![Err(AuthError::Network("offline".into()))]);
        let b = bindings(&[("sign_in_email", "ana@example.org"), ("sign_in_password", "x")]);
        handle_sign_in(&mut state, &mut auth, &client, &b).unwrap();
        assert_eq!(
            state.auth_form.sign_in_error.as_deref(),
            Some("Não foi possível fazer login. Tente novamente.")
        );
        assert_eq!(auth.error(), state.auth_form.sign_in_error.as_deref());
    }

    #[test]
    fn invalid_sign_up_never_reaches_backend() {
        let (mut state, _auth, client) = setup(vec![]);
        let b = bindings(&[
            ("sign_up_name", "A"),
            ("sign_up_email", "bad"),
            ("sign_up_phone", "123"),
            ("sign_up_password", "short"),
            ("sign_up_confirm_password", "other"),
        ]);
        handle_sign_up(&mut state, &client, &b);
        assert_eq!(state.auth_form.field_errors.len(), 5);
        assert!(state.alert.is_none());
    }

    #[test]
    fn sign_up_success_alert_leads_to_sign_in() {
        let (mut state, _auth, client) = setup(vec![Ok(json!({ "data": {} }))]);
        let b = bindings(&[
            ("sign_up_name", "Ana Sitoe"),
            ("sign_up_email", "ana@example.org"),
            ("sign_up_phone", "845279970"),
            ("sign_up_password", "Segura123"),
            ("sign_up_confirm_password", "Segura123"),
        ]);
        handle_sign_up(&mut state, &client, &b);
        let alert = state.alert.clone().unwrap();
        assert_eq!(alert.follow_up, AlertFollowUp::Push(Screen::SignIn));
        assert_eq!(alert.message, "Conta criada com sucesso!");
    }

    #[test]
    fn otp_flow_logs_in_after_verification() {
        let (mut state, mut auth, client) = setup(vec![
            Ok(json!({ "success": true })),
            Ok(auth_body("2099-01-01T00:00:00Z")),
        ]);
        handle_send_email(&mut state, &client, &bindings(&[("send_email_email", "ana@example.org")]));
        assert_eq!(state.current_screen(), Screen::ConfirmOtp);
        assert_eq!(state.auth_form.otp_email.as_deref(), Some("ana@example.org"));

        handle_confirm_otp(&mut state, &mut auth, &client, &bindings(&[("otp_code", "1234")])).unwrap();
        assert!(auth.is_authenticated());
        assert!(state.auth_form.otp_verified);
        assert_eq!(
            state.alert.as_ref().map(|a| a.follow_up),
            Some(AlertFollowUp::Push(Screen::Home))
        );
    }

    #[test]
    fn rejected_otp_alert_resets_input() {
        let (mut state, mut auth, client) = setup(vec![Err(AuthError::Server {
            status: 400,
            message: None,
        })]);
        state.auth_form.otp_email = Some("ana@example.org".into());
        handle_confirm_otp(&mut state, &mut auth, &client, &bindings(&[("otp_code", "9999")])).unwrap();
        let alert = state.alert.clone().unwrap();
        assert_eq!(alert.message, "Código inválido. Tente novamente.");
        assert_eq!(alert.follow_up, AlertFollowUp::ResetOtp);
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn short_otp_is_rejected_locally() {
        let (mut state, mut auth, client) = setup(vec![]);
        state.auth_form.otp_email = Some("ana@example.org".into());
        handle_confirm_otp(&mut state, &mut auth, &client, &bindings(&[("otp_code", "12")])).unwrap();
        assert!(state.auth_form.field_errors.contains_key("otp_code"));
        assert!(state.alert.is_none());
    }

    #[test]
    fn forgot_password_acknowledges_and_goes_back() {
        let (mut state, _auth, _client) = setup(vec![]);
        handle_forgot_password(&mut state, &bindings(&[("forgot_email", "ana@example.org")]));
        assert_eq!(
            state.alert.as_ref().map(|a| a.follow_up),
            Some(AlertFollowUp::Back)
        );
    }
}
