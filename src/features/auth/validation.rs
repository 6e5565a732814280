//! Field rules for the account forms.

use rust_i18n::t;

pub const OTP_LENGTH: usize = 4;
const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const PHONE_LEN: usize = 9;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    EmailRequired,
    EmailInvalid,
    NameTooShort,
    NameTooLong,
    NameInvalid,
    PhoneLength,
    PhoneInvalid,
    PasswordRequired,
    PasswordTooShort,
    PasswordWeak,
    ConfirmRequired,
    PasswordMismatch,
    OtpInvalid,
}

impl FieldError {
    pub fn message(self) -> String {
        let text = match self {
            FieldError::EmailRequired => t!("auth.validation.email_required"),
            FieldError::EmailInvalid => t!("auth.validation.email_invalid"),
            FieldError::NameTooShort => t!("auth.validation.name_too_short"),
            FieldError::NameTooLong => t!("auth.validation.name_too_long"),
            FieldError::NameInvalid => t!("auth.validation.name_invalid"),
            FieldError::PhoneLength => t!("auth.validation.phone_length"),
            FieldError::PhoneInvalid => t!("auth.validation.phone_invalid"),
            FieldError::PasswordRequired => t!("auth.validation.password_required"),
            FieldError::PasswordTooShort => t!("auth.validation.password_too_short"),
            FieldError::PasswordWeak => t!("auth.validation.password_weak"),
            FieldError::ConfirmRequired => t!("auth.validation.confirm_required"),
            FieldError::PasswordMismatch => t!("auth.validation.password_mismatch"),
            FieldError::OtpInvalid => t!("auth.validation.otp_invalid"),
        };
        text.to_string()
    }
}

pub fn email(raw: &str) -> Result<(), FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::EmailRequired);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(FieldError::EmailInvalid);
    }
    let (local, domain) = value.split_once('@').ok_or(FieldError::EmailInvalid)?;
    let domain_ok = domain.contains('.')
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");
    if local.is_empty() || !domain_ok {
        return Err(FieldError::EmailInvalid);
    }
    Ok(())
}

pub fn name(raw: &str) -> Result<(), FieldError> {
    let count = raw.chars().count();
    if count < NAME_MIN {
        return Err(FieldError::NameTooShort);
    }
    if count > NAME_MAX {
        return Err(FieldError::NameTooLong);
    }
    if !raw.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return Err(FieldError::NameInvalid);
    }
    Ok(())
}

/// Local mobile numbers: nine characters, optional leading `+`, no leading zero.
pub fn phone(raw: &str) -> Result<(), FieldError> {
    if raw.chars().count() != PHONE_LEN {
        return Err(FieldError::PhoneLength);
    }
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    let mut chars = digits.chars();
    let leading_ok = matches!(chars.next(), Some('1'..='9'));
    if !leading_ok || !chars.all(|c| c.is_ascii_digit()) {
        return Err(FieldError::PhoneInvalid);
    }
    Ok(())
}

pub fn password(raw: &str) -> Result<(), FieldError> {
    if raw.is_empty() {
        return Err(FieldError::PasswordRequired);
    }
    if raw.chars().count() < PASSWORD_MIN {
        return Err(FieldError::PasswordTooShort);
    }
    let lower = raw.chars().any(|c| c.is_ascii_lowercase());
    let upper = raw.chars().any(|c| c.is_ascii_uppercase());
    let digit = raw.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        return Err(FieldError::PasswordWeak);
    }
    Ok(())
}

pub fn confirmation(password: &str, confirm: &str) -> Result<(), FieldError> {
    if confirm.is_empty() {
        return Err(FieldError::ConfirmRequired);
    }
    if password != confirm {
        return Err(FieldError::PasswordMismatch);
    }
    Ok(())
}

pub fn otp(raw: &str) -> Result<(), FieldError> {
    let code = raw.trim();
    if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::OtpInvalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert_eq!(email(""), Err(FieldError::EmailRequired));
        assert_eq!(email("ana"), Err(FieldError::EmailInvalid));
        assert_eq!(email("ana@host"), Err(FieldError::EmailInvalid));
        assert_eq!(email("@host.org"), Err(FieldError::EmailInvalid));
        assert_eq!(email("a na@host.org"), Err(FieldError::EmailInvalid));
        assert_eq!(email(" ana@example.org "), Ok(()));
    }

    #[test]
    fn name_accepts_accented_letters_and_spaces() {
        assert_eq!(name("João Mabunda"), Ok(()));
        assert_eq!(name("A"), Err(FieldError::NameTooShort));
        assert_eq!(name("R2D2"), Err(FieldError::NameInvalid));
        assert_eq!(name(&"a".repeat(51)), Err(FieldError::NameTooLong));
    }

    #[test]
    fn phone_is_nine_characters() {
        assert_eq!(phone("845279970"), Ok(()));
        assert_eq!(phone("84527997"), Err(FieldError::PhoneLength));
        assert_eq!(phone("045279970"), Err(FieldError::PhoneInvalid));
        assert_eq!(phone("84527997a"), Err(FieldError::PhoneInvalid));
        assert_eq!(phone("+84527997"), Ok(()));
    }

    #[test]
    fn password_needs_mixed_case_and_digit() {
        assert_eq!(password(""), Err(FieldError::PasswordRequired));
        assert_eq!(password("Ab1"), Err(FieldError::PasswordTooShort));
        assert_eq!(password("abcdefgh1"), Err(FieldError::PasswordWeak));
        assert_eq!(password("Abcdefgh1"), Ok(()));
        assert_eq!(confirmation("Abcdefgh1", ""), Err(FieldError::ConfirmRequired));
        assert_eq!(
            confirmation("Abcdefgh1", "Abcdefgh2"),
            Err(FieldError::PasswordMismatch)
        );
    }

    #[test]
    fn otp_is_four_digits() {
        assert_eq!(otp("1234"), Ok(()));
        assert_eq!(otp("123"), Err(FieldError::OtpInvalid));
        assert_eq!(otp("12a4"), Err(FieldError::OtpInvalid));
    }
}
