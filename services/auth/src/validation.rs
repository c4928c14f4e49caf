//! Request validation for the user routes
//!
//! Each function checks one request body and returns the first failing
//! rule as a 422. Successful validation hands back the cleaned fields.

use common::{
    error::{ApiError, ApiResult},
    validation::{
        MISSING_CREDENTIALS, validate_email_address, validate_name, validate_password_pair,
    },
};

use crate::models::{
    LoginRequest, ResetPasswordRequest, SignupRequest, UpdateUserRequest, provided,
};

fn required(value: Option<String>) -> ApiResult<String> {
    provided(value).ok_or_else(|| ApiError::Validation(MISSING_CREDENTIALS.to_string()))
}

fn check(result: Result<(), &'static str>) -> ApiResult<()> {
    result.map_err(|message| ApiError::Validation(message.to_string()))
}

pub struct ValidSignup {
    pub name: String,
    pub email_address: String,
    pub password: String,
}

pub fn validate_signup(request: SignupRequest) -> ApiResult<ValidSignup> {
    let name = required(request.name)?;
    let email_address = required(request.email_address)?;
    let password = required(request.password)?;
    let confirm_password = required(request.confirm_password)?;

    check(validate_name(&name))?;
    check(validate_email_address(&email_address))?;
    check(validate_password_pair(&password, &confirm_password))?;

    Ok(ValidSignup {
        name: name.trim().to_string(),
        email_address,
        password,
    })
}

pub struct ValidLogin {
    pub email_address: String,
    pub password: String,
}

pub fn validate_login(request: LoginRequest) -> ApiResult<ValidLogin> {
    let email_address = required(request.email_address)?;
    let password = required(request.password)?;

    check(validate_email_address(&email_address))?;

    Ok(ValidLogin {
        email_address,
        password,
    })
}

pub struct ValidReset {
    pub email_address: String,
    /// `None` when the password was left empty
    pub password: Option<String>,
}

pub fn validate_reset(request: ResetPasswordRequest) -> ApiResult<ValidReset> {
    let email_address = required(request.email_address)?;
    check(validate_email_address(&email_address))?;

    let password = match request.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            let confirm = request.confirm_password.unwrap_or_default();
            check(validate_password_pair(&password, &confirm))?;
            Some(password)
        }
        None => None,
    };

    Ok(ValidReset {
        email_address,
        password,
    })
}

pub struct ValidUpdate {
    pub name: Option<String>,
    pub email_address: Option<String>,
    pub password: Option<String>,
}

pub fn validate_update(request: UpdateUserRequest) -> ApiResult<ValidUpdate> {
    let name = provided(request.name);
    let email_address = provided(request.email_address);
    let password = provided(request.password);

    if let Some(name) = &name {
        check(validate_name(name))?;
    }
    if let Some(email_address) = &email_address {
        check(validate_email_address(email_address))?;
    }
    if let Some(password) = &password {
        let confirm = request.confirm_password.unwrap_or_default();
        check(validate_password_pair(password, &confirm))?;
    }

    Ok(ValidUpdate {
        name: name.map(|n| n.trim().to_string()),
        email_address,
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::validation::{INVALID_EMAIL_ADDRESS, INVALID_NAME, PASSWORD_MISMATCH};

    fn message(result: ApiResult<impl Sized>) -> String {
        match result {
            Err(ApiError::Validation(message)) => message,
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("expected a validation error"),
        }
    }

    fn signup(name: &str, email: &str, password: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            name: Some(name.to_string()),
            email_address: Some(email.to_string()),
            password: Some(password.to_string()),
            confirm_password: Some(confirm.to_string()),
        }
    }

    #[test]
    fn test_signup_rules_in_order() {
        assert_eq!(
            message(validate_signup(signup("", "a@b.com", "Aa1!aaaa", "Aa1!aaaa"))),
            MISSING_CREDENTIALS
        );
        assert_eq!(
            message(validate_signup(signup("J4ne", "bad", "x", "y"))),
            INVALID_NAME
        );
        assert_eq!(
            message(validate_signup(signup("Jane", "bad", "x", "y"))),
            INVALID_EMAIL_ADDRESS
        );
        assert_eq!(
            message(validate_signup(signup("Jane", "a@b.com", "Aa1!aaaa", "Aa1!aaab"))),
            PASSWORD_MISMATCH
        );
        assert!(validate_signup(signup("Jane", "a@b.com", "Aa1!aaaa", "Aa1!aaaa")).is_ok());
    }

    #[test]
    fn test_reset_with_empty_password_is_allowed() {
        let valid = validate_reset(ResetPasswordRequest {
            email_address: Some("a@b.com".to_string()),
            password: Some(String::new()),
            confirm_password: None,
        })
        .unwrap();
        assert!(valid.password.is_none());
    }

    #[test]
    fn test_update_ignores_blank_fields() {
        let valid = validate_update(UpdateUserRequest {
            name: Some("  ".to_string()),
            email_address: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(valid.name.is_none() && valid.email_address.is_none() && valid.password.is_none());

        let invalid = validate_update(UpdateUserRequest {
            name: Some("J4ne".to_string()),
            ..Default::default()
        });
        assert_eq!(message(invalid), INVALID_NAME);
    }
}
