//! Four-state signup flow: email → otp → password → success.
//!
//! Transitions move strictly forward on the success of each step, with one
//! back-edge (cancelling the OTP step returns to the email form). A guard
//! or request failure keeps the flow in place with the error recorded.

use super::ApiClient;
use crate::error::friendly_message;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    Email,
    Otp,
    Password,
    Success,
}

pub struct SignupFlow {
    api: ApiClient,
    step: SignupStep,
    email: String,
    error: Option<String>,
}

impl SignupFlow {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            step: SignupStep::Email,
            email: String::new(),
            error: None,
        }
    }

    pub fn step(&self) -> SignupStep {
        self.step
    }

    /// The address the flow is verifying (lowercased after the email step).
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Email step: validates the shape, requests an OTP, advances to `Otp`.
    pub async fn submit_email(&mut self, email: &str) -> Result<(), String> {
        if self.step != SignupStep::Email {
            return Err(self.keep("Not on the email step"));
        }
        self.error = None;
        if !validate::valid_email(email) {
            return Err(self.keep("Please enter a valid email"));
        }

        match self.api.signup(email).await {
            Ok(_) => {
                self.email = email.to_lowercase();
                self.step = SignupStep::Otp;
                Ok(())
            }
            Err(e) => Err(self.keep(friendly_message(&e.message))),
        }
    }

    /// OTP step: requires exactly six digits, verifies, advances to `Password`.
    pub async fn submit_otp(&mut self, code: &str) -> Result<(), String> {
        if self.step != SignupStep::Otp {
            return Err(self.keep("Not on the OTP step"));
        }
        self.error = None;
        if !validate::valid_otp(code) {
            return Err(self.keep("Please enter a valid 6-digit OTP"));
        }

        match self.api.verify_otp(&self.email, code).await {
            Ok(_) => {
                self.step = SignupStep::Password;
                Ok(())
            }
            Err(e) => Err(self.keep(friendly_message(&e.message))),
        }
    }

    /// The one defined back-edge: abandon OTP entry and re-enter the email.
    pub fn cancel_otp(&mut self) {
        if self.step == SignupStep::Otp {
            self.step = SignupStep::Email;
            self.error = None;
        }
    }

    /// Password step: confirmation must match and the policy must hold.
    /// Every failing policy rule is reported together, not just the first.
    pub async fn submit_password(&mut self, password: &str, confirm: &str) -> Result<(), String> {
        if self.step != SignupStep::Password {
            return Err(self.keep("Not on the password step"));
        }
        self.error = None;
        if password.is_empty() {
            return Err(self.keep("Password is required"));
        }
        if password != confirm {
            return Err(self.keep("Passwords do not match"));
        }
        let violations = validate::password_violations(password);
        if !violations.is_empty() {
            return Err(self.keep(violations.join("; ")));
        }

        match self.api.set_password(&self.email, password).await {
            Ok(_) => {
                self.step = SignupStep::Success;
                Ok(())
            }
            Err(e) => Err(self.keep(friendly_message(&e.message))),
        }
    }

    fn keep(&mut self, message: impl Into<String>) -> String {
        let message = message.into();
        self.error = Some(message.clone());
        message
    }

    #[cfg(test)]
    pub(crate) fn at_step(api: ApiClient, step: SignupStep, email: &str) -> Self {
        Self {
            api,
            step,
            email: email.to_string(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_api() -> ApiClient {
        // Guards reject before any request, so the address is never dialed.
        ApiClient::new("http://127.0.0.1:9").unwrap()
    }

    #[tokio::test]
    async fn email_guard_rejects_bad_shape_and_stays_put() {
        let mut flow = SignupFlow::new(offline_api());
        let err = flow.submit_email("not-an-email").await.unwrap_err();
        assert_eq!(err, "Please enter a valid email");
        assert_eq!(flow.step(), SignupStep::Email);
        assert_eq!(flow.error(), Some("Please enter a valid email"));
    }

    #[tokio::test]
    async fn otp_guard_rejects_short_and_non_digit_codes() {
        let mut flow = SignupFlow::at_step(offline_api(), SignupStep::Otp, "you@example.com");

        let err = flow.submit_otp("12345").await.unwrap_err();
        assert_eq!(err, "Please enter a valid 6-digit OTP");
        assert_eq!(flow.step(), SignupStep::Otp);

        let err = flow.submit_otp("abcdef").await.unwrap_err();
        assert_eq!(err, "Please enter a valid 6-digit OTP");
        assert_eq!(flow.step(), SignupStep::Otp);
    }

    #[tokio::test]
    async fn cancel_otp_is_the_only_back_edge() {
        let mut flow = SignupFlow::at_step(offline_api(), SignupStep::Otp, "you@example.com");
        flow.cancel_otp();
        assert_eq!(flow.step(), SignupStep::Email);

        // Cancelling anywhere else is a no-op.
        let mut flow = SignupFlow::at_step(offline_api(), SignupStep::Password, "you@example.com");
        flow.cancel_otp();
        assert_eq!(flow.step(), SignupStep::Password);
    }

    #[tokio::test]
    async fn password_step_collects_every_policy_violation() {
        let mut flow = SignupFlow::at_step(offline_api(), SignupStep::Password, "you@example.com");
        let err = flow.submit_password("abc12345", "abc12345").await.unwrap_err();
        assert!(err.contains("uppercase"));
        assert!(err.contains("special character"));
        assert_eq!(flow.step(), SignupStep::Password);
    }

    #[tokio::test]
    async fn password_step_requires_matching_confirmation() {
        let mut flow = SignupFlow::at_step(offline_api(), SignupStep::Password, "you@example.com");
        let err = flow.submit_password("Abc123!@", "Abc123!#").await.unwrap_err();
        assert_eq!(err, "Passwords do not match");
        assert_eq!(flow.step(), SignupStep::Password);
    }

    #[tokio::test]
    async fn steps_cannot_be_skipped() {
        let mut flow = SignupFlow::new(offline_api());
        assert!(flow.submit_otp("123456").await.is_err());
        assert!(flow.submit_password("Abc123!@", "Abc123!@").await.is_err());
        assert_eq!(flow.step(), SignupStep::Email);
    }
}
