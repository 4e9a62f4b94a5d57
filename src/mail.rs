use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

pub trait Mailer: Send + Sync {
    /// # Errors
    /// Any delivery failure.
    fn send(&self, message: &Message) -> Result<(), MailError>;
}

/// Writes outgoing mail to the `devcamper::mail` log target instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &Message) -> Result<(), MailError> {
        log::info!(
            target: "devcamper::mail",
            "to={} subject={:?} text={:?}",
            message.to,
            message.subject,
            message.text
        );
        Ok(())
    }
}
