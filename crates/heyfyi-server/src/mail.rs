//! Outbound email for the server.
//!
//! [`ServerMailer`] sends through SMTP when an `[smtp]` section is
//! configured, and otherwise writes each email to the log so development
//! setups still see verification and reset links.

use heyfyi_core::notify::Mailer;
use lettre::{
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
  #[error("SMTP transport error: {0}")]
  Transport(#[from] lettre::transport::smtp::Error),

  #[error("email address parse error: {0}")]
  Address(#[from] lettre::address::AddressError),

  #[error("email build error: {0}")]
  Build(String),
}

pub enum ServerMailer {
  Smtp {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
  },
  Log,
}

impl ServerMailer {
  pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, MailError> {
    let Some(smtp) = smtp else {
      tracing::warn!("no [smtp] configured; emails will only be logged");
      return Ok(Self::Log);
    };

    let mut builder = if smtp.starttls {
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
    }
    .port(smtp.port);

    if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
      builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    Ok(Self::Smtp {
      transport: builder.build(),
      from:      smtp.from_address.parse()?,
    })
  }
}

impl Mailer for ServerMailer {
  type Error = MailError;

  async fn send_email<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
  ) -> Result<(), MailError> {
    match self {
      Self::Log => {
        tracing::info!(to, subject, body, "email (not sent)");
        Ok(())
      }
      Self::Smtp { transport, from } => {
        let message = Message::builder()
          .from(from.clone())
          .to(to.parse()?)
          .subject(subject)
          .header(ContentType::TEXT_PLAIN)
          .body(body.to_owned())
          .map_err(|e| MailError::Build(e.to_string()))?;
        transport.send(message).await?;
        tracing::debug!(to, subject, "email sent");
        Ok(())
      }
    }
  }
}
