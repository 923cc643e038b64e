// Envoi de l'email de vérification via SMTP (lettre).
// Best-effort: l'appelant spawn cette fonction APRÈS le commit du signup,
// un échec est loggé mais ne fait jamais échouer l'inscription.

use lettre::{
    message::{header::ContentType, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use std::env;

pub async fn send_verification_email(email: &str, token: &str) -> Result<(), String> {
    let base_url = env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let verification_link = format!("{}/api/verify-email?token={}", base_url, token);

    let html = format!(
        r#"
    <h2>FlowRelay - Email Verification</h2>
    <p>Click below to verify your email:</p>
    <a href="{}"
       style="padding:10px 20px;background:#4CAF50;color:white;border-radius:5px;text-decoration:none;">
       Verify Email
    </a>
    "#,
        verification_link
    );

    let smtp_host = env::var("SMTP_HOST").map_err(|_| "SMTP_HOST not set".to_string())?;
    let smtp_user = env::var("SMTP_USER").unwrap_or_default();
    let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
    let smtp_from = env::var("SMTP_FROM")
        .unwrap_or_else(|_| "FlowRelay <no-reply@flowrelay.app>".to_string());

    let message = Message::builder()
        .from(smtp_from.parse().map_err(|e| format!("Invalid sender address: {}", e))?)
        .to(email.parse().map_err(|e| format!("Invalid recipient address: {}", e))?)
        .subject("Verify Your FlowRelay Email")
        .header(ContentType::TEXT_HTML)
        .body(html)
        .map_err(|e| format!("Failed to build email: {}", e))?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)
        .map_err(|e| format!("SMTP setup failed: {}", e))?
        .credentials(Credentials::new(smtp_user, smtp_password))
        .build();

    mailer
        .send(message)
        .await
        .map_err(|e| format!("Failed to send email: {}", e))?;

    Ok(())
}
