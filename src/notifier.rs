use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::error::Result;
use crate::targets::Target;

const FIRE: &str = "\u{1F525}";

/// Sends best-effort text messages to the Telegram Bot API. The admin chat
/// receives operational reports (errors, heartbeats); the group chat receives
/// stock alerts and the waiting summary. Safe to call concurrently from every
/// watch loop; the shared `reqwest::Client` handles its own concurrency.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    admin_chat_id: String,
    group_chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        TelegramNotifier {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            admin_chat_id: config.admin_chat_id.clone(),
            group_chat_id: config.group_chat_id.clone(),
        }
    }

    /// Form-POST one message to a chat. Returns the raw response body for
    /// diagnostics; transport failures are returned to the caller, never
    /// retried here.
    pub async fn send(&self, chat_id: &str, text: &str) -> Result<String> {
        info!("Sending '{}' to chat_id {}", text, chat_id);

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", chat_id), ("text", text)])
            .send()
            .await?;

        let body = response.text().await?;
        debug!("Telegram response body: {}", body);

        if let Ok(answer) = serde_json::from_str::<serde_json::Value>(&body) {
            if answer.get("ok").and_then(|v| v.as_bool()) == Some(false) {
                warn!("Telegram API rejected the message: {}", body);
            }
        }

        Ok(body)
    }

    pub async fn notify_group(&self, text: &str) -> Result<String> {
        self.send(&self.group_chat_id, text).await
    }

    pub async fn notify_admin(&self, text: &str) -> Result<String> {
        self.send(&self.admin_chat_id, text).await
    }

    /// Announced once at startup so the admin can tell restarts apart from
    /// silent deaths.
    pub async fn announce_restart(&self) -> Result<String> {
        self.notify_admin("Bot restarted. Keep going!").await
    }

    pub async fn alert_in_stock(&self, target: &Target, final_url: &str) -> Result<String> {
        self.notify_group(&in_stock_message(target, final_url)).await
    }

    pub async fn report_error(&self, target: &Target, status: u16) -> Result<String> {
        self.notify_admin(&error_report_message(target, status)).await
    }

    pub async fn send_waiting_summary(&self, targets: &[Target]) -> Result<String> {
        self.notify_group(&waiting_summary_message(targets)).await
    }
}

pub fn in_stock_message(target: &Target, final_url: &str) -> String {
    format!("You can buy it! {} is in stock: {}", target.name, final_url)
}

pub fn error_report_message(target: &Target, status: u16) -> String {
    format!(
        "Problems with {} ({}): status code is {}",
        target.name, target.url, status
    )
}

pub fn waiting_summary_message(targets: &[Target]) -> String {
    let urls: Vec<String> = targets
        .iter()
        .map(|target| format!("{}{}", FIRE, target.url))
        .collect();
    format!("We keep waiting stock for:\n{}", urls.join("\n"))
}
