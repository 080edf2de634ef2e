use std::sync::Arc;

use tracing::{info, warn};

use solace_client::chat_list::ChatList;
use solace_client::checkin::{CameraPermission, CheckInController};
use solace_client::guard::Identity;
use solace_client::notifications::NotificationBadge;
use solace_client::session::{Session, load_profile};
use solace_client::{BackendConfig, initialize};
use solace_types::api::Navigation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solace=debug".into()),
        )
        .init();

    // Config
    let config = BackendConfig::from_env()?;
    let client = initialize(config)?;

    let user_id = std::env::var("SOLACE_USER_ID").unwrap_or_else(|_| "demo-user".into());
    let email = std::env::var("SOLACE_USER_EMAIL").unwrap_or_default();
    client.sign_in(Session { user_id: user_id.clone(), email });

    let backend = Arc::new(client.backend().clone());

    // Chat list
    let chats = ChatList::new(backend.clone(), user_id.as_str());
    let mut chat_rx = chats.subscribe();
    let _chat_sub = chats.start();
    tokio::spawn(async move {
        while chat_rx.changed().await.is_ok() {
            let state = chat_rx.borrow_and_update().clone();
            if let Some(alert) = &state.alert {
                warn!(alert = %alert, "chat list");
            }
            for preview in &state.previews {
                info!(
                    chat = %preview.chat_id,
                    with = %preview.other_user_name,
                    last = %preview.last_message,
                    unread = preview.unread_count,
                    "chat"
                );
            }
        }
    });

    // Notification badge
    let badge = NotificationBadge::new();
    let mut badge_rx = badge.subscribe();
    let _badge_sub = badge.start(backend.as_ref(), &user_id);
    tokio::spawn(async move {
        while badge_rx.changed().await.is_ok() {
            info!(unread = *badge_rx.borrow_and_update(), "notifications");
        }
    });

    // Optional one-shot check-in
    if let Ok(payload) = std::env::var("SOLACE_CHECKIN_PAYLOAD") {
        let first_name = load_profile(backend.as_ref(), &user_id).await?.map(|p| p.first_name);
        let identity = Identity {
            user_id: Some(user_id.clone()),
            first_name,
        };

        let (checkin, mut nav) = CheckInController::new(backend.clone(), identity, client.config().home_delay);
        checkin.set_permission(CameraPermission::Granted);
        checkin.on_focus().await;

        let state = checkin.on_scan(&payload).await;
        info!(?state, message = ?checkin.message(), "check-in");

        tokio::spawn(async move {
            while let Some(target) = nav.recv().await {
                if target == Navigation::Home {
                    info!("navigate home");
                }
            }
        });
    }

    info!("solace client running, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}
