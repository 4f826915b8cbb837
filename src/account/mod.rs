use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct AccountState {
    profile: UserProfile,
    theme: Theme,
    notifications: Vec<Notification>,
}

/// Account settings and the notification feed for the single dashboard user.
pub struct AccountService {
    state: RwLock<AccountState>,
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountService {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            state: RwLock::new(AccountState {
                profile: UserProfile {
                    name: "Charles Akwoyo".to_string(),
                    email: "charles@gmail.com".to_string(),
                    avatar: String::new(),
                },
                theme: Theme::Light,
                notifications: vec![
                    Notification {
                        id: Uuid::new_v4(),
                        title: "New Invoice".to_string(),
                        message: "You have a new invoice from Acme Inc.".to_string(),
                        read: false,
                        timestamp: now,
                    },
                    Notification {
                        id: Uuid::new_v4(),
                        title: "Payment Received".to_string(),
                        message: "Payment of KSh 1,200 received from John Smith".to_string(),
                        read: false,
                        timestamp: now - Duration::hours(1),
                    },
                ],
            }),
        }
    }

    pub async fn profile(&self) -> UserProfile {
        self.state.read().await.profile.clone()
    }

    /// Merge-style update; unset fields keep their current value.
    pub async fn update_profile(&self, update: ProfileUpdate) -> UserProfile {
        let mut state = self.state.write().await;
        if let Some(name) = update.name {
            state.profile.name = name;
        }
        if let Some(email) = update.email {
            state.profile.email = email;
        }
        if let Some(avatar) = update.avatar {
            state.profile.avatar = avatar;
        }
        state.profile.clone()
    }

    pub async fn theme(&self) -> Theme {
        self.state.read().await.theme
    }

    pub async fn toggle_theme(&self) -> Theme {
        let mut state = self.state.write().await;
        state.theme = state.theme.toggled();
        state.theme
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    /// Newest first, unread.
    pub async fn add_notification(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            read: false,
            timestamp: Utc::now(),
        };
        self.state
            .write()
            .await
            .notifications
            .insert(0, notification.clone());
        notification
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> bool {
        let mut state = self.state.write().await;
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub async fn clear_notifications(&self) {
        self.state.write().await.notifications.clear();
    }
}
