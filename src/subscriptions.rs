use std::collections::HashSet;

use crate::models::{ChatId, SubscriptionClass};

/// Chats subscribed to each notification class.
///
/// Live and DM are mutually exclusive: joining one leaves the other.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    general: HashSet<ChatId>,
    live: HashSet<ChatId>,
    dm: HashSet<ChatId>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, chat: ChatId, class: SubscriptionClass) {
        match class {
            SubscriptionClass::General => {
                self.general.insert(chat);
            }
            SubscriptionClass::Live => {
                self.dm.remove(&chat);
                self.live.insert(chat);
            }
            SubscriptionClass::Dm => {
                self.live.remove(&chat);
                self.dm.insert(chat);
            }
        }
    }

    /// Remove `chat` from every class.
    pub fn unsubscribe(&mut self, chat: ChatId) {
        self.general.remove(&chat);
        self.live.remove(&chat);
        self.dm.remove(&chat);
    }

    pub fn members(&self, class: SubscriptionClass) -> &HashSet<ChatId> {
        match class {
            SubscriptionClass::General => &self.general,
            SubscriptionClass::Live => &self.live,
            SubscriptionClass::Dm => &self.dm,
        }
    }

    #[cfg(test)]
    pub fn is_subscribed(&self, chat: ChatId, class: SubscriptionClass) -> bool {
        self.members(class).contains(&chat)
    }
}
