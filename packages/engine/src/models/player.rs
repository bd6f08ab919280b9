use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub role: Role,
    pub personality: String,
    pub is_alive: bool,
    pub votes_received: u32,
}

impl Player {
    pub fn new(name: impl Into<String>, role: Role, personality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            personality: personality.into(),
            is_alive: true,
            votes_received: 0,
        }
    }
}
