use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Werewolf, // 人狼
    Villager, // 村人
    Seer,     // 占い師
    Witch,    // 魔女
    Hunter,   // 狩人
    Guard,    // 騎士
    Unknown,
}

impl Role {
    // ワイヤ上の役職名。未知の名前は境界で弾く
    pub fn from_name(name: &str) -> Result<Role, GameError> {
        match name {
            "werewolf" => Ok(Role::Werewolf),
            "villager" => Ok(Role::Villager),
            "seer" => Ok(Role::Seer),
            "witch" => Ok(Role::Witch),
            "hunter" => Ok(Role::Hunter),
            "guard" => Ok(Role::Guard),
            other => Err(GameError::InvalidConfig(format!(
                "unknown role name: {}",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Werewolf => "werewolf",
            Role::Villager => "villager",
            Role::Seer => "seer",
            Role::Witch => "witch",
            Role::Hunter => "hunter",
            Role::Guard => "guard",
            Role::Unknown => "unknown",
        }
    }

    pub fn camp(&self) -> Camp {
        match self {
            Role::Werewolf => Camp::WerewolfCamp,
            Role::Unknown => Camp::Unknown,
            _ => Camp::VillagerCamp,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Camp {
    #[serde(rename = "werewolf_camp")]
    WerewolfCamp,
    #[serde(rename = "villager_camp")]
    VillagerCamp,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Camp {
    pub fn name(&self) -> &'static str {
        match self {
            Camp::WerewolfCamp => "werewolf_camp",
            Camp::VillagerCamp => "villager_camp",
            Camp::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Camp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for name in ["werewolf", "villager", "seer", "witch", "hunter", "guard"] {
            let role = Role::from_name(name).unwrap();
            assert_eq!(role.name(), name);
        }
    }

    #[test]
    fn unknown_role_name_is_rejected() {
        assert!(Role::from_name("jester").is_err());
    }

    #[test]
    fn only_werewolf_belongs_to_werewolf_camp() {
        assert_eq!(Role::Werewolf.camp(), Camp::WerewolfCamp);
        for role in [Role::Villager, Role::Seer, Role::Witch, Role::Hunter, Role::Guard] {
            assert_eq!(role.camp(), Camp::VillagerCamp);
        }
    }
}
