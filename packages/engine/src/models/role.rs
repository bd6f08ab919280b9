use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Mafia,
    Doctor,
    Detective,
    Villager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Mafia,
    Village,
}

/// What a role is allowed to do at night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightActionKind {
    MafiaPropose,
    DoctorSave,
    DetectiveInvestigate,
}

/// Static per-role behaviour table. Prompt renderers read the framing text,
/// the engine reads `night_action`.
#[derive(Debug)]
pub struct RoleProfile {
    pub night_action: Option<NightActionKind>,
    pub guidelines: &'static str,
    pub discussion_framing: &'static str,
    pub voting_framing: &'static str,
    pub base_urgency: u8,
}

const MAFIA_PROFILE: RoleProfile = RoleProfile {
    night_action: Some(NightActionKind::MafiaPropose),
    guidelines: "- You know who the other Mafia members are\n\
- During Night phase, coordinate with other Mafia to choose someone to eliminate\n\
- During Day phase, blend in and deflect suspicion\n\
- Try to eliminate key Village roles (Doctor, Detective) if you can identify them",
    discussion_framing: "As a Mafia member, you need to:\n\
- Deflect suspicion from yourself and other Mafia\n\
- Build suspicion against Village members\n\
- Appear helpful and trustworthy",
    voting_framing: "As a Mafia member, vote strategically to eliminate Village members or deflect suspicion.",
    base_urgency: 3,
};

const DOCTOR_PROFILE: RoleProfile = RoleProfile {
    night_action: Some(NightActionKind::DoctorSave),
    guidelines: "- Each night, choose one person to save from elimination\n\
- You can save yourself if you don't have a better clue\n\
- You don't know if your save was successful unless someone was targeted\n\
- Keep your identity secret to avoid being targeted",
    discussion_framing: "As the Doctor, be helpful in finding Mafia but don't reveal your role.\n\
Share your thoughts on who might be suspicious.",
    voting_framing: "As the Doctor, vote for who you think is most likely to be Mafia.",
    base_urgency: 2,
};

const DETECTIVE_PROFILE: RoleProfile = RoleProfile {
    night_action: Some(NightActionKind::DetectiveInvestigate),
    guidelines: "- Each night, investigate one person to learn their role\n\
- Use this information strategically during Day discussions\n\
- Be careful about revealing your findings - Mafia will target you if discovered",
    discussion_framing: "As the Detective, use your investigation results wisely.\n\
Guide the village toward Mafia members without exposing yourself too early.",
    voting_framing: "As the Detective, use your investigation results to vote for Mafia members.",
    base_urgency: 4,
};

const VILLAGER_PROFILE: RoleProfile = RoleProfile {
    night_action: None,
    guidelines: "- You have no special abilities\n\
- Use discussion and voting to identify and eliminate Mafia members\n\
- Pay attention to voting patterns and behavior to spot suspicious players",
    discussion_framing: "As a Villager, help the village find the Mafia.\n\
Share your suspicions and question inconsistent behavior.",
    voting_framing: "As a Villager, vote for who you think is most likely to be Mafia.",
    base_urgency: 3,
};

impl Role {
    pub fn profile(&self) -> &'static RoleProfile {
        match self {
            Role::Mafia => &MAFIA_PROFILE,
            Role::Doctor => &DOCTOR_PROFILE,
            Role::Detective => &DETECTIVE_PROFILE,
            Role::Villager => &VILLAGER_PROFILE,
        }
    }

    pub fn faction(&self) -> Faction {
        match self {
            Role::Mafia => Faction::Mafia,
            _ => Faction::Village,
        }
    }

    pub fn is_mafia(&self) -> bool {
        self.faction() == Faction::Mafia
    }

    pub fn night_action(&self) -> Option<NightActionKind> {
        self.profile().night_action
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mafia => "mafia",
            Role::Doctor => "doctor",
            Role::Detective => "detective",
            Role::Villager => "villager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for NightActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NightActionKind::MafiaPropose => write!(f, "mafia_propose"),
            NightActionKind::DoctorSave => write!(f, "doctor_save"),
            NightActionKind::DetectiveInvestigate => write!(f, "detective_investigate"),
        }
    }
}
