use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::info;

use super::entity::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum QuestStatus {
    Unstarted = 0,
    Accepted = 1,
    ItemFound = 2,
    Completed = 3,
}

impl QuestStatus {
    fn next(self) -> Option<QuestStatus> {
        match self {
            QuestStatus::Unstarted => Some(QuestStatus::Accepted),
            QuestStatus::Accepted => Some(QuestStatus::ItemFound),
            QuestStatus::ItemFound => Some(QuestStatus::Completed),
            QuestStatus::Completed => None,
        }
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestStatus::Unstarted => "unstarted",
            QuestStatus::Accepted => "accepted",
            QuestStatus::ItemFound => "item_found",
            QuestStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum QuestStateError {
    #[error("quest '{quest}' cannot move back from {current} to {requested}")]
    Regression {
        quest: String,
        current: QuestStatus,
        requested: QuestStatus,
    },
    #[error("quest '{quest}' cannot jump from {current} to {requested}")]
    SkippedPhase {
        quest: String,
        current: QuestStatus,
        requested: QuestStatus,
    },
    #[error("quest '{quest}' is not registered")]
    UnknownQuest { quest: String },
    #[error("map '{map}' is not registered")]
    UnknownMap { map: String },
}

/// Committed status plus an optional staged successor awaiting confirmation.
///
/// `committed <= staged`, and a staged value is always exactly one phase ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QuestProgress {
    committed: QuestStatus,
    staged: Option<QuestStatus>,
}

impl Default for QuestProgress {
    fn default() -> Self {
        Self {
            committed: QuestStatus::Unstarted,
            staged: None,
        }
    }
}

impl QuestProgress {
    pub(crate) fn status(&self) -> QuestStatus {
        self.committed
    }

    pub(crate) fn future_status(&self) -> QuestStatus {
        self.staged.unwrap_or(self.committed)
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.staged.is_none()
    }

    fn stage(&mut self, quest: &str, next: QuestStatus) -> Result<bool, QuestStateError> {
        if next < self.future_status() {
            return Err(QuestStateError::Regression {
                quest: quest.to_string(),
                current: self.future_status(),
                requested: next,
            });
        }
        if next == self.future_status() {
            return Ok(false);
        }
        if Some(next) != self.committed.next() {
            return Err(QuestStateError::SkippedPhase {
                quest: quest.to_string(),
                current: self.committed,
                requested: next,
            });
        }
        self.staged = Some(next);
        Ok(true)
    }

    fn commit(&mut self) -> Option<(QuestStatus, QuestStatus)> {
        let staged = self.staged.take()?;
        let from = self.committed;
        self.committed = staged;
        Some((from, staged))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Quest {
    pub name: String,
    /// Map the quest item is placed on.
    pub location: String,
    pub item: Item,
    progress: QuestProgress,
}

impl Quest {
    pub(crate) fn new(name: impl Into<String>, location: impl Into<String>, item: Item) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            item,
            progress: QuestProgress::default(),
        }
    }

    pub(crate) fn progress(&self) -> QuestProgress {
        self.progress
    }

    pub(crate) fn status(&self) -> QuestStatus {
        self.progress.status()
    }

    /// Stages `next`; staging the current future status again is a no-op.
    pub(crate) fn stage(&mut self, next: QuestStatus) -> Result<(), QuestStateError> {
        let from = self.progress.future_status();
        if self.progress.stage(&self.name, next)? {
            info!(quest = %self.name, from = %from, to = %next, "quest_staged");
        }
        Ok(())
    }

    /// Copies the staged status into the committed one. Returns the new status when it changed.
    pub(crate) fn commit(&mut self) -> Option<QuestStatus> {
        let (from, to) = self.progress.commit()?;
        info!(quest = %self.name, from = %from, to = %to, "quest_committed");
        Some(to)
    }
}

/// Every quest of the game, keyed by name. Quests live for the whole process.
#[derive(Debug, Clone, Default)]
pub(crate) struct QuestBook {
    quests: BTreeMap<String, Quest>,
}

impl QuestBook {
    pub(crate) fn insert(&mut self, quest: Quest) {
        self.quests.insert(quest.name.clone(), quest);
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.quests.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Result<&Quest, QuestStateError> {
        self.quests
            .get(name)
            .ok_or_else(|| QuestStateError::UnknownQuest {
                quest: name.to_string(),
            })
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut Quest, QuestStateError> {
        self.quests
            .get_mut(name)
            .ok_or_else(|| QuestStateError::UnknownQuest {
                quest: name.to_string(),
            })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Quest> {
        self.quests.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.quests.len()
    }
}
