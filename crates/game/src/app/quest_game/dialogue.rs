use serde::Deserialize;
use tracing::{debug, info};

use super::entity::Npc;
use super::quest::{QuestBook, QuestStateError, QuestStatus};

/// The five lines every NPC can say, keyed "1".."5" in world content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DialogueLines {
    #[serde(rename = "1")]
    pub offer: String,
    #[serde(rename = "2")]
    pub reminder: String,
    #[serde(rename = "3")]
    pub thanks: String,
    #[serde(rename = "4")]
    pub busy: String,
    #[serde(rename = "5")]
    pub finished: String,
}

impl DialogueLines {
    pub(crate) fn text(&self, line: DialogueLine) -> &str {
        match line {
            DialogueLine::Offer => &self.offer,
            DialogueLine::Reminder => &self.reminder,
            DialogueLine::Thanks => &self.thanks,
            DialogueLine::Busy => &self.busy,
            DialogueLine::Finished => &self.finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogueLine {
    Offer,
    Reminder,
    Thanks,
    Busy,
    Finished,
}

impl DialogueLine {
    pub(crate) fn key(self) -> &'static str {
        match self {
            DialogueLine::Offer => "1",
            DialogueLine::Reminder => "2",
            DialogueLine::Thanks => "3",
            DialogueLine::Busy => "4",
            DialogueLine::Finished => "5",
        }
    }

    /// Line selection table for an NPC whose quest is `quest` with committed `status`.
    pub(crate) fn select(active_quest: Option<&str>, quest: &str, status: QuestStatus) -> Self {
        match (active_quest, status) {
            (None, QuestStatus::Unstarted) => DialogueLine::Offer,
            (Some(active), QuestStatus::Accepted) if active == quest => DialogueLine::Reminder,
            (Some(active), QuestStatus::ItemFound) if active == quest => DialogueLine::Thanks,
            (active, QuestStatus::Completed) if active != Some(quest) => DialogueLine::Finished,
            _ => DialogueLine::Busy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CurrentLine {
    pub speaker: String,
    pub line: DialogueLine,
    pub text: String,
}

/// Talking mode, the cached line of the current talking session and the single active quest.
#[derive(Debug, Clone, Default)]
pub(crate) struct DialogueOrchestrator {
    active_quest: Option<String>,
    talking: bool,
    current: Option<CurrentLine>,
}

impl DialogueOrchestrator {
    pub(crate) fn active_quest(&self) -> Option<&str> {
        self.active_quest.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn is_talking(&self) -> bool {
        self.talking
    }

    pub(crate) fn current_line(&self) -> Option<&CurrentLine> {
        self.current.as_ref()
    }

    /// A line is chosen at most once per talking session.
    pub(crate) fn wants_line(&self) -> bool {
        self.talking && self.current.is_none()
    }

    /// Starts or ends a talking session. Ending one is the player's confirmation: the active
    /// quest's staged status is committed, and a completed quest stops being active.
    pub(crate) fn toggle_talk(&mut self, quests: &mut QuestBook) -> Result<(), QuestStateError> {
        if !self.talking {
            self.talking = true;
            self.current = None;
            debug!("talk_started");
            return Ok(());
        }

        self.talking = false;
        let speaker = self.current.take().map(|line| line.speaker);
        debug!(speaker = ?speaker, "talk_ended");

        let Some(active) = self.active_quest.clone() else {
            return Ok(());
        };
        let quest = quests.get_mut(&active)?;
        quest.commit();
        if quest.status() == QuestStatus::Completed {
            info!(quest = %active, "active_quest_cleared");
            self.active_quest = None;
        }
        Ok(())
    }

    /// Picks the line `npc` says to the hero and stages whatever quest change it implies.
    pub(crate) fn select_line(
        &mut self,
        npc: &Npc,
        quests: &mut QuestBook,
    ) -> Result<Option<DialogueLine>, QuestStateError> {
        if !self.wants_line() {
            return Ok(None);
        }

        let quest = quests.get_mut(&npc.quest)?;
        let line = DialogueLine::select(self.active_quest(), &quest.name, quest.status());
        match line {
            DialogueLine::Offer => {
                quest.stage(QuestStatus::Accepted)?;
                info!(quest = %quest.name, npc = %npc.name, "active_quest_set");
                self.active_quest = Some(quest.name.clone());
            }
            DialogueLine::Thanks => quest.stage(QuestStatus::Completed)?,
            DialogueLine::Reminder | DialogueLine::Busy | DialogueLine::Finished => {}
        }

        debug!(npc = %npc.name, line = line.key(), "dialogue_line_selected");
        self.current = Some(CurrentLine {
            speaker: npc.name.clone(),
            line,
            text: npc.lines.text(line).to_string(),
        });
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_table_covers_every_branch() {
        use DialogueLine::*;
        use QuestStatus::*;

        assert_eq!(DialogueLine::select(None, "ariel", Unstarted), Offer);
        assert_eq!(DialogueLine::select(Some("ariel"), "ariel", Accepted), Reminder);
        assert_eq!(DialogueLine::select(Some("ariel"), "ariel", ItemFound), Thanks);
        assert_eq!(DialogueLine::select(Some("tiana"), "ariel", Completed), Finished);
        assert_eq!(DialogueLine::select(None, "ariel", Completed), Finished);
        assert_eq!(DialogueLine::select(Some("tiana"), "ariel", Unstarted), Busy);
        assert_eq!(DialogueLine::select(Some("tiana"), "ariel", Accepted), Busy);
        assert_eq!(DialogueLine::select(Some("ariel"), "ariel", Unstarted), Busy);
    }

    #[test]
    fn lines_deserialize_from_numbered_keys() {
        let raw = r#"{"1":"offer","2":"reminder","3":"thanks","4":"busy","5":"done"}"#;
        let lines: DialogueLines = serde_json::from_str(raw).expect("lines");
        assert_eq!(lines.text(DialogueLine::Offer), "offer");
        assert_eq!(lines.text(DialogueLine::Finished), "done");
        assert_eq!(DialogueLine::Thanks.key(), "3");
    }

    #[test]
    fn toggling_without_active_quest_only_flips_talking() {
        let mut dialogue = DialogueOrchestrator::default();
        let mut quests = QuestBook::default();

        dialogue.toggle_talk(&mut quests).expect("start");
        assert!(dialogue.is_talking());
        assert!(dialogue.wants_line());

        dialogue.toggle_talk(&mut quests).expect("end");
        assert!(!dialogue.is_talking());
        assert!(dialogue.current_line().is_none());
        assert!(dialogue.active_quest().is_none());
    }
}
