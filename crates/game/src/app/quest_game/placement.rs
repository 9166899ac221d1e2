use tracing::info;

use super::quest::{QuestBook, QuestStateError, QuestStatus};
use super::registry::MapRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlacementChange {
    Unchanged,
    Inserted,
    Removed,
}

/// Makes the active quest's item present on its map exactly while the quest is accepted and
/// settled, and absent once it has been found. Safe to call every frame.
pub(crate) fn sync_active_quest_item(
    active_quest: Option<&str>,
    quests: &QuestBook,
    registry: &mut MapRegistry,
) -> Result<PlacementChange, QuestStateError> {
    let Some(active) = active_quest else {
        return Ok(PlacementChange::Unchanged);
    };
    let quest = quests.get(active)?;
    let progress = quest.progress();
    if !progress.is_settled() || progress.status() == QuestStatus::Unstarted {
        return Ok(PlacementChange::Unchanged);
    }

    let map = registry
        .map_mut(&quest.location)
        .ok_or_else(|| QuestStateError::UnknownMap {
            map: quest.location.clone(),
        })?;

    let change = if progress.status() == QuestStatus::Accepted {
        if map.insert_item(quest.item.clone()) {
            PlacementChange::Inserted
        } else {
            PlacementChange::Unchanged
        }
    } else if map.remove_item(&quest.item.name) {
        PlacementChange::Removed
    } else {
        PlacementChange::Unchanged
    };

    match change {
        PlacementChange::Inserted => {
            info!(quest = %quest.name, item = %quest.item.name, map = %quest.location, "quest_item_placed");
        }
        PlacementChange::Removed => {
            info!(quest = %quest.name, item = %quest.item.name, map = %quest.location, "quest_item_removed");
        }
        PlacementChange::Unchanged => {}
    }
    Ok(change)
}
