use crate::{
    commands::ephemeral,
    error::CommandError,
    event::{split_rewards, EventId, EventRecord},
    manager::{EventEdit, Manager},
};
use serenity::all::{
    ActionRow, ActionRowComponent, ComponentInteraction, ComponentInteractionDataKind, Context,
    CreateActionRow, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateModal, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, InputTextStyle, ModalInteraction,
};
use tracing::{error, warn};

const MAX_OPTIONS: usize = 25;
const MAX_LABEL: usize = 100;
const MAX_TITLE: usize = 45;
const MAX_INPUT: usize = 4000;

const FIELD_NAME: &str = "name";
const FIELD_INFO: &str = "info";
const FIELD_DELAY: &str = "delay";
const FIELD_REWARDS: &str = "rewards";
const FIELD_PARTICIPATION: &str = "participation_reward";
const FIELD_CONFIRM: &str = "confirm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Edit,
    Delete,
}

impl MenuKind {
    pub fn menu_id(self) -> &'static str {
        match self {
            MenuKind::Edit => "event-menu:edit",
            MenuKind::Delete => "event-menu:delete",
        }
    }

    fn modal_prefix(self) -> &'static str {
        match self {
            MenuKind::Edit => "event-edit:",
            MenuKind::Delete => "event-delete:",
        }
    }

    pub fn from_menu_id(custom_id: &str) -> Option<Self> {
        [MenuKind::Edit, MenuKind::Delete]
            .into_iter()
            .find(|k| k.menu_id() == custom_id)
    }

    pub fn modal_id(self, id: EventId) -> String {
        format!("{}{}", self.modal_prefix(), id)
    }

    pub fn from_modal_id(custom_id: &str) -> Option<(Self, EventId)> {
        [MenuKind::Edit, MenuKind::Delete]
            .into_iter()
            .find_map(|k| {
                let id = custom_id.strip_prefix(k.modal_prefix())?.parse().ok()?;
                Some((k, id))
            })
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Ephemeral select menu listing `events`. Only the first 25 fit in a menu.
pub fn picker(kind: MenuKind, events: &[EventRecord]) -> CreateInteractionResponseMessage {
    let options = events
        .iter()
        .take(MAX_OPTIONS)
        .map(|e| {
            CreateSelectMenuOption::new(truncate(&e.name, MAX_LABEL), e.id.to_string())
                .description(e.start_time.format("Starts %Y-%m-%d %H:%M UTC").to_string())
        })
        .collect();

    let placeholder = match kind {
        MenuKind::Edit => "Select an event to edit",
        MenuKind::Delete => "Select an event to delete",
    };
    let menu = CreateSelectMenu::new(kind.menu_id(), CreateSelectMenuKind::String { options })
        .placeholder(placeholder);

    CreateInteractionResponseMessage::new()
        .components(vec![CreateActionRow::SelectMenu(menu)])
        .ephemeral(true)
}

fn input(style: InputTextStyle, label: &str, id: &str, value: Option<&str>) -> CreateActionRow {
    let mut input = CreateInputText::new(style, label, id).required(false);
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        input = input.value(value);
    }
    CreateActionRow::InputText(input)
}

pub fn edit_modal(event: &EventRecord) -> CreateModal {
    let rewards = [&event.reward1, &event.reward2, &event.reward3]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    CreateModal::new(
        MenuKind::Edit.modal_id(event.id),
        truncate(&format!("Edit {}", event.name), MAX_TITLE),
    )
    .components(vec![
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, "Name", FIELD_NAME)
                .value(truncate(&event.name, MAX_INPUT)),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Paragraph, "Info", FIELD_INFO)
                .value(truncate(&event.info, MAX_INPUT)),
        ),
        input(
            InputTextStyle::Short,
            "New delay, e.g. 30s, 5m, 48h, 2d",
            FIELD_DELAY,
            None,
        ),
        input(
            InputTextStyle::Paragraph,
            "Rewards, one per line (1st to 3rd)",
            FIELD_REWARDS,
            Some(rewards.as_str()),
        ),
        input(
            InputTextStyle::Short,
            "Participation reward",
            FIELD_PARTICIPATION,
            event.participation_reward.as_deref(),
        ),
    ])
}

pub fn delete_modal(event: &EventRecord) -> CreateModal {
    CreateModal::new(
        MenuKind::Delete.modal_id(event.id),
        truncate(&format!("Delete {}", event.name), MAX_TITLE),
    )
    .components(vec![CreateActionRow::InputText(
        CreateInputText::new(InputTextStyle::Short, "Type the event name to confirm", FIELD_CONFIRM)
            .placeholder(truncate(&event.name, MAX_LABEL)),
    )])
}

/// Submitted modal values keyed by input id.
#[derive(Debug, Default)]
struct Form(Vec<(String, String)>);

impl Form {
    fn from_rows(rows: &[ActionRow]) -> Self {
        Self(
            rows.iter()
                .flat_map(|row| &row.components)
                .filter_map(|c| match c {
                    ActionRowComponent::InputText(input) => Some((
                        input.custom_id.clone(),
                        input.value.clone().unwrap_or_default(),
                    )),
                    _ => None,
                })
                .collect(),
        )
    }

    /// A trimmed value, with blank input treated as absent.
    fn get(&self, id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn edit(&self) -> EventEdit {
        let owned = |id| self.get(id).map(str::to_string);

        EventEdit {
            name: owned(FIELD_NAME).unwrap_or_default(),
            info: owned(FIELD_INFO).unwrap_or_default(),
            delay: owned(FIELD_DELAY),
            rewards: split_rewards(self.get(FIELD_REWARDS).unwrap_or_default()),
            participation_reward: owned(FIELD_PARTICIPATION),
        }
    }
}

/// Opens the edit or delete modal for the selected event.
pub async fn handle_component(ctx: &Context, manager: &Manager, component: &ComponentInteraction) {
    let Some(kind) = MenuKind::from_menu_id(&component.data.custom_id) else {
        return;
    };
    let selected = match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values.first(),
        _ => None,
    };
    let Some(id) = selected.and_then(|v| v.parse::<EventId>().ok()) else {
        warn!("Event menu {} submitted without a valid selection", kind.menu_id());
        return;
    };

    let response = match manager.find(id).await {
        Some(event) => CreateInteractionResponse::Modal(match kind {
            MenuKind::Edit => edit_modal(&event),
            MenuKind::Delete => delete_modal(&event),
        }),
        None => CreateInteractionResponse::Message(ephemeral(CommandError::NotFound.to_string())),
    };

    if let Err(why) = component.create_response(&ctx.http, response).await {
        error!("Cannot respond to component interaction: {}", why);
    }
}

pub async fn handle_modal(ctx: &Context, manager: &Manager, modal: &ModalInteraction) {
    let Some((kind, id)) = MenuKind::from_modal_id(&modal.data.custom_id) else {
        return;
    };
    let form = Form::from_rows(&modal.data.components);

    let content = match kind {
        MenuKind::Edit => manager
            .edit_event(id, modal.user.id.get(), form.edit())
            .await
            .map(|e| format!("✏️ Event '{}' has been updated.", e.name)),
        MenuKind::Delete => manager
            .delete_event(id, form.get(FIELD_CONFIRM).unwrap_or_default())
            .await
            .map(|e| format!("🗑️ Event '{}' has been deleted.", e.name)),
    }
    .unwrap_or_else(|e| e.to_string());

    if let Err(why) = modal
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(ephemeral(content)),
        )
        .await
    {
        error!("Cannot respond to modal submit: {}", why);
    }
}
