//! SCHEDULE_SELECTION: pick when to post, then show the summary

use super::{Flow, StateHandler, WorkflowEnv};
use crate::messaging::{Button, MediaItem};
use crate::workflow::{prompts, Context, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, NaiveTime, TimeZone, Utc};

/// Hour of day (UTC) used for day-granular slots
const MORNING_HOUR: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSlot {
    Now,
    Later,
    Tomorrow,
    NextWeek,
}

impl ScheduleSlot {
    /// Offered in this order; numeric replies follow it
    pub const ALL: [ScheduleSlot; 4] = [
        ScheduleSlot::Now,
        ScheduleSlot::Later,
        ScheduleSlot::Tomorrow,
        ScheduleSlot::NextWeek,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ScheduleSlot::Now => "now",
            ScheduleSlot::Later => "later",
            ScheduleSlot::Tomorrow => "tomorrow",
            ScheduleSlot::NextWeek => "next week",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ScheduleSlot::Now => "Post Now",
            ScheduleSlot::Later => "Later Today",
            ScheduleSlot::Tomorrow => "Tomorrow",
            ScheduleSlot::NextWeek => "Next Week",
        }
    }

    /// Accepts ids, button titles and 1-based numbers, case-insensitively
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if let Ok(n) = text.parse::<usize>() {
            return n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied());
        }
        let text = text.replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|slot| text == slot.id() || text == slot.title().to_lowercase())
    }

    /// Concrete publish time for this slot
    pub fn resolve(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let morning_after = |days: u64| {
            now.date_naive()
                .checked_add_days(Days::new(days))
                .and_then(|d| NaiveTime::from_hms_opt(MORNING_HOUR, 0, 0).map(|t| d.and_time(t)))
                .map_or(now, |naive| Utc.from_utc_datetime(&naive))
        };
        match self {
            ScheduleSlot::Now => now,
            ScheduleSlot::Later => now + Duration::hours(3),
            ScheduleSlot::Tomorrow => morning_after(1),
            ScheduleSlot::NextWeek => morning_after(7),
        }
    }
}

pub struct ScheduleHandler;

#[async_trait]
impl StateHandler for ScheduleHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let Some(slot) = ScheduleSlot::parse(&input.text) else {
            env.send_schedule_options(user_id, prompts::INVALID_SCHEDULE)
                .await?;
            return Ok(Flow::Done);
        };

        let mut ctx = env.store.get_context(user_id);
        let scheduled_for = slot.resolve(Utc::now());
        ctx.schedule_time = Some(slot.id().to_string());
        ctx.scheduled_for = Some(scheduled_for);
        tracing::info!(user_id = %user_id, slot = slot.id(), scheduled_for = %scheduled_for, "Schedule selected");

        env.store.update_context(user_id, ctx.clone());
        env.store.set_state(user_id, WorkflowState::Confirmation);

        send_confirmation(env, user_id, &ctx).await?;
        Ok(Flow::Done)
    }
}

/// Post summary (with the selected media when there is one) followed by
/// the yes/no buttons
pub(super) async fn send_confirmation(
    env: &WorkflowEnv,
    user_id: &str,
    ctx: &Context,
) -> Result<(), WorkflowError> {
    let slot = ctx.schedule_time.as_deref().and_then(ScheduleSlot::parse);
    let schedule = match (slot, ctx.scheduled_for) {
        (Some(slot), Some(at)) if slot != ScheduleSlot::Now => {
            format!("{} ({})", slot.title(), at.format("%Y-%m-%d %H:%M UTC"))
        }
        (Some(slot), _) => slot.title().to_string(),
        (None, _) => ctx.schedule_time.clone().unwrap_or_default(),
    };
    let summary = prompts::confirmation_summary(
        ctx.selected_content_type.as_deref().unwrap_or_default(),
        &ctx.selected_platforms,
        &schedule,
        ctx.caption.as_deref().unwrap_or_default(),
    );
    match ctx.selected_media() {
        Some((kind, url)) => {
            let item = MediaItem::new(kind, url).with_caption(summary);
            env.messenger().send_media(user_id, &[item]).await?;
        }
        None => env.send_text(user_id, &summary).await?,
    }

    let buttons = [
        Button::new("yes", "Yes, Post It"),
        Button::new("no", "No, Start Over"),
    ];
    env.send_buttons(user_id, "Confirmation", prompts::CONFIRM_PROMPT, &buttons)
        .await
}
