//! Workflow state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a user currently is in the content-creation workflow.
///
/// Serialized by name so persisted sessions survive reordering of variants.
/// Names that no longer exist deserialize to [`WorkflowState::Unknown`],
/// which the dispatcher treats as an unroutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Waiting for a greeting
    #[default]
    Init,
    ContentTypeSelection,
    PlatformSelectionForContent,

    // Template field collection
    WaitingForDestination,
    WaitingForEventName,
    WaitingForPrice,
    WaitingForHeadline,
    WaitingForTipDetails,
    WaitingForSeasonalDetails,

    CaptionInput,

    // Media
    WaitingForMediaUpload,
    ImageSelection,
    VideoSelection,

    ScheduleSelection,
    Confirmation,
    /// Terminal: publishes and always returns the session to `Init`
    PostExecution,

    /// A state name read back from storage that this build does not know
    #[serde(other)]
    Unknown,
}

impl WorkflowState {
    /// Every routable state, in workflow order
    pub const ALL: [WorkflowState; 16] = [
        WorkflowState::Init,
        WorkflowState::ContentTypeSelection,
        WorkflowState::PlatformSelectionForContent,
        WorkflowState::WaitingForDestination,
        WorkflowState::WaitingForEventName,
        WorkflowState::WaitingForPrice,
        WorkflowState::WaitingForHeadline,
        WorkflowState::WaitingForTipDetails,
        WorkflowState::WaitingForSeasonalDetails,
        WorkflowState::CaptionInput,
        WorkflowState::WaitingForMediaUpload,
        WorkflowState::ImageSelection,
        WorkflowState::VideoSelection,
        WorkflowState::ScheduleSelection,
        WorkflowState::Confirmation,
        WorkflowState::PostExecution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Init => "INIT",
            WorkflowState::ContentTypeSelection => "CONTENT_TYPE_SELECTION",
            WorkflowState::PlatformSelectionForContent => "PLATFORM_SELECTION_FOR_CONTENT",
            WorkflowState::WaitingForDestination => "WAITING_FOR_DESTINATION",
            WorkflowState::WaitingForEventName => "WAITING_FOR_EVENT_NAME",
            WorkflowState::WaitingForPrice => "WAITING_FOR_PRICE",
            WorkflowState::WaitingForHeadline => "WAITING_FOR_HEADLINE",
            WorkflowState::WaitingForTipDetails => "WAITING_FOR_TIP_DETAILS",
            WorkflowState::WaitingForSeasonalDetails => "WAITING_FOR_SEASONAL_DETAILS",
            WorkflowState::CaptionInput => "CAPTION_INPUT",
            WorkflowState::WaitingForMediaUpload => "WAITING_FOR_MEDIA_UPLOAD",
            WorkflowState::ImageSelection => "IMAGE_SELECTION",
            WorkflowState::VideoSelection => "VIDEO_SELECTION",
            WorkflowState::ScheduleSelection => "SCHEDULE_SELECTION",
            WorkflowState::Confirmation => "CONFIRMATION",
            WorkflowState::PostExecution => "POST_EXECUTION",
            WorkflowState::Unknown => "UNKNOWN",
        }
    }

    /// States that collect a single template field from the user
    pub fn is_field_state(self) -> bool {
        matches!(
            self,
            WorkflowState::WaitingForDestination
                | WorkflowState::WaitingForEventName
                | WorkflowState::WaitingForPrice
                | WorkflowState::WaitingForHeadline
                | WorkflowState::WaitingForTipDetails
                | WorkflowState::WaitingForSeasonalDetails
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
