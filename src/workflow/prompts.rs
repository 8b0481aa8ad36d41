//! User-facing message texts

pub const START_PROMPT: &str = "👋 Please start by saying 'Hi'!";
pub const CONTENT_TYPE_SELECTION: &str =
    "👋 Now, let's create a post for your promotion. What type of content would you like to post?";
pub const INVALID_CONTENT_TYPE: &str = "Please select a valid content type.";
pub const NO_PLATFORM_SELECTED: &str =
    "Please select at least one platform before tapping Done.";
pub const INVALID_PLATFORM: &str = "Please select one of the listed platforms, 'All' or 'Done'.";
pub const GENERATING: &str = "🎨 Generating engaging content for your promotion...";
pub const CAPTION_PROMPT: &str =
    "✍️ Please provide instructions for generating your social media post:";
pub const MEDIA_RECEIVED: &str = "📎 Got your media!";
pub const IMAGE_GALLERY: &str =
    "Please select one of the images below, or type 'upload' to send your own:";
pub const VIDEO_GALLERY: &str =
    "Please select one of the videos below, or type 'upload' to send your own:";
pub const UPLOAD_PROMPT: &str =
    "📤 Please send the photo or video you'd like to use for this post.";
pub const UPLOAD_EXPECTED: &str =
    "Please send a photo or video, or type 'menu' to start over.";
pub const UPLOAD_FAILED: &str =
    "Sorry, I couldn't retrieve that file. Please try sending it again.";
pub const SCHEDULE_PROMPT: &str = "🗓️ When would you like to post this content?";
pub const INVALID_SCHEDULE: &str = "Please select a valid scheduling option.";
pub const CONFIRM_PROMPT: &str = "Is this correct?";
pub const YES_OR_NO: &str = "Please reply with 'yes' or 'no'.";
pub const START_OVER: &str = "Let's start over. Type 'Hi' when you're ready.";
pub const EDITING: &str = "Editing images for each platform...";
pub const POST_FAILURE: &str = "❌ Failed to post your content. Please try again.";
pub const CLOSING: &str = "Type 'Hi' when you're ready to create another post.";
pub const RESTARTED: &str = "🔄 Okay, let's start over.";
pub const HELP: &str = "I help you create social media posts step by step: pick a content \
type, choose platforms, describe your post, pick media and a schedule, then confirm.\n\n\
Type 'Menu' to restart or 'Help' for assistance.";
pub const SESSION_RECOVERED: &str =
    "⚠️ Something went wrong with your session, so I've reset it. Please start again by saying 'Hi'.";
pub const TOO_MANY_PENDING: &str =
    "⏳ You have too many pending messages. Please wait for a reply before sending more.";

pub fn platform_selection(content_type: &str) -> String {
    format!(
        "📱 Great! For {content_type} content, you can post to these platforms. \
Please select one or 'All' to post to all supported platforms:"
    )
}

pub fn platform_added(platform: &str, selected: &[String]) -> String {
    format!(
        "✅ Added {platform}. Selected so far: {}. Pick another platform or tap Done.",
        selected.join(", ")
    )
}

pub fn caption_ready(caption: &str) -> String {
    format!("Here is the caption for the post: {caption}")
}

pub fn gallery_item(index: usize) -> String {
    format!("Reply with {index} to select this option.")
}

pub fn invalid_choice(max: usize) -> String {
    format!("Please select a valid number (1-{max}) or type 'upload' to send your own.")
}

pub fn confirmation_summary(
    content_type: &str,
    platforms: &[String],
    schedule: &str,
    caption: &str,
) -> String {
    format!(
        "📋 Here's a summary of your post:\n\nContent Type: {content_type}\nPlatforms: {}\nSchedule: {schedule}\nCaption: {caption}",
        platforms.join(", ")
    )
}

pub fn post_success(platforms: &[String]) -> String {
    format!(
        "✅ Your content has been posted successfully to {}!",
        platforms.join(", ")
    )
}

pub fn post_partial(succeeded: &[String], failed: &[String]) -> String {
    format!(
        "⚠️ Your content was posted to some platforms: {}\nFailed platforms: {}",
        succeeded.join(", "),
        failed.join(", ")
    )
}

pub fn turn_failed(error_id: &str) -> String {
    format!(
        "❌ An error occurred. Please try again. (Error ID: {error_id})"
    )
}
