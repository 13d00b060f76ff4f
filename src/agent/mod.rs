//! Agent module for Thansin
//!
//! This module contains the conversation turn logic: the dispatcher, the mood
//! marker parser, the failure classifier and the avatar refresher.

pub mod avatar;
pub mod dispatcher;
pub mod failure;
pub mod mood;

pub use avatar::{placeholder_avatar, AvatarRefresher};
pub use dispatcher::{
    build_request_history, IgnoreReason, SendOutcome, TurnDispatcher, DEFAULT_HISTORY_WINDOW,
};
pub use failure::{classify_failure, Classification};
pub use mood::{parse_reply, strip_mood_markers, ParsedReply};
