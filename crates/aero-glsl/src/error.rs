use thiserror::Error;

use crate::profile::Profile;

/// Failure of a single generation call.
///
/// No partial output accompanies an error: a call either produces complete GLSL text or one of
/// these values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlslError {
    /// The IR violates a structural precondition the front-end is expected to uphold.
    #[error("malformed IR: {0}")]
    MalformedIr(String),
    /// The IR uses something the target can never express, even with every applicable
    /// workaround enabled.
    #[error("unsupported construct for profile `{profile}`: {message}")]
    UnsupportedConstruct { profile: String, message: String },
}

pub(crate) fn malformed(message: impl Into<String>) -> GlslError {
    GlslError::MalformedIr(message.into())
}

pub(crate) fn unsupported(profile: &Profile, message: impl Into<String>) -> GlslError {
    GlslError::UnsupportedConstruct {
        profile: profile.name.clone(),
        message: message.into(),
    }
}
