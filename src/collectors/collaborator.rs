use std::fmt;

/// Availability of an optional external tool, resolved once at startup
///
/// Components branch on the variant instead of re-probing for the tool on
/// every call: `Available` selects the real code path, `Unavailable` the
/// flagged demo or simulated path.
pub enum Collaborator<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Collaborator<T> {
    /// Wraps the result of a capability check
    pub fn from_detection(detected: Option<T>, missing_reason: impl Into<String>) -> Self {
        match detected {
            Some(handle) => Collaborator::Available(handle),
            None => Collaborator::Unavailable(missing_reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Collaborator::Available(_))
    }

    pub fn as_ref(&self) -> Collaborator<&T> {
        match self {
            Collaborator::Available(handle) => Collaborator::Available(handle),
            Collaborator::Unavailable(reason) => Collaborator::Unavailable(reason.clone()),
        }
    }
}

impl<T> fmt::Debug for Collaborator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Available(_) => f.write_str("Available"),
            Collaborator::Unavailable(reason) => write!(f, "Unavailable({reason})"),
        }
    }
}
