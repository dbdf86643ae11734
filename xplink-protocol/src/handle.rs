//! Session-scoped numeric references handed out by the host

/// Handle to a resolved dataref or command
///
/// Only meaningful for the session in which the host assigned it. Any
/// negative value means "unresolved" or "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle(i32);

impl Handle {
    /// Sentinel for a name that has not resolved
    pub const INVALID: Handle = Handle(-1);

    /// Wrap a raw handle; negative values collapse to [`Handle::INVALID`]
    pub const fn new(raw: i32) -> Self {
        if raw < 0 {
            Self::INVALID
        } else {
            Self(raw)
        }
    }

    /// Raw wire value
    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<i32> for Handle {
    fn from(raw: i32) -> Self {
        Self::new(raw)
    }
}

impl From<Handle> for i32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_is_invalid() {
        assert_eq!(Handle::new(-7), Handle::INVALID);
        assert!(!Handle::from(-1).is_valid());
        assert!(Handle::new(0).is_valid());
        assert_eq!(Handle::default(), Handle::INVALID);
        assert_eq!(i32::from(Handle::new(5)), 5);
    }
}
