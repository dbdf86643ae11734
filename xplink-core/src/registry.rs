//! Registration table
//!
//! One entry per dataref or command name the application declared. Entries
//! outlive sessions: a reset only clears their handles, so the next
//! handshake can re-request every name and re-send stored subscriptions.

use heapless::{String, Vec};
use xplink_protocol::{Handle, Scaling};

use crate::config::{MAX_NAME_LEN, MAX_REGISTRATIONS};

/// What a name refers to on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    DataRef,
    Command,
}

/// Where an entry stands in the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryState {
    /// No request sent this session
    #[default]
    Unrequested,
    /// Request sent, no answer yet
    Pending,
    /// Host assigned a handle
    Resolved(Handle),
    /// Host does not know the name
    Rejected,
    /// Host never answered before the response timeout
    Expired,
}

/// Standing request for pushed updates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Subscription {
    /// Minimum interval between updates
    pub rate_ms: u32,
    /// Change the host ignores before sending again
    pub precision: f32,
    /// Array element to watch, if the dataref is an array
    pub element: Option<u16>,
}

/// Stable reference to a registration that survives resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistrationId(pub(crate) u8);

/// Errors adding to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Name longer than `MAX_NAME_LEN`
    NameTooLong,
    /// Already holding `MAX_REGISTRATIONS` entries
    Full,
}

/// Outcome of applying a host registration response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Resolved(RegistrationId),
    Rejected(RegistrationId),
    /// No matching entry, or the entry expired this session
    Ignored,
}

/// A registered name and its session state
#[derive(Debug, Clone)]
pub struct Entry {
    name: String<MAX_NAME_LEN>,
    kind: EntryKind,
    state: EntryState,
    subscription: Option<Subscription>,
    scaling: Option<Scaling>,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Current handle, [`Handle::INVALID`] unless resolved
    pub fn handle(&self) -> Handle {
        match self.state {
            EntryState::Resolved(handle) => handle,
            _ => Handle::INVALID,
        }
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.subscription
    }

    pub fn scaling(&self) -> Option<Scaling> {
        self.scaling
    }

    fn is_outstanding(&self) -> bool {
        matches!(self.state, EntryState::Unrequested | EntryState::Pending)
    }

    pub(crate) fn set_state(&mut self, state: EntryState) {
        self.state = state;
    }

    pub(crate) fn set_subscription(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    pub(crate) fn set_scaling(&mut self, scaling: Scaling) {
        self.scaling = Some(scaling);
    }
}

/// Fixed-capacity table of registrations
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry, MAX_REGISTRATIONS>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: RegistrationId) -> Option<&Entry> {
        self.entries.get(usize::from(id.0))
    }

    pub(crate) fn get_mut(&mut self, id: RegistrationId) -> Option<&mut Entry> {
        self.entries.get_mut(usize::from(id.0))
    }

    /// Iterate over every entry with its id
    pub fn iter(&self) -> impl Iterator<Item = (RegistrationId, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (RegistrationId(index as u8), entry))
    }

    /// Look up an entry by exact name
    pub fn find(&self, kind: EntryKind, name: &str) -> Option<RegistrationId> {
        self.iter()
            .find(|(_, entry)| entry.kind == kind && entry.name == name)
            .map(|(id, _)| id)
    }

    /// Look up a resolved entry by its handle
    pub fn find_handle(&self, kind: EntryKind, handle: Handle) -> Option<RegistrationId> {
        if !handle.is_valid() {
            return None;
        }
        self.iter()
            .find(|(_, entry)| entry.kind == kind && entry.handle() == handle)
            .map(|(id, _)| id)
    }

    /// Add a name, or return the existing entry for it
    pub fn insert(&mut self, kind: EntryKind, name: &str) -> Result<RegistrationId, RegistryError> {
        if let Some(id) = self.find(kind, name) {
            return Ok(id);
        }

        let name = String::try_from(name).map_err(|_| RegistryError::NameTooLong)?;
        let id = RegistrationId(self.entries.len() as u8);
        self.entries
            .push(Entry {
                name,
                kind,
                state: EntryState::Unrequested,
                subscription: None,
                scaling: None,
            })
            .map_err(|_| RegistryError::Full)?;
        Ok(id)
    }

    /// Apply a host response to the entry with the same kind and name
    ///
    /// A later response for the same name replaces an earlier one.
    pub fn apply_response(&mut self, kind: EntryKind, name: &str, handle: Handle) -> Resolution {
        let Some(id) = self.find(kind, name) else {
            return Resolution::Ignored;
        };
        let Some(entry) = self.get_mut(id) else {
            return Resolution::Ignored;
        };

        match (entry.state, handle.is_valid()) {
            (EntryState::Expired, _) => Resolution::Ignored,
            (_, true) => {
                entry.state = EntryState::Resolved(handle);
                Resolution::Resolved(id)
            }
            (_, false) => {
                entry.state = EntryState::Rejected;
                Resolution::Rejected(id)
            }
        }
    }

    /// Ids of entries that still need a request this session
    pub fn unrequested(&self) -> Vec<RegistrationId, MAX_REGISTRATIONS> {
        self.iter()
            .filter(|(_, entry)| entry.state == EntryState::Unrequested)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of entries with no answer yet, sent or not
    pub fn outstanding_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.is_outstanding())
            .count()
    }

    /// Give up on every unanswered entry; returns how many expired
    pub fn expire_outstanding(&mut self) -> usize {
        let mut expired = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.is_outstanding()) {
            entry.state = EntryState::Expired;
            expired += 1;
        }
        expired
    }

    /// Forget every handle; names and subscriptions stay
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.state = EntryState::Unrequested;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut registry = Registry::new();
        let a = registry.insert(EntryKind::DataRef, "sim/x").unwrap();
        let b = registry.insert(EntryKind::DataRef, "sim/x").unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);

        // Same name as a command is a different entry
        let c = registry.insert(EntryKind::Command, "sim/x").unwrap();
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_name_too_long() {
        let mut registry = Registry::new();
        let long = [b'a'; MAX_NAME_LEN + 1];
        let name = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            registry.insert(EntryKind::DataRef, name),
            Err(RegistryError::NameTooLong)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_table_full() {
        let mut registry = Registry::new();
        let mut name = String::<8>::new();
        for i in 0..MAX_REGISTRATIONS {
            name.clear();
            core::fmt::Write::write_fmt(&mut name, format_args!("d{}", i)).unwrap();
            registry.insert(EntryKind::DataRef, &name).unwrap();
        }
        assert_eq!(
            registry.insert(EntryKind::Command, "one/more"),
            Err(RegistryError::Full)
        );
    }

    #[test]
    fn test_response_resolves_and_last_wins() {
        let mut registry = Registry::new();
        let id = registry.insert(EntryKind::DataRef, "sim/x").unwrap();

        assert_eq!(
            registry.apply_response(EntryKind::DataRef, "sim/x", Handle::new(5)),
            Resolution::Resolved(id)
        );
        assert_eq!(registry.get(id).unwrap().handle(), Handle::new(5));
        assert_eq!(registry.find_handle(EntryKind::DataRef, Handle::new(5)), Some(id));

        registry.apply_response(EntryKind::DataRef, "sim/x", Handle::new(9));
        assert_eq!(registry.get(id).unwrap().handle(), Handle::new(9));
        assert_eq!(registry.find_handle(EntryKind::DataRef, Handle::new(5)), None);
    }

    #[test]
    fn test_response_matches_kind_and_exact_name() {
        let mut registry = Registry::new();
        registry.insert(EntryKind::Command, "sim/x").unwrap();
        assert_eq!(
            registry.apply_response(EntryKind::DataRef, "sim/x", Handle::new(1)),
            Resolution::Ignored
        );
        assert_eq!(
            registry.apply_response(EntryKind::Command, "sim/x2", Handle::new(1)),
            Resolution::Ignored
        );
    }

    #[test]
    fn test_rejected_stays_invalid() {
        let mut registry = Registry::new();
        let id = registry.insert(EntryKind::DataRef, "sim/missing").unwrap();
        assert_eq!(
            registry.apply_response(EntryKind::DataRef, "sim/missing", Handle::INVALID),
            Resolution::Rejected(id)
        );
        let entry = registry.get(id).unwrap();
        assert_eq!(entry.state(), EntryState::Rejected);
        assert_eq!(entry.handle(), Handle::INVALID);
        assert!(registry.unrequested().is_empty());
    }

    #[test]
    fn test_expired_ignores_late_response() {
        let mut registry = Registry::new();
        let id = registry.insert(EntryKind::DataRef, "sim/slow").unwrap();
        registry.get_mut(id).unwrap().set_state(EntryState::Pending);
        assert_eq!(registry.outstanding_count(), 1);

        assert_eq!(registry.expire_outstanding(), 1);
        assert_eq!(registry.outstanding_count(), 0);
        assert_eq!(
            registry.apply_response(EntryKind::DataRef, "sim/slow", Handle::new(3)),
            Resolution::Ignored
        );
        assert_eq!(registry.get(id).unwrap().handle(), Handle::INVALID);
    }

    #[test]
    fn test_unsent_entries_count_as_outstanding() {
        let mut registry = Registry::new();
        let sent = registry.insert(EntryKind::DataRef, "sim/a").unwrap();
        let unsent = registry.insert(EntryKind::Command, "sim/b").unwrap();
        let answered = registry.insert(EntryKind::DataRef, "sim/c").unwrap();
        registry.get_mut(sent).unwrap().set_state(EntryState::Pending);
        registry.apply_response(EntryKind::DataRef, "sim/c", Handle::new(4));
        assert_eq!(registry.outstanding_count(), 2);

        assert_eq!(registry.expire_outstanding(), 2);
        assert_eq!(registry.get(unsent).unwrap().state(), EntryState::Expired);
        assert_eq!(registry.get(answered).unwrap().handle(), Handle::new(4));
        assert!(registry.unrequested().is_empty());
    }

    #[test]
    fn test_invalidate_keeps_subscriptions() {
        let mut registry = Registry::new();
        let id = registry.insert(EntryKind::DataRef, "sim/x").unwrap();
        registry.get_mut(id).unwrap().set_subscription(Subscription {
            rate_ms: 100,
            precision: 0.0,
            element: None,
        });
        registry.apply_response(EntryKind::DataRef, "sim/x", Handle::new(5));

        registry.invalidate_all();
        let entry = registry.get(id).unwrap();
        assert_eq!(entry.state(), EntryState::Unrequested);
        assert_eq!(entry.subscription().map(|s| s.rate_ms), Some(100));
        assert_eq!(registry.find_handle(EntryKind::DataRef, Handle::new(5)), None);
        assert_eq!(&registry.unrequested()[..], &[id]);
    }
}
