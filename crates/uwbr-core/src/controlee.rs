//! Multicast controlee list management.
//!
//! A controller session owns a list of controlees (multicast peers), edited
//! only through explicit add/remove actions. Edits are atomic: a batch either
//! applies in full or leaves the list untouched. Removal is idempotent.
//!
//! Sub-session key material is carried opaquely for the radio and never
//! interpreted here; it is zeroized on drop.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// 2-byte short network address of a controlee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortAddress(pub [u8; 2]);

impl std::fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<u16> for ShortAddress {
    fn from(value: u16) -> Self {
        Self(value.to_be_bytes())
    }
}

/// Opaque sub-session key material, passed through to the radio.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum SubSessionKey {
    /// 128-bit sub-session key.
    Short([u8; 16]),
    /// 256-bit sub-session key.
    Long([u8; 32]),
}

impl std::fmt::Debug for SubSessionKey {
    // Key material stays out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Short(_) => write!(f, "SubSessionKey::Short(..)"),
            Self::Long(_) => write!(f, "SubSessionKey::Long(..)"),
        }
    }
}

/// One multicast peer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controlee {
    /// Short network address, unique within a session.
    pub short_address: ShortAddress,
    /// Sub-session id associated with this peer.
    pub sub_session_id: u32,
    /// Optional sub-session key, required by the keyed add actions.
    pub sub_session_key: Option<SubSessionKey>,
}

impl Controlee {
    /// Create a key-less controlee entry.
    #[must_use]
    pub fn new(short_address: ShortAddress, sub_session_id: u32) -> Self {
        Self {
            short_address,
            sub_session_id,
            sub_session_key: None,
        }
    }

    /// Create a controlee entry carrying sub-session key material.
    #[must_use]
    pub fn with_key(short_address: ShortAddress, sub_session_id: u32, key: SubSessionKey) -> Self {
        Self {
            short_address,
            sub_session_id,
            sub_session_key: Some(key),
        }
    }
}

/// Edit action applied to a session's multicast list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulticastAction {
    /// Add entries without key material.
    Add,
    /// Remove entries by short address; absent addresses are ignored.
    Remove,
    /// Add entries that each carry a 128-bit sub-session key.
    AddWithShortSubSessionKey,
    /// Add entries that each carry a 256-bit sub-session key.
    AddWithLongSubSessionKey,
}

impl MulticastAction {
    /// Returns true for the add-style actions.
    #[must_use]
    pub fn is_add(self) -> bool {
        !matches!(self, Self::Remove)
    }

    fn key_is_valid(self, entry: &Controlee) -> bool {
        match self {
            // Removal is by address only; stray key material is ignored.
            Self::Remove => true,
            Self::Add => entry.sub_session_key.is_none(),
            Self::AddWithShortSubSessionKey => {
                matches!(entry.sub_session_key, Some(SubSessionKey::Short(_)))
            }
            Self::AddWithLongSubSessionKey => {
                matches!(entry.sub_session_key, Some(SubSessionKey::Long(_)))
            }
        }
    }
}

/// The multicast peer set of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControleeList {
    entries: Vec<Controlee>,
}

impl ControleeList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[Controlee] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an entry with the given address exists.
    #[must_use]
    pub fn contains(&self, address: ShortAddress) -> bool {
        self.entries.iter().any(|c| c.short_address == address)
    }

    /// Apply an edit action. All-or-nothing: on error the list is unchanged.
    ///
    /// `capacity` is the device-reported maximum list size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] when an add batch contains a
    /// duplicate address (against the list or within the batch itself), when
    /// the resulting list would exceed `capacity`, or when an add entry's key
    /// material does not match the action variant. Remove matches on address
    /// alone and ignores any key material the entries carry.
    pub fn apply(
        &mut self,
        action: MulticastAction,
        batch: Vec<Controlee>,
        capacity: usize,
    ) -> Result<()> {
        for entry in &batch {
            if !action.key_is_valid(entry) {
                tracing::debug!(
                    address = %entry.short_address,
                    ?action,
                    "multicast edit rejected: key material does not match action"
                );
                return Err(Error::BadParameters);
            }
        }

        match action {
            MulticastAction::Remove => {
                // Idempotent: absent addresses are simply ignored.
                self.entries
                    .retain(|c| !batch.iter().any(|r| r.short_address == c.short_address));
                Ok(())
            }
            _ => self.add_batch(batch, capacity),
        }
    }

    fn add_batch(&mut self, batch: Vec<Controlee>, capacity: usize) -> Result<()> {
        if self.entries.len() + batch.len() > capacity {
            tracing::debug!(
                current = self.entries.len(),
                adding = batch.len(),
                capacity,
                "multicast add rejected: capacity exceeded"
            );
            return Err(Error::BadParameters);
        }
        for (i, entry) in batch.iter().enumerate() {
            let dup_in_list = self.contains(entry.short_address);
            let dup_in_batch = batch[..i]
                .iter()
                .any(|c| c.short_address == entry.short_address);
            if dup_in_list || dup_in_batch {
                tracing::debug!(
                    address = %entry.short_address,
                    "multicast add rejected: duplicate address"
                );
                return Err(Error::BadParameters);
            }
        }
        self.entries.extend(batch);
        Ok(())
    }
}
