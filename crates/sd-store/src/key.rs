use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Identifiant explicite d'un enregistrement : qui, sur quelle machine, quand.
///
/// Text form is `user/machine/<RFC 3339 timestamp>`, e.g.
/// `alice/press-04/2026-03-01T09:30:00Z`. Ordering follows the fields in
/// declaration order, so a sorted catalog groups by user, then machine, then time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct RecordingKey {
    user: String,
    machine: String,
    recorded_at: DateTime<Utc>,
}

/// Forme sérialisée, revalidée par [`RecordingKey::new`] au chargement.
#[derive(Deserialize)]
struct RawKey {
    user: String,
    machine: String,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<RawKey> for RecordingKey {
    type Error = StoreError;

    fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
        Self::new(raw.user, raw.machine, raw.recorded_at)
    }
}

impl RecordingKey {
    /// Build a key, validating the name components.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidKey`] if `user` or `machine` is blank or
    /// contains a `/`.
    pub fn new(
        user: impl Into<String>,
        machine: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let user = user.into();
        let machine = machine.into();
        for part in [&user, &machine] {
            if part.trim().is_empty() || part.contains('/') {
                return Err(StoreError::InvalidKey(format!("composant '{part}'")));
            }
        }
        Ok(Self {
            user,
            machine,
            recorded_at,
        })
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn machine(&self) -> &str {
        &self.machine
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl fmt::Display for RecordingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.user,
            self.machine,
            self.recorded_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

impl FromStr for RecordingKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let (Some(user), Some(machine), Some(stamp)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(StoreError::InvalidKey(s.to_string()));
        };
        let recorded_at = DateTime::parse_from_rfc3339(stamp)
            .map_err(|e| StoreError::InvalidKey(format!("{s} ({e})")))?
            .with_timezone(&Utc);
        Self::new(user, machine, recorded_at)
    }
}
