use std::collections::BTreeSet;
use wastebin_common::EntityId;

/// What a step did to the contact episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeTransition {
    /// No contact, no open episode.
    Idle,
    /// First contact; the episode started this step.
    Opened,
    /// Still in contact, delay not yet exceeded.
    Contacting,
    /// All contact was lost; the episode was discarded.
    Closed,
    /// Contact has lasted longer than the delay.
    DelayElapsed,
}

/// An unbroken stretch of contact with the bin.
///
/// `touched` grows for as long as at least one trigger surface reports a
/// contact, whichever surface and whichever partner that is. It is only
/// emptied when contact is lost completely or the episode is consumed by a
/// removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactEpisode {
    first_contact: Option<f64>,
    touched: BTreeSet<EntityId>,
}

impl ContactEpisode {
    pub fn is_open(&self) -> bool {
        self.first_contact.is_some()
    }

    /// Sim time at which the episode started.
    pub fn first_contact(&self) -> Option<f64> {
        self.first_contact
    }

    /// Models that touched the bin since the episode started.
    pub fn touched(&self) -> &BTreeSet<EntityId> {
        &self.touched
    }

    pub fn touched_mut(&mut self) -> &mut BTreeSet<EntityId> {
        &mut self.touched
    }

    /// Seconds since first contact, or `None` outside an episode.
    pub fn elapsed(&self, sim_time: f64) -> Option<f64> {
        self.first_contact.map(|start| sim_time - start)
    }

    /// Feed one step's contact state into the episode.
    pub fn advance(&mut self, touching: bool, sim_time: f64, delay: f64) -> EpisodeTransition {
        if !touching {
            if self.is_open() {
                self.clear();
                return EpisodeTransition::Closed;
            }
            return EpisodeTransition::Idle;
        }

        let opened = self.first_contact.is_none();
        let start = *self.first_contact.get_or_insert(sim_time);
        if sim_time - start > delay {
            EpisodeTransition::DelayElapsed
        } else if opened {
            EpisodeTransition::Opened
        } else {
            EpisodeTransition::Contacting
        }
    }

    /// Back to the state before any contact happened.
    pub fn clear(&mut self) {
        self.first_contact = None;
        self.touched.clear();
    }
}
