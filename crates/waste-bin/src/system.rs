use std::collections::BTreeSet;
use wastebin_common::{EntityId, UpdateInfo};
use wastebin_ecs::ComponentKind;
use wastebin_kernel::{System, SystemConfig, World};

use crate::config::{WasteBinConfig, WasteBinError};
use crate::contacts::collect_contacts;
use crate::episode::{ContactEpisode, EpisodeTransition};
use crate::surfaces::TriggerSurfaces;

/// Coarse state of the waste bin, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteBinState {
    /// Configuration failed or has not happened; callbacks do nothing.
    Unconfigured,
    Idle,
    Contacting,
    /// Models are staged and will be removed in the next `pre_update`.
    PendingRemoval,
}

/// Removes models that stay in contact with the bin model for longer than
/// the configured delay.
#[derive(Debug, Default)]
pub struct WasteBin {
    model: Option<EntityId>,
    model_name: String,
    config: WasteBinConfig,
    /// Resolved on the first `post_update`, then fixed.
    surfaces: Option<TriggerSurfaces>,
    episode: ContactEpisode,
    /// Top level models staged for removal.
    pending: BTreeSet<EntityId>,
    configured: bool,
    /// Ignore contact data for one step after requesting removals.
    skip_one: bool,
}

impl WasteBin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// The bin model this system is attached to.
    pub fn model(&self) -> Option<EntityId> {
        self.model
    }

    pub fn config(&self) -> WasteBinConfig {
        self.config
    }

    /// `None` until the first unpaused `post_update`.
    pub fn trigger_surfaces(&self) -> Option<&TriggerSurfaces> {
        self.surfaces.as_ref()
    }

    pub fn episode(&self) -> &ContactEpisode {
        &self.episode
    }

    pub fn pending_removals(&self) -> &BTreeSet<EntityId> {
        &self.pending
    }

    pub fn state(&self) -> WasteBinState {
        if !self.configured {
            WasteBinState::Unconfigured
        } else if !self.pending.is_empty() {
            WasteBinState::PendingRemoval
        } else if self.episode.is_open() {
            WasteBinState::Contacting
        } else {
            WasteBinState::Idle
        }
    }

    fn try_configure(
        &mut self,
        entity: EntityId,
        config: &SystemConfig,
        world: &World,
    ) -> Result<(), WasteBinError> {
        if !world.has_component(entity, ComponentKind::Model) {
            return Err(WasteBinError::NotAModel(entity));
        }
        self.model = Some(entity);
        self.model_name = world.name(entity).unwrap_or_default().to_string();
        self.config = WasteBinConfig::from_system_config(config)?;
        Ok(())
    }

    fn resolve_surfaces(&mut self, model: EntityId, world: &World) {
        let surfaces = TriggerSurfaces::resolve(model, world);
        if surfaces.is_empty() {
            tracing::error!(
                bin = %self.model_name,
                "no collision entities with contact sensor found"
            );
        } else {
            tracing::debug!(bin = %self.model_name, count = surfaces.len(), "trigger surfaces resolved");
        }
        self.surfaces = Some(surfaces);
    }

    /// Stage the top level model of every touched entity for removal.
    /// Entities that no longer resolve are skipped.
    fn stage_removals(&mut self, world: &World) {
        for touched in self.episode.touched() {
            if let Some(top) = world.top_level_model(*touched) {
                self.pending.insert(top);
            }
        }
    }
}

impl System for WasteBin {
    fn configure(&mut self, entity: EntityId, config: &SystemConfig, world: &mut World) {
        match self.try_configure(entity, config, world) {
            Ok(()) => {
                self.configured = true;
                tracing::debug!(
                    bin = %self.model_name,
                    delay = self.config.delay,
                    "waste bin configured"
                );
            }
            Err(err) => {
                tracing::error!(entity = %entity.short(), %err, "waste bin failed to initialize");
            }
        }
    }

    fn pre_update(&mut self, info: &UpdateInfo, world: &mut World) {
        if info.paused || !self.configured || self.pending.is_empty() {
            return;
        }
        let _span = tracing::info_span!("waste_bin_pre_update").entered();

        for model in std::mem::take(&mut self.pending) {
            let name = world.scoped_name(model);
            world.request_remove(model);
            tracing::debug!(
                bin = %self.model_name,
                model = %name,
                sim_time = info.sim_time,
                "removal requested"
            );
        }

        self.episode.clear();
        // Removed models are still present, with stale contacts, until the
        // host finishes this step.
        self.skip_one = true;
    }

    fn post_update(&mut self, info: &UpdateInfo, world: &World) {
        if info.paused || !self.configured {
            return;
        }
        let Some(model) = self.model else {
            return;
        };
        let _span = tracing::info_span!("waste_bin_post_update").entered();

        if self.surfaces.is_none() {
            self.resolve_surfaces(model, world);
        }

        // TODO: reset the episode on rewind instead of carrying on.
        if info.is_time_jump_back() {
            tracing::warn!(
                dt = info.dt,
                "detected jump back in time, waste bin may not work properly"
            );
        }

        let touching = if self.skip_one {
            self.skip_one = false;
            false
        } else {
            match &self.surfaces {
                Some(surfaces) => collect_contacts(surfaces, world, self.episode.touched_mut()),
                None => false,
            }
        };

        match self
            .episode
            .advance(touching, info.sim_time, self.config.delay)
        {
            EpisodeTransition::Opened => {
                tracing::debug!(bin = %self.model_name, sim_time = info.sim_time, "in contact");
            }
            EpisodeTransition::Closed => {
                tracing::debug!(bin = %self.model_name, sim_time = info.sim_time, "lost contact");
            }
            EpisodeTransition::DelayElapsed => {
                self.stage_removals(world);
                tracing::debug!(
                    bin = %self.model_name,
                    staged = self.pending.len(),
                    sim_time = info.sim_time,
                    "contact delay elapsed"
                );
            }
            EpisodeTransition::Idle | EpisodeTransition::Contacting => {}
        }
    }
}
