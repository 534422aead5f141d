//! Scenario files: a model tree, the systems attached to it, and a
//! scripted contact timeline, run through the kernel simulation.
//!
//! ```yaml
//! step_size: 0.1
//! duration: 3.0
//! models:
//!   - name: bin
//!     links:
//!       - name: body
//!         collisions:
//!           - { name: bottom, contact_sensor: bin_contact }
//!     systems:
//!       - { name: WasteBin, params: { delay: 2.0 } }
//!   - name: box
//!     links:
//!       - { name: link, collisions: [{ name: col }] }
//! timeline:
//!   - { at: 0.0, touch: [[bin/body/bottom, box/link/col]] }
//! ```
//!
//! Entities are referenced by `/`-separated scoped names.

use serde::{Deserialize, Serialize};
use std::path::Path;
use wastebin_common::EntityId;
use wastebin_kernel::{RegistryError, Simulation, SystemConfig, SystemRegistry, World, WorldEvent};

/// Tolerance when matching timeline times against accumulated sim time.
const TIME_EPSILON: f64 = 1e-9;

/// Errors from loading or running a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),
    #[error("step size must be positive, got {0}")]
    InvalidStepSize(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionSpec {
    pub name: String,
    /// Sensor name, if this collision is instrumented.
    #[serde(default)]
    pub contact_sensor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub name: String,
    #[serde(default)]
    pub collisions: Vec<CollisionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSpec {
    /// Registered system name or alias.
    pub name: String,
    #[serde(default)]
    pub params: SystemConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    /// Nested models.
    #[serde(default)]
    pub models: Vec<ModelSpec>,
    #[serde(default)]
    pub systems: Vec<SystemSpec>,
}

/// Changes applied before the first step that reaches `at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub at: f64,
    #[serde(default)]
    pub touch: Vec<(String, String)>,
    #[serde(default)]
    pub release: Vec<(String, String)>,
    /// Paused steps to run before continuing.
    #[serde(default)]
    pub pause_steps: u64,
}

fn default_step_size() -> f64 {
    0.001
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Simulated seconds to run.
    pub duration: f64,
    pub models: Vec<ModelSpec>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

/// One model removed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovalRecord {
    pub iteration: u64,
    pub sim_time: f64,
    pub model: String,
}

/// Outcome of running a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub steps: u64,
    pub final_time: f64,
    pub removals: Vec<RemovalRecord>,
    /// Names of root models still present at the end.
    pub remaining_models: Vec<String>,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Ran {} steps to t={:.3}s, {} removal(s)",
            self.steps,
            self.final_time,
            self.removals.len()
        )?;
        for r in &self.removals {
            writeln!(f, "  [{:>6}] t={:.3}s removed {}", r.iteration, r.sim_time, r.model)?;
        }
        write!(f, "Remaining models: {}", self.remaining_models.join(", "))
    }
}

impl Scenario {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&data)
    }

    /// Number of steps needed to cover `duration`.
    pub fn step_count(&self) -> u64 {
        (self.duration / self.step_size).round().max(0.0) as u64
    }

    /// Spawn the model tree, check every timeline reference, and attach
    /// systems from `registry`.
    pub fn build(&self, registry: &SystemRegistry) -> Result<Simulation, ScenarioError> {
        if self.step_size.is_nan() || self.step_size <= 0.0 {
            return Err(ScenarioError::InvalidStepSize(self.step_size));
        }

        let mut world = World::new();
        let mut attachments = Vec::new();
        for model in &self.models {
            spawn_model(&mut world, model, None, &mut attachments);
        }

        for event in &self.timeline {
            for (a, b) in event.touch.iter().chain(&event.release) {
                for name in [a, b] {
                    if world.entity_by_scoped_name(name).is_none() {
                        return Err(ScenarioError::UnknownEntity(name.clone()));
                    }
                }
            }
        }

        let mut sim = Simulation::with_step_size(world, self.step_size);
        for (entity, spec) in attachments {
            let system = registry.create(&spec.name)?;
            tracing::debug!(system = %spec.name, entity = %entity.short(), "attaching system");
            sim.add_system(entity, system, &spec.params);
        }
        Ok(sim)
    }

    /// Build and run to `duration`, applying the timeline as time passes.
    pub fn run(&self, registry: &SystemRegistry) -> Result<RunReport, ScenarioError> {
        let mut sim = self.build(registry)?;
        let _span = tracing::info_span!("scenario_run").entered();

        let mut timeline: Vec<&TimelineEvent> = self.timeline.iter().collect();
        timeline.sort_by(|a, b| a.at.total_cmp(&b.at));
        let mut next = 0;

        let steps = self.step_count();
        for _ in 0..steps {
            let upcoming = sim.world().sim_time() + self.step_size;
            while let Some(event) = timeline.get(next) {
                if event.at > upcoming + TIME_EPSILON {
                    break;
                }
                apply_event(&mut sim, event);
                next += 1;
            }
            sim.step();
        }

        let world = sim.world();
        let removals = world
            .events()
            .iter()
            .filter_map(|e| match e {
                WorldEvent::Removed {
                    name,
                    iteration,
                    sim_time,
                    ..
                } => Some(RemovalRecord {
                    iteration: *iteration,
                    sim_time: *sim_time,
                    model: name.clone(),
                }),
                _ => None,
            })
            .collect();
        let remaining_models = self
            .models
            .iter()
            .filter(|m| world.entity_by_scoped_name(&m.name).is_some())
            .map(|m| m.name.clone())
            .collect();

        Ok(RunReport {
            steps,
            final_time: world.sim_time(),
            removals,
            remaining_models,
        })
    }
}

fn spawn_model<'a>(
    world: &mut World,
    spec: &'a ModelSpec,
    parent: Option<EntityId>,
    attachments: &mut Vec<(EntityId, &'a SystemSpec)>,
) {
    let model = world.spawn_model(&spec.name, parent);
    for link_spec in &spec.links {
        let link = world.spawn_link(model, &link_spec.name);
        for col_spec in &link_spec.collisions {
            let collision = world.spawn_collision(link, &col_spec.name);
            if let Some(sensor) = &col_spec.contact_sensor {
                world.attach_contact_sensor(collision, sensor);
            }
        }
    }
    for nested in &spec.models {
        spawn_model(world, nested, Some(model), attachments);
    }
    attachments.extend(spec.systems.iter().map(|s| (model, s)));
}

/// Apply one timeline entry. References to entities that were removed
/// during the run are skipped.
fn apply_event(sim: &mut Simulation, event: &TimelineEvent) {
    let world = sim.world_mut();
    for (a, b) in &event.touch {
        match (world.entity_by_scoped_name(a), world.entity_by_scoped_name(b)) {
            (Some(x), Some(y)) => world.begin_contact(x, y),
            _ => tracing::debug!(%a, %b, "skipping touch on removed entity"),
        }
    }
    for (a, b) in &event.release {
        match (world.entity_by_scoped_name(a), world.entity_by_scoped_name(b)) {
            (Some(x), Some(y)) => {
                world.end_contact(x, y);
            }
            _ => tracing::debug!(%a, %b, "skipping release on removed entity"),
        }
    }
    if event.pause_steps > 0 {
        sim.set_paused(true);
        for _ in 0..event.pause_steps {
            sim.step();
        }
        sim.set_paused(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wastebin_kernel::System;

    const TWO_BOXES: &str = r#"
step_size: 0.1
duration: 3.0
models:
  - name: bin
    links:
      - name: body
        collisions:
          - { name: s1, contact_sensor: sensor_1 }
          - { name: s2, contact_sensor: sensor_2 }
          - { name: rim }
    systems:
      - name: WasteBin
        params: { delay: 2.0 }
  - name: a
    links: [{ name: link, collisions: [{ name: col }] }]
  - name: b
    links: [{ name: link, collisions: [{ name: col }] }]
  - name: c
    links: [{ name: link, collisions: [{ name: col }] }]
timeline:
  - at: 0.0
    touch: [[bin/body/s1, a/link/col]]
  - at: 1.0
    touch: [[b/link/col, bin/body/s2]]
  - at: 1.9
    release: [[bin/body/s1, a/link/col]]
"#;

    fn registry() -> SystemRegistry {
        let mut registry = SystemRegistry::new();
        wastebin_system::register(&mut registry).unwrap();
        registry
    }

    #[test]
    fn parses_defaults() {
        let scenario =
            Scenario::from_yaml_str("duration: 1.0\nmodels: [{ name: bin }]\n").unwrap();
        assert_eq!(scenario.step_size, 0.001);
        assert_eq!(scenario.step_count(), 1000);
        assert!(scenario.timeline.is_empty());
        assert!(scenario.models[0].links.is_empty());
    }

    #[test]
    fn parses_full_file() {
        let scenario = Scenario::from_yaml_str(TWO_BOXES).unwrap();
        assert_eq!(scenario.models.len(), 4);
        let bin = &scenario.models[0];
        assert_eq!(bin.systems[0].name, "WasteBin");
        assert_eq!(bin.systems[0].params.get::<f64>("delay").unwrap(), Some(2.0));
        assert_eq!(
            bin.links[0].collisions[0].contact_sensor.as_deref(),
            Some("sensor_1")
        );
        assert_eq!(scenario.timeline[1].touch[0].1, "bin/body/s2");
    }

    #[test]
    fn load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(TWO_BOXES.as_bytes()).unwrap();
        let scenario = Scenario::load(tmp.path()).unwrap();
        assert_eq!(scenario.duration, 3.0);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Scenario::load(dir.path().join("nope.yaml")),
            Err(ScenarioError::Io(_))
        ));
    }

    #[test]
    fn build_rejects_unknown_references() {
        let mut scenario = Scenario::from_yaml_str(TWO_BOXES).unwrap();
        scenario.timeline[0].touch[0].1 = "ghost/link/col".into();
        assert!(matches!(
            scenario.build(&registry()),
            Err(ScenarioError::UnknownEntity(name)) if name == "ghost/link/col"
        ));

        let mut scenario = Scenario::from_yaml_str(TWO_BOXES).unwrap();
        scenario.models[0].systems[0].name = "Nope".into();
        assert!(matches!(
            scenario.build(&registry()),
            Err(ScenarioError::Registry(RegistryError::UnknownSystem(_)))
        ));

        let mut scenario = Scenario::from_yaml_str(TWO_BOXES).unwrap();
        scenario.step_size = 0.0;
        assert!(matches!(
            scenario.build(&registry()),
            Err(ScenarioError::InvalidStepSize(_))
        ));
    }

    #[test]
    fn build_attaches_systems_to_nested_models() {
        struct Noop;
        impl System for Noop {}
        fn noop() -> Box<dyn System> {
            Box::new(Noop)
        }
        let mut registry = SystemRegistry::new();
        registry.register("Noop", noop).unwrap();

        let scenario = Scenario::from_yaml_str(
            r#"
duration: 0.1
models:
  - name: cart
    models:
      - name: crate
        systems: [{ name: Noop }]
"#,
        )
        .unwrap();
        let sim = scenario.build(&registry).unwrap();
        assert_eq!(sim.system_count(), 1);
        let nested = sim.world().entity_by_scoped_name("cart/crate").unwrap();
        assert_eq!(sim.system_entities(), vec![nested]);
    }

    #[test]
    fn waste_bin_removes_both_touching_models() {
        let report = Scenario::from_yaml_str(TWO_BOXES)
            .unwrap()
            .run(&registry())
            .unwrap();

        assert_eq!(report.steps, 30);
        let mut removed: Vec<&str> = report.removals.iter().map(|r| r.model.as_str()).collect();
        removed.sort();
        assert_eq!(removed, vec!["a", "b"]);
        // Both go in the same step, just after the delay has passed.
        assert_eq!(report.removals[0].iteration, report.removals[1].iteration);
        assert!(report.removals[0].sim_time > 2.1 && report.removals[0].sim_time < 2.5);
        assert_eq!(report.remaining_models, vec!["bin", "c"]);
    }

    #[test]
    fn releasing_everything_before_the_delay_saves_the_model() {
        let mut scenario = Scenario::from_yaml_str(TWO_BOXES).unwrap();
        scenario.timeline = vec![
            TimelineEvent {
                at: 0.0,
                touch: vec![("bin/body/s1".into(), "a/link/col".into())],
                release: Vec::new(),
                pause_steps: 0,
            },
            TimelineEvent {
                at: 1.5,
                touch: Vec::new(),
                release: vec![("bin/body/s1".into(), "a/link/col".into())],
                pause_steps: 0,
            },
            TimelineEvent {
                at: 1.7,
                touch: vec![("bin/body/s1".into(), "a/link/col".into())],
                release: Vec::new(),
                pause_steps: 5,
            },
        ];
        let report = scenario.run(&registry()).unwrap();
        // The second episode starts at 1.7 and has not lasted 2s by t=3.
        assert!(report.removals.is_empty());
        assert_eq!(report.remaining_models.len(), 4);
        // Paused steps do not advance time.
        assert!((report.final_time - 3.0).abs() < 1e-6);
    }

    #[test]
    fn report_display_lists_removals() {
        let report = RunReport {
            steps: 2,
            final_time: 0.2,
            removals: vec![RemovalRecord {
                iteration: 2,
                sim_time: 0.2,
                model: "box".into(),
            }],
            remaining_models: vec!["bin".into()],
        };
        let text = report.to_string();
        assert!(text.contains("removed box"));
        assert!(text.contains("Remaining models: bin"));
    }
}
