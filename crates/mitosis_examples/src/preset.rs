use std::fs;
use std::path::Path;

use anyhow::Context;
use mitosis::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A complete replication setup loaded from RON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicationPreset {
    pub name: String,
    pub generations: u32,
    #[serde(default)]
    pub root: RootDef,
    #[serde(default)]
    pub config: ReplicatorConfig,
    /// Extra catalog entries as `(effect name, channel name)`.
    #[serde(default)]
    pub channels: Vec<(String, String)>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDef>,
}

/// Template entity the preset replicates.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RootDef {
    pub name: String,
    pub location: [f32; 3],
    pub scale: [f32; 3],
    /// Spawn the root as a new clone instead of wrapping the template.
    pub fresh: bool,
}

impl Default for RootDef {
    fn default() -> Self {
        Self {
            name: "Cube".into(),
            location: [0.0; 3],
            scale: [1.0; 3],
            fresh: false,
        }
    }
}

/// Behavior definition, resolved against a [`BehaviorCatalog`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorDef {
    /// Catalog name, e.g. `"ROTATE"` or `"CHANGE SCALE"`.
    pub effect: String,
    pub axis: Axis,
    pub value: f32,
    pub duration: u32,
    #[serde(default)]
    pub delay: i32,
}

impl BehaviorDef {
    pub fn to_draft(&self, catalog: &BehaviorCatalog) -> mitosis::error::Result<BehaviorDraft> {
        Ok(catalog
            .draft(&self.effect)?
            .with_axis(self.axis)
            .with_value(self.value)
            .with_duration(self.duration)
            .with_delay(self.delay))
    }
}

/// Scene and engine after running a preset.
pub struct PresetRun {
    pub scene: MemoryScene,
    pub replicator: Replicator,
    pub report: RunReport,
}

impl ReplicationPreset {
    pub fn catalog(&self) -> BehaviorCatalog {
        let mut catalog = BehaviorCatalog::default();
        for (effect, channel) in &self.channels {
            catalog.register(effect, Channel::from_name(channel));
        }
        catalog
    }

    /// Build a scene with the root template and run all generations.
    pub fn run(&self) -> anyhow::Result<PresetRun> {
        self.run_with_events(&mut ())
    }

    pub fn run_with_events(&self, sink: &mut dyn EventSink) -> anyhow::Result<PresetRun> {
        let mut scene = MemoryScene::new();
        let template = scene.spawn_template(&self.root.name, self.root.location, self.root.scale);
        let seed = if self.root.fresh {
            RootSeed::fresh(template, self.root.location)
        } else {
            RootSeed::existing(template)
        };

        let mut replicator = Replicator::try_new(self.config.clone(), seed, &mut scene)
            .with_context(|| format!("preset '{}'", self.name))?;

        let catalog = self.catalog();
        let drafts = self
            .behaviors
            .iter()
            .map(|b| b.to_draft(&catalog))
            .collect::<mitosis::error::Result<Vec<_>>>()?;
        replicator.set_behaviors(drafts)?;

        info!(
            "Running preset '{}' | generations={} behaviors={}.",
            self.name,
            self.generations,
            replicator.behaviors().len()
        );
        let report = replicator.generate_with_events(self.generations, &mut scene, sink)?;
        Ok(PresetRun {
            scene,
            replicator,
            report,
        })
    }
}

pub fn parse_preset(source: &str) -> anyhow::Result<ReplicationPreset> {
    let preset: ReplicationPreset = ron::de::from_str(source).map_err(|e| anyhow::anyhow!(e))?;
    preset.config.validate()?;
    Ok(preset)
}

pub fn load_preset(path: impl AsRef<Path>) -> anyhow::Result<ReplicationPreset> {
    let path = path.as_ref();
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_preset(&source).with_context(|| format!("parsing {}", path.display()))
}
