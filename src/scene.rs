//! Scene tracking from the surface's scene-select SysEx
//!
//! The hardware announces a scene change with a 12-byte Korg message. All
//! five scenes currently behave the same; the active one is only reported.

use std::fmt;
use tracing::{debug, info};

use crate::midi::sysex_to_hex;

/// Hardware scene slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scene {
    #[default]
    Scene1,
    Scene2,
    Scene3,
    Scene4,
    Scene5,
}

impl Scene {
    pub fn name(&self) -> &'static str {
        match self {
            Scene::Scene1 => "Scene 1",
            Scene::Scene2 => "Scene 2",
            Scene::Scene3 => "Scene 3",
            Scene::Scene4 => "Scene 4",
            Scene::Scene5 => "Scene 5",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized scene-select payloads
const SCENE_SYSEX: [(&str, Scene); 5] = [
    ("f042400001370200004f00f7", Scene::Scene1),
    ("f042400001370200004f01f7", Scene::Scene2),
    ("f042400001370200004f02f7", Scene::Scene3),
    ("f042400001370200004f03f7", Scene::Scene4),
    ("f042400001370200004f04f7", Scene::Scene5),
];

/// Callback invoked on scene transitions
pub type SceneObserver = Box<dyn FnMut(Scene)>;

pub struct SceneStateMachine {
    current: Scene,
    observer: SceneObserver,
}

impl SceneStateMachine {
    /// Create the machine on Scene 1 and report that state to the observer
    pub fn new(observer: impl FnMut(Scene) + 'static) -> Self {
        let mut machine = Self {
            current: Scene::Scene1,
            observer: Box::new(observer),
        };
        machine.emit();
        machine
    }

    pub fn current(&self) -> Scene {
        self.current
    }

    /// Move to `scene`; a no-op when already there
    pub fn set_scene(&mut self, scene: Scene) {
        if self.current == scene {
            return;
        }
        self.current = scene;
        self.emit();
    }

    /// Match a hex SysEx payload against the scene table
    ///
    /// Case and whitespace are ignored. Returns false and leaves the state
    /// untouched when the payload is not a scene-select message.
    pub fn process_message(&mut self, raw: &str) -> bool {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match lookup(&normalized) {
            Some(scene) => {
                self.set_scene(scene);
                true
            },
            None => {
                debug!("SysEx is not a scene select: {}", normalized);
                false
            },
        }
    }

    /// Match raw SysEx bytes (0xF0 .. 0xF7)
    pub fn process_bytes(&mut self, data: &[u8]) -> bool {
        self.process_message(&sysex_to_hex(data))
    }

    fn emit(&mut self) {
        info!("Scene changed to: {}", self.current);
        (self.observer)(self.current);
    }
}

fn lookup(normalized: &str) -> Option<Scene> {
    SCENE_SYSEX
        .iter()
        .find(|(pattern, _)| *pattern == normalized)
        .map(|(_, scene)| *scene)
}

impl fmt::Debug for SceneStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneStateMachine")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
