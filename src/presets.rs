// ABOUTME: Stage preset catalog: relative-day care tasks for each growth stage
// ABOUTME: Constant data used to seed a plant's calendar, never persisted

use serde::Serialize;

use crate::plants::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresetTask {
    /// Days after the calendar's start date.
    pub offset: u32,
    pub task: &'static str,
}

const SEED: &[PresetTask] = &[
    PresetTask { offset: 0, task: "Soak seeds" },
    PresetTask { offset: 1, task: "Plant in starter" },
    PresetTask { offset: 3, task: "Check moisture" },
    PresetTask { offset: 7, task: "Transplant to veg pot" },
];

const VEG: &[PresetTask] = &[
    PresetTask { offset: 0, task: "Start 18/6 light cycle" },
    PresetTask { offset: 2, task: "Feed nutrients" },
    PresetTask { offset: 7, task: "Check height" },
    PresetTask { offset: 14, task: "Top plant" },
];

const FLOWER: &[PresetTask] = &[
    PresetTask { offset: 0, task: "Switch to 12/12 lights" },
    PresetTask { offset: 3, task: "Add bloom nutrients" },
    PresetTask { offset: 10, task: "Trim lower leaves" },
    PresetTask { offset: 21, task: "Check trichomes" },
];

pub fn preset(stage: Stage) -> &'static [PresetTask] {
    match stage {
        Stage::Seed => SEED,
        Stage::Veg => VEG,
        Stage::Flower => FLOWER,
    }
}

/// The whole catalog in stage order.
pub fn catalog() -> Vec<(Stage, &'static [PresetTask])> {
    Stage::ALL.iter().map(|&stage| (stage, preset(stage))).collect()
}
