//! Shared fixtures for the engine integration tests.

mod liquid;
mod movement;
mod pipetting;
mod probe_and_lid;
mod recovery;

use serde_json::{Value, json};
use std::sync::Arc;
use vial_common::hal::labware::AddressableArea;
use vial_common::types::DeckPoint;
use vial_engine::{Command, CommandCreate, CommandStatus, EngineSettings, ProtocolEngine};
use vial_hal::drivers::simulation::SimulationDriver;
use vial_hal::{DeckConfig, LabwareConfig, SimulatedDeck};

/// Top of plate well A1.
pub const PLATE_ORIGIN: DeckPoint = DeckPoint::new(10.0, 70.0, 15.0);
/// Depth of a 96 plate well.
pub const PLATE_WELL_DEPTH: f64 = 10.67;

pub struct Harness {
    pub engine: ProtocolEngine,
    pub driver: Arc<SimulationDriver>,
}

pub fn deck() -> SimulatedDeck {
    SimulatedDeck::from_config(DeckConfig {
        labware: vec![
            LabwareConfig::plate_96("plate", PLATE_ORIGIN),
            LabwareConfig::reservoir_12("res12", DeckPoint::new(150.0, 70.0, 40.0)),
            LabwareConfig::reservoir_1("res1", DeckPoint::new(280.0, 70.0, 30.0)),
            LabwareConfig::tiprack_96("tips", DeckPoint::new(10.0, 200.0, 100.0), 57.9),
        ],
        addressable_areas: vec![
            AddressableArea {
                name: "movableTrashA3".to_string(),
                center: DeckPoint::new(400.0, 350.0, 40.0),
                staging_slot: false,
            },
            AddressableArea {
                name: "A4".to_string(),
                center: DeckPoint::new(500.0, 350.0, 0.0),
                staging_slot: true,
            },
            AddressableArea {
                name: "C2".to_string(),
                center: DeckPoint::new(200.0, 200.0, 0.0),
                staging_slot: false,
            },
            AddressableArea {
                name: "D3".to_string(),
                center: DeckPoint::new(330.0, 40.0, 0.0),
                staging_slot: false,
            },
            AddressableArea {
                name: "absorbanceReaderV1LidDockD3".to_string(),
                center: DeckPoint::new(480.0, 40.0, 10.0),
                staging_slot: true,
            },
        ],
    })
    .unwrap()
}

pub fn harness_with(driver: SimulationDriver, settings: EngineSettings) -> Harness {
    let driver = Arc::new(driver);
    let engine = ProtocolEngine::new(driver.clone(), Arc::new(deck()), settings);
    Harness { engine, driver }
}

pub fn harness() -> Harness {
    harness_with(SimulationDriver::new(), EngineSettings::default())
}

/// Command request from a type tag and JSON params.
pub fn cmd(command_type: &str, params: Value) -> CommandCreate {
    serde_json::from_value(json!({ "commandType": command_type, "params": params })).unwrap()
}

impl Harness {
    pub async fn run(&mut self, command_type: &str, params: Value) -> Command {
        self.engine
            .execute_command(cmd(command_type, params))
            .await
            .unwrap()
    }

    pub async fn run_ok(&mut self, command_type: &str, params: Value) -> Command {
        let command = self.run(command_type, params).await;
        assert_eq!(
            command.status,
            CommandStatus::Succeeded,
            "{command_type} failed: {:?}",
            command.error
        );
        command
    }

    /// Single-channel pipette `p1` holding a fresh tip.
    pub async fn pipette_with_tip(&mut self) {
        self.run_ok(
            "loadPipette",
            json!({"pipetteId": "p1", "pipetteName": "flex_1channel_50",
                   "mount": "left", "channels": 1, "maxVolume": 50.0}),
        )
        .await;
        self.run_ok(
            "pickUpTip",
            json!({"pipetteId": "p1", "labwareId": "tips", "wellName": "A1"}),
        )
        .await;
    }

    pub async fn load_liquid(&mut self, labware_id: &str, volumes: Value) {
        self.run_ok(
            "loadLiquid",
            json!({"liquidId": "water", "labwareId": labware_id, "volumeByWell": volumes}),
        )
        .await;
    }

    pub fn loaded_volume(&self, labware_id: &str, well_name: &str) -> Option<f64> {
        self.engine
            .state()
            .wells
            .get_well_liquid_info(labware_id, well_name)
            .loaded_volume
            .and_then(|info| info.volume)
    }
}

/// Error kind of an unclassified failure.
pub fn failure_kind(command: &Command) -> &str {
    assert_eq!(command.status, CommandStatus::Failed);
    command
        .error
        .as_ref()
        .and_then(|e| e.error_info.get("kind"))
        .map(String::as_str)
        .unwrap_or("")
}

/// Error type of a defined failure.
pub fn defined_type(command: &Command) -> &str {
    assert_eq!(command.status, CommandStatus::Failed);
    command
        .defined_error
        .as_ref()
        .map(|e| e.error_type())
        .unwrap_or("")
}
